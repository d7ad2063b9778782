//! Small generic helpers shared across modules.

mod slot_allocator;

pub use slot_allocator::SlotAllocator;
