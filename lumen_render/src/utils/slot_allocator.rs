/// Allocates and recycles `u32` indices from a fixed-size pool.
///
/// Used for hardware-bounded binding points such as texture units: indices
/// range over `0..capacity`, the lowest free index is always handed out
/// first, and allocation fails once every index is taken.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::new(2);
/// let a = alloc.alloc();   // Some(0)
/// let b = alloc.alloc();   // Some(1)
/// assert_eq!(alloc.alloc(), None);
/// alloc.free(0);
/// let c = alloc.alloc();   // Some(0) (recycled)
/// ```

use std::collections::BTreeSet;

pub struct SlotAllocator {
    capacity: u32,
    /// Freed indices below `next_id`
    free_list: BTreeSet<u32>,
    next_id: u32,
    len: u32,
}

impl SlotAllocator {
    /// Create an empty allocator handing out indices in `0..capacity`
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            free_list: BTreeSet::new(),
            next_id: 0,
            len: 0,
        }
    }

    /// Allocate the lowest available index, `None` when the pool is exhausted
    pub fn alloc(&mut self) -> Option<u32> {
        let id = match self.free_list.pop_first() {
            Some(id) => id,
            None if self.next_id < self.capacity => {
                self.next_id += 1;
                self.next_id - 1
            }
            None => return None,
        };
        self.len += 1;
        Some(id)
    }

    /// Return an index to the pool
    ///
    /// Returns `false` (and changes nothing) if `id` is not allocated.
    pub fn free(&mut self, id: u32) -> bool {
        if !self.is_allocated(id) {
            return false;
        }
        self.len -= 1;
        self.free_list.insert(id);
        true
    }

    /// Whether `id` is currently handed out
    pub fn is_allocated(&self, id: u32) -> bool {
        id < self.next_id && !self.free_list.contains(&id)
    }

    /// Highest index ever allocated + 1
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of currently allocated indices
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }
}

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
