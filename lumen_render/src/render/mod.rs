//! Per-frame rendering: render state, material application, texture units
//! and the transform stack.

pub mod buffer_sync;
pub mod drawable;
pub mod render_state;
pub mod sampler_manager;
pub mod transform_stack;

pub use buffer_sync::BufferSync;
pub use drawable::{DrawInfo, Drawable};
pub use render_state::{RenderState, RenderStats};
pub use sampler_manager::SamplerManager;
pub use transform_stack::TransformStack;
