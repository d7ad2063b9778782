//! Graphics device module - the graphics-API binding and its value types
//!
//! Everything above this module talks to the GPU through
//! `Arc<Mutex<dyn GraphicsDevice>>`; the mutex serializes device access.

pub mod buffer;
pub mod graphics_device;
pub mod shader;
pub mod texture;

pub use buffer::*;
pub use graphics_device::*;
pub use shader::*;
pub use texture::*;

// Recording device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
