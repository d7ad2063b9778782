//! Camera module.
//!
//! The engine keeps one camera; its view-projection matrix is pushed to each
//! shader when the shader becomes current in a frame.

mod camera;

pub use camera::Camera;
