/*!
# Lumen Render

GPU resource lifecycle and render-state core of the Lumen 2D/3D engine.

The crate sits between an application's scene layer and a graphics-API
binding (the [`GraphicsDevice`](lumen::graphics_device::GraphicsDevice)
trait). It owns GPU resources, keeps them live-editable during development
and keeps per-frame state changes minimal.

## Architecture

- **ResourceStore**: keyed shader and texture stores; every build gets a
  fresh `VersionedId` and sources are hot-reloaded on file change
- **FileWatcher**: filesystem notifications fanned out to keys
- **SamplerManager**: bounded texture-unit allocation for sampler uniforms
- **RenderState**: per-frame shader/material diffing and the transform stack
- **Mesh / Geometry**: validated vertex data and draw submission
- **Engine**: composition root of one rendering session

Logging goes through a pluggable [`Logger`](lumen::log::Logger).
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod camera;
pub mod graphics_device;
pub mod hot_reload;
pub mod render;
pub mod resource;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Main lumen namespace module
pub mod lumen {
    // Error types
    pub use crate::error::{Error, Result};

    // Session root
    pub use crate::engine::{Engine, EngineConfig};

    // Logging sub-module (types and logger slot, NOT macros)
    pub mod log {
        pub use crate::log::{
            log, log_detailed, reset_logger, set_logger, DefaultLogger, LogEntry, LogSeverity, Logger,
        };
    }

    // Graphics-API binding and its value types
    pub mod graphics_device {
        pub use crate::graphics_device::*;
    }

    // Watchers and cancellation
    pub mod hot_reload {
        pub use crate::hot_reload::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Per-frame rendering
    pub mod render {
        pub use crate::render::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }
}

// Re-export math library at crate root
pub use glam;
