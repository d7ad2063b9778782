/// GraphicsDevice trait - the graphics-API binding consumed by the render core
///
/// Implementations wrap a concrete API (OpenGL, GLES, WebGL...). The device is
/// shared as `Arc<Mutex<dyn GraphicsDevice>>`: the mutex is the single
/// execution context every GPU call is serialized onto, whichever thread
/// (render loop, hot-reload watcher) submits it.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use glam::{Mat2, Mat3, Mat4};

use crate::error::Result;
use super::{
    BufferTarget, PrimitiveType, ProgramReflection, ShaderStage, TextureUpload,
};

// ============================================================================
// Handles
// ============================================================================

macro_rules! device_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

device_handle!(
    /// Compiled shader object
    ShaderHandle
);
device_handle!(
    /// Linked program object
    ProgramHandle
);
device_handle!(
    /// Texture object
    TextureHandle
);
device_handle!(
    /// Buffer object
    BufferHandle
);
device_handle!(
    /// Uniform location inside a linked program
    UniformLocation
);
device_handle!(
    /// Vertex attribute location inside a linked program
    AttribLocation
);

// ============================================================================
// Uniform values
// ============================================================================

/// Typed uniform payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    /// Scalar component count of the payload
    pub fn components(&self) -> u32 {
        match self {
            UniformValue::Float(_) | UniformValue::Int(_) => 1,
            UniformValue::Vec2(_) | UniformValue::IVec2(_) => 2,
            UniformValue::Vec3(_) | UniformValue::IVec3(_) => 3,
            UniformValue::Vec4(_) | UniformValue::IVec4(_) | UniformValue::Mat2(_) => 4,
            UniformValue::Mat3(_) => 9,
            UniformValue::Mat4(_) => 16,
        }
    }
}

// ============================================================================
// Fixed-function state
// ============================================================================

/// Depth comparison function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthFunc {
    Less,
    LessOrEqual,
    Always,
}

/// Fixed-function state configured once per session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    /// `None` disables depth testing
    pub depth_test: Option<DepthFunc>,
    pub cull_back_faces: bool,
    /// Source-alpha / one-minus-source-alpha blending
    pub alpha_blending: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            depth_test: Some(DepthFunc::LessOrEqual),
            cull_back_faces: true,
            alpha_blending: true,
        }
    }
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Graphics-API binding
///
/// Object creation, compile/link status, introspection and draw submission.
/// Methods that cannot fail on a well-behaved driver return plain values.
pub trait GraphicsDevice: Send + Sync {
    /// Number of texture units the hardware exposes to fragment shaders
    fn max_texture_units(&self) -> u32;

    /// Set depth/cull/blend state
    fn configure_pipeline_state(&mut self, state: &PipelineState);

    /// Clear color and depth of the current target
    fn clear(&mut self);

    // ===== SHADERS =====

    /// Compile one shader stage
    ///
    /// # Arguments
    ///
    /// * `stage` - Pipeline stage of the source
    /// * `name` - Label used in diagnostics (usually the source path)
    /// * `source` - GLSL source text
    ///
    /// # Errors
    ///
    /// Returns the compiler log when compilation fails.
    fn compile_shader(&mut self, stage: ShaderStage, name: &str, source: &str) -> Result<ShaderHandle>;

    /// Delete a shader object (safe once linked)
    fn delete_shader(&mut self, shader: ShaderHandle);

    /// Create and link a program from compiled stages
    ///
    /// # Returns
    ///
    /// The program handle and the reflection of its active attributes and uniforms
    ///
    /// # Errors
    ///
    /// Returns the linker log when linking fails; no program is left behind.
    fn link_program(&mut self, shaders: &[ShaderHandle]) -> Result<(ProgramHandle, ProgramReflection)>;

    /// Delete a program object
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Upload a uniform to the current program
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    // ===== TEXTURES =====

    /// Create a 2D texture and upload its pixels
    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureHandle>;

    /// Delete a texture object
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Bind a texture to a texture unit, `None` unbinds the unit
    fn bind_texture_unit(&mut self, unit: u32, texture: Option<TextureHandle>);

    // ===== BUFFERS =====

    /// Create an empty buffer object
    fn create_buffer(&mut self) -> BufferHandle;

    /// Delete a buffer object
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Bind a buffer to a target
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);

    /// Replace the whole store of the buffer bound to `target`
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]);

    /// Overwrite a byte range of the buffer bound to `target`
    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]);

    // ===== VERTEX ATTRIBUTES & DRAWS =====

    fn enable_vertex_attrib(&mut self, location: AttribLocation);

    fn disable_vertex_attrib(&mut self, location: AttribLocation);

    /// Describe float attribute data in the bound array buffer
    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u32, stride: usize, offset: usize);

    /// Non-indexed draw
    fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32);

    /// Indexed draw with 16-bit indices from the bound element array buffer
    fn draw_elements(&mut self, primitive: PrimitiveType, count: u32, offset: usize);
}

/// Lock the device, recovering the guard if a panicking thread poisoned it
pub(crate) fn lock_device(device: &Arc<Mutex<dyn GraphicsDevice>>) -> MutexGuard<'_, dyn GraphicsDevice + 'static> {
    device.lock().unwrap_or_else(PoisonError::into_inner)
}
