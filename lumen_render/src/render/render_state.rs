/// Per-frame render state and material application.
///
/// One `RenderState` is built per frame (see
/// [`Engine::render_frame`](crate::engine::Engine::render_frame)) and threaded
/// through every draw. It caches the last activated shader build and the
/// last applied material so consecutive draws skip redundant device calls:
///
/// - shader change (different key or hot-reloaded generation): activate the
///   program, push the view-projection matrix, forget the material
/// - material change (by [`MaterialId`]): push its uniforms and texture bindings
/// - every draw: push the top of the transform stack as model transform

use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::graphics_device::{lock_device, GraphicsDevice, ShaderDataType, UniformValue};
use crate::render::{BufferSync, SamplerManager, TransformStack};
use crate::resource::{Material, MaterialId, ShaderProgram, ShaderStore, VersionedId};
use crate::{engine_error, engine_internal_error, engine_warn};

const SOURCE: &str = "lumen::RenderState";

/// Counters of one rendered frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    /// Frame number, starting at 1
    pub frame: u64,
    pub draw_calls: u32,
    pub primitives: u64,
}

pub struct RenderState<'a> {
    graphics_device: &'a Arc<Mutex<dyn GraphicsDevice>>,
    shaders: &'a ShaderStore,
    samplers: &'a SamplerManager,
    buffer_sync: &'a BufferSync,
    view_projection: Mat4,
    frame: u64,

    last_shader: VersionedId,
    last_material: Option<MaterialId>,
    transform_stack: TransformStack,

    draw_calls: u32,
    primitives: u64,
}

impl<'a> RenderState<'a> {
    pub fn new(
        graphics_device: &'a Arc<Mutex<dyn GraphicsDevice>>,
        shaders: &'a ShaderStore,
        samplers: &'a SamplerManager,
        buffer_sync: &'a BufferSync,
        view_projection: Mat4,
        frame: u64,
    ) -> Self {
        Self {
            graphics_device,
            shaders,
            samplers,
            buffer_sync,
            view_projection,
            frame,
            last_shader: VersionedId::ZERO,
            last_material: None,
            transform_stack: TransformStack::new(),
            draw_calls: 0,
            primitives: 0,
        }
    }

    // ===== MATERIAL APPLICATION =====

    /// Make `material` current and push the model transform
    ///
    /// # Returns
    ///
    /// The live shader program to draw with, `None` if the material's shader
    /// is not loaded (the caller skips the draw).
    pub fn apply_material(&mut self, material: &Material) -> Option<Arc<ShaderProgram>> {
        let Some((shader_id, program)) = self.shaders.resolve(material.shader_key()) else {
            engine_error!(SOURCE, "Shader '{}' is not loaded, skipping draw", material.shader_key());
            return None;
        };

        if shader_id != self.last_shader {
            let mut device = lock_device(self.graphics_device);
            device.use_program(program.program());
            if let Some(location) = program.view_projection_location() {
                device.set_uniform(location, &UniformValue::Mat4(self.view_projection));
            }
            self.last_shader = shader_id;
            self.last_material = None;
        }

        if self.last_material != Some(material.id()) {
            self.push_material(material, &program);
            self.last_material = Some(material.id());
        }

        if let Some(location) = program.model_transform_location() {
            lock_device(self.graphics_device)
                .set_uniform(location, &UniformValue::Mat4(self.transform_stack.top()));
        }
        Some(program)
    }

    fn push_material(&self, material: &Material, program: &ShaderProgram) {
        {
            let mut device = lock_device(self.graphics_device);
            for (name, value) in material.uniforms() {
                match program.uniform(name) {
                    Some(uniform) if uniform.data_type == ShaderDataType::Sampler2D => {
                        engine_warn!(SOURCE, "Uniform '{}' of {} is a sampler, bind a texture instead", name, material.id());
                    }
                    Some(uniform) => device.set_uniform(uniform.location, value),
                    None => engine_warn!(SOURCE, "Shader '{}' has no uniform '{}'", material.shader_key(), name),
                }
            }
        }

        // The sampler manager resolves textures, so the device lock is released first
        for binding in material.texture_bindings() {
            match program.uniform(&binding.uniform) {
                Some(uniform) => {
                    // Failures are logged and fall back to unit 0
                    let _ = self.samplers.bind(uniform.location, &binding.texture_key);
                }
                None => engine_warn!(SOURCE, "Shader '{}' has no sampler '{}'", material.shader_key(), binding.uniform),
            }
        }
    }

    // ===== TRANSFORMS & COUNTERS =====

    pub fn transform_stack(&self) -> &TransformStack {
        &self.transform_stack
    }

    pub fn transform_stack_mut(&mut self) -> &mut TransformStack {
        &mut self.transform_stack
    }

    /// Count one issued draw call
    pub fn record_draw(&mut self, primitives: usize) {
        self.draw_calls += 1;
        self.primitives += primitives as u64;
    }

    pub fn draw_calls(&self) -> u32 {
        self.draw_calls
    }

    pub fn primitives(&self) -> u64 {
        self.primitives
    }

    pub fn view_projection(&self) -> Mat4 {
        self.view_projection
    }

    pub(crate) fn graphics_device(&self) -> &'a Arc<Mutex<dyn GraphicsDevice>> {
        self.graphics_device
    }

    pub(crate) fn buffer_sync(&self) -> &'a BufferSync {
        self.buffer_sync
    }

    /// End the frame: check the transform stack and return the counters
    pub fn finish(self) -> RenderStats {
        if self.transform_stack.depth() != 1 {
            engine_internal_error!(SOURCE, "frame {} ended with transform stack depth {}",
                self.frame, self.transform_stack.depth());
        }
        RenderStats {
            frame: self.frame,
            draw_calls: self.draw_calls,
            primitives: self.primitives,
        }
    }
}

#[cfg(test)]
#[path = "render_state_tests.rs"]
mod tests;
