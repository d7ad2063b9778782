/// Lumen Engine - composition root of one rendering session
///
/// The engine owns the graphics device handle, the shader and texture
/// stores, the sampler manager, the buffer-target locks and the camera.
/// Only one engine may be alive per process: a second `Engine::new` fails
/// with `InitializationFailed` until the first one is dropped.
///
/// # Example
///
/// ```no_run
/// use lumen_render::lumen::{Engine, EngineConfig};
/// use lumen_render::lumen::resource::{Material, Mesh, ShaderProgramDefinition};
/// # fn device() -> std::sync::Arc<std::sync::Mutex<dyn lumen_render::lumen::graphics_device::GraphicsDevice>> { unimplemented!() }
///
/// let engine = Engine::new(device(), EngineConfig::default())?;
/// engine.shaders().load("sprite", ShaderProgramDefinition::new("sprite.vert", "sprite.frag"))?;
///
/// let mesh = Mesh::new(&engine, std::sync::Arc::new(Material::new("sprite")));
/// let stats = engine.render_all(&[&mesh]);
/// # Ok::<(), lumen_render::lumen::Error>(())
/// ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::camera::Camera;
use crate::error::Result;
use crate::graphics_device::{lock_device, GraphicsDevice, PipelineState};
use crate::hot_reload::CancellationToken;
use crate::render::{BufferSync, Drawable, RenderState, RenderStats, SamplerManager};
use crate::resource::{ShaderStore, TextureStore};
use crate::{engine_bail, engine_debug, engine_info, engine_trace};

const SOURCE: &str = "lumen::Engine";

/// Set while an engine is alive
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Engine construction options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineConfig {
    /// Start watching shader and texture sources right away
    pub hot_reload: bool,
    /// Cap on texture units handed out; clamped to the device maximum
    pub texture_unit_limit: Option<u32>,
}

pub struct Engine {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    shaders: Arc<ShaderStore>,
    textures: Arc<TextureStore>,
    samplers: SamplerManager,
    buffer_sync: Arc<BufferSync>,
    camera: Mutex<Camera>,
    config: EngineConfig,

    /// Parent of the stores' watch loops; cancelled on drop
    cancel: CancellationToken,
    frame: AtomicU64,
    last_stats: Mutex<RenderStats>,
}

impl Engine {
    /// Start a rendering session on `graphics_device`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if another engine is alive; any error from
    /// starting hot reloading when `config.hot_reload` is set.
    pub fn new(graphics_device: Arc<Mutex<dyn GraphicsDevice>>, config: EngineConfig) -> Result<Arc<Engine>> {
        if SESSION_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            engine_bail!(SOURCE, InitializationFailed, "an engine session is already active");
        }

        lock_device(&graphics_device).configure_pipeline_state(&PipelineState::default());

        let shaders = Arc::new(ShaderStore::new(graphics_device.clone()));
        let textures = Arc::new(TextureStore::new(graphics_device.clone()));
        let samplers = SamplerManager::new(graphics_device.clone(), textures.clone(), config.texture_unit_limit);

        // From here on, Drop releases the session
        let engine = Arc::new(Engine {
            graphics_device,
            shaders,
            textures,
            samplers,
            buffer_sync: Arc::new(BufferSync::new()),
            camera: Mutex::new(Camera::default()),
            config,
            cancel: CancellationToken::new(),
            frame: AtomicU64::new(0),
            last_stats: Mutex::new(RenderStats::default()),
        });

        if config.hot_reload {
            engine.start_hot_reloading(&engine.cancel)?;
        }
        engine_info!(SOURCE, "Engine started ({} texture units)", engine.samplers.capacity());
        Ok(engine)
    }

    // ===== ACCESSORS =====

    pub fn graphics_device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.graphics_device
    }

    pub fn shaders(&self) -> &Arc<ShaderStore> {
        &self.shaders
    }

    pub fn textures(&self) -> &Arc<TextureStore> {
        &self.textures
    }

    pub fn samplers(&self) -> &SamplerManager {
        &self.samplers
    }

    pub fn buffer_sync(&self) -> &Arc<BufferSync> {
        &self.buffer_sync
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ===== CAMERA =====

    fn camera_slot(&self) -> MutexGuard<'_, Camera> {
        self.camera.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current camera
    pub fn camera(&self) -> Camera {
        self.camera_slot().clone()
    }

    /// Modify the camera in place
    pub fn update_camera<F: FnOnce(&mut Camera)>(&self, update: F) {
        update(&mut self.camera_slot());
    }

    // ===== FRAMES =====

    /// Render one frame
    ///
    /// Clears the target, hands a fresh [`RenderState`] to `draw`, checks the
    /// transform stack and records the frame counters.
    pub fn render_frame<F: FnOnce(&mut RenderState<'_>)>(&self, draw: F) -> RenderStats {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let view_projection = self.camera_slot().view_projection_matrix();
        lock_device(&self.graphics_device).clear();

        let mut render_state = RenderState::new(
            &self.graphics_device,
            &self.shaders,
            &self.samplers,
            &self.buffer_sync,
            view_projection,
            frame,
        );
        draw(&mut render_state);
        let stats = render_state.finish();

        *self.last_stats.lock().unwrap_or_else(PoisonError::into_inner) = stats;
        engine_trace!(SOURCE, "Frame {}: {} draw calls, {} primitives", stats.frame, stats.draw_calls, stats.primitives);
        stats
    }

    /// Render one frame drawing each object with a fresh transform stack
    pub fn render_all(&self, drawables: &[&dyn Drawable]) -> RenderStats {
        self.render_frame(|render_state| {
            for drawable in drawables {
                render_state.transform_stack_mut().reset();
                drawable.draw(render_state);
            }
        })
    }

    /// Counters of the most recent frame
    pub fn last_render_stats(&self) -> RenderStats {
        *self.last_stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== HOT RELOAD =====

    /// Watch shader and texture sources until `cancel` is cancelled
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if either store is already hot reloading; nothing is
    /// left running on error.
    pub fn start_hot_reloading(&self, cancel: &CancellationToken) -> Result<()> {
        self.shaders.start_hot_reloading(cancel)?;
        if let Err(err) = self.textures.start_hot_reloading(cancel) {
            self.shaders.stop_hot_reloading();
            return Err(err);
        }
        Ok(())
    }

    pub fn stop_hot_reloading(&self) {
        self.shaders.stop_hot_reloading();
        self.textures.stop_hot_reloading();
    }

    pub fn is_hot_reloading(&self) -> bool {
        self.shaders.is_hot_reloading() || self.textures.is_hot_reloading()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.stop_hot_reloading();
        self.samplers.unbind_all();
        self.shaders.unload_all();
        self.textures.unload_all();
        SESSION_ACTIVE.store(false, Ordering::Release);
        engine_debug!(SOURCE, "Engine stopped after {} frames", self.frame.load(Ordering::Relaxed));
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
