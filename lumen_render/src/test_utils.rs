/// Shared fixtures for unit tests: mock device handles, shader sources and
/// generated image files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use glam::Mat4;
use tempfile::TempDir;

use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::{GraphicsDevice, UniformLocation};
use crate::render::{BufferSync, RenderState, SamplerManager};
use crate::resource::{
    Material, Mesh, ShaderProgramDefinition, ShaderStore, TextureDefinition, TextureStore, VersionedId,
};

/// Vertex stage: position (vec3) + uv (vec2), both reserved uniforms
pub const SPRITE_VERTEX: &str = "\
attribute vec3 position;
attribute vec2 uv;
uniform mat4 modelTransform;
uniform mat4 vpMatrix;
void main() {}
";

/// Fragment stage: a color and one sampler
pub const SPRITE_FRAGMENT: &str = "\
in vec2 v_uv;
uniform vec4 color;
uniform float intensity;
uniform sampler2D diffuse;
void main() {}
";

/// Vertex stage with position only and no reserved uniforms
pub const FLAT_VERTEX: &str = "\
attribute vec3 position;
void main() {}
";

pub const FLAT_FRAGMENT: &str = "\
uniform vec4 color;
void main() {}
";

/// Mock device plus the same device as a trait object
pub fn mock_device() -> (Arc<Mutex<MockGraphicsDevice>>, Arc<Mutex<dyn GraphicsDevice>>) {
    mock_device_with_units(16)
}

pub fn mock_device_with_units(units: u32) -> (Arc<Mutex<MockGraphicsDevice>>, Arc<Mutex<dyn GraphicsDevice>>) {
    let mock = Arc::new(Mutex::new(MockGraphicsDevice::with_texture_units(units)));
    let device: Arc<Mutex<dyn GraphicsDevice>> = mock.clone();
    (mock, device)
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// Write a solid RGBA PNG of the given size
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]))
        .save(&path)
        .unwrap();
    path
}

// ============================================================================
// Render fixture
// ============================================================================

/// Stores, sampler manager and buffer locks on a mock device, with a temp
/// dir for shader and texture sources
pub struct RenderFixture {
    pub dir: TempDir,
    pub mock: Arc<Mutex<MockGraphicsDevice>>,
    pub device: Arc<Mutex<dyn GraphicsDevice>>,
    pub shaders: Arc<ShaderStore>,
    pub textures: Arc<TextureStore>,
    pub samplers: SamplerManager,
    pub buffer_sync: Arc<BufferSync>,
}

impl RenderFixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let (mock, device) = mock_device();
        let shaders = Arc::new(ShaderStore::new(device.clone()));
        let textures = Arc::new(TextureStore::new(device.clone()));
        let samplers = SamplerManager::new(device.clone(), textures.clone(), None);
        Self {
            dir,
            mock,
            device,
            shaders,
            textures,
            samplers,
            buffer_sync: Arc::new(BufferSync::new()),
        }
    }

    /// Write `<key>.vert` / `<key>.frag` and load them under `key`
    pub fn load_shader(&self, key: &str, vertex: &str, fragment: &str) -> VersionedId {
        let vertex = write_file(self.dir.path(), &format!("{}.vert", key), vertex);
        let fragment = write_file(self.dir.path(), &format!("{}.frag", key), fragment);
        self.shaders.load(key, ShaderProgramDefinition::new(vertex, fragment)).unwrap()
    }

    pub fn load_texture(&self, key: &str, size: u32) -> VersionedId {
        let path = write_png(self.dir.path(), &format!("{}.png", key.replace(':', "_")), size, size);
        self.textures.load(key, TextureDefinition::new(path)).unwrap()
    }

    pub fn render_state(&self) -> RenderState<'_> {
        RenderState::new(&self.device, &self.shaders, &self.samplers, &self.buffer_sync, Mat4::IDENTITY, 1)
    }

    pub fn mesh(&self, material: Arc<Material>) -> Mesh {
        Mesh::from_parts(self.device.clone(), self.shaders.clone(), self.buffer_sync.clone(), material)
    }

    /// Location of a non-reserved uniform of a loaded shader
    pub fn uniform_location(&self, shader_key: &str, name: &str) -> UniformLocation {
        let (_, program) = self.shaders.resolve(shader_key).unwrap();
        program.uniform(name).unwrap().location
    }

    pub fn model_transform_location(&self, shader_key: &str) -> UniformLocation {
        let (_, program) = self.shaders.resolve(shader_key).unwrap();
        program.model_transform_location().unwrap()
    }
}
