/// Mock graphics device for unit tests (no GPU required)
///
/// Records every call as a [`DeviceCall`] so tests can count uniform uploads,
/// binds and draws. Shader "compilation" scans GLSL-like declarations:
///
/// - `attribute <type> <name>;` / `in <type> <name>;` in a vertex stage
/// - `uniform <type> <name>;` in any stage
///
/// A source without `void main` (or containing `#error`) fails to compile.
/// A source containing `#link_error` compiles but fails to link.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine_bail;
use crate::error::Result;
use crate::graphics_device::{
    ActiveAttribute, ActiveUniform, AttribLocation, BufferHandle, BufferTarget, GraphicsDevice,
    PipelineState, PrimitiveType, ProgramHandle, ProgramReflection, ShaderDataType, ShaderHandle,
    ShaderStage, TextureHandle, TextureUpload, UniformLocation, UniformValue,
};

const SOURCE: &str = "lumen::mock";

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    ConfigurePipelineState(PipelineState),
    Clear,
    CompileShader { stage: ShaderStage, shader: ShaderHandle },
    DeleteShader(ShaderHandle),
    LinkProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    SetUniform { location: UniformLocation, value: UniformValue },
    CreateTexture { texture: TextureHandle, width: u32, height: u32 },
    DeleteTexture(TextureHandle),
    BindTextureUnit { unit: u32, texture: Option<TextureHandle> },
    CreateBuffer(BufferHandle),
    DeleteBuffer(BufferHandle),
    BindBuffer { target: BufferTarget, buffer: BufferHandle },
    BufferData { target: BufferTarget, size: usize },
    BufferSubData { target: BufferTarget, offset: usize, size: usize },
    EnableVertexAttrib(AttribLocation),
    DisableVertexAttrib(AttribLocation),
    VertexAttribPointer { location: AttribLocation, components: u32, stride: usize, offset: usize },
    DrawArrays { primitive: PrimitiveType, first: u32, count: u32 },
    DrawElements { primitive: PrimitiveType, count: u32, offset: usize },
}

// ============================================================================
// Compiled shader bookkeeping
// ============================================================================

struct MockShader {
    stage: ShaderStage,
    attributes: Vec<(String, ShaderDataType)>,
    uniforms: Vec<(String, ShaderDataType)>,
    link_error: bool,
}

// ============================================================================
// Mock Graphics Device
// ============================================================================

pub struct MockGraphicsDevice {
    pub calls: Vec<DeviceCall>,
    max_texture_units: u32,
    next_handle: u32,
    shaders: FxHashMap<ShaderHandle, MockShader>,
    live_programs: FxHashSet<ProgramHandle>,
    live_textures: FxHashSet<TextureHandle>,
    live_buffers: FxHashSet<BufferHandle>,
    buffer_sizes: FxHashMap<BufferHandle, usize>,
    bound_buffers: FxHashMap<BufferTarget, BufferHandle>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::with_texture_units(16)
    }

    pub fn with_texture_units(max_texture_units: u32) -> Self {
        Self {
            calls: Vec::new(),
            max_texture_units,
            next_handle: 1,
            shaders: FxHashMap::default(),
            live_programs: FxHashSet::default(),
            live_textures: FxHashSet::default(),
            live_buffers: FxHashSet::default(),
            buffer_sizes: FxHashMap::default(),
            bound_buffers: FxHashMap::default(),
        }
    }

    fn next(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    /// Number of recorded calls matching the predicate
    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of uniform uploads to one location
    pub fn uniform_uploads(&self, location: UniformLocation) -> usize {
        self.count(|call| matches!(call, DeviceCall::SetUniform { location: l, .. } if *l == location))
    }

    /// Last value uploaded to one location
    pub fn last_uniform(&self, location: UniformLocation) -> Option<UniformValue> {
        self.calls.iter().rev().find_map(|call| match call {
            DeviceCall::SetUniform { location: l, value } if *l == location => Some(*value),
            _ => None,
        })
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn live_program_count(&self) -> usize {
        self.live_programs.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.live_textures.len()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    pub fn live_shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Current byte size of a buffer's store
    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffer_sizes.get(&buffer).copied()
    }

    fn parse(stage: ShaderStage, source: &str) -> MockShader {
        let mut attributes = Vec::new();
        let mut uniforms = Vec::new();
        for line in source.lines() {
            let tokens: Vec<&str> = line
                .trim()
                .trim_end_matches(';')
                .split_whitespace()
                .collect();
            if tokens.len() != 3 {
                continue;
            }
            let Some(data_type) = ShaderDataType::from_glsl(tokens[1]) else {
                continue;
            };
            let name = tokens[2].to_string();
            match tokens[0] {
                "attribute" | "in" if stage == ShaderStage::Vertex => attributes.push((name, data_type)),
                "uniform" => uniforms.push((name, data_type)),
                _ => {}
            }
        }
        MockShader {
            stage,
            attributes,
            uniforms,
            link_error: source.contains("#link_error"),
        }
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn configure_pipeline_state(&mut self, state: &PipelineState) {
        self.calls.push(DeviceCall::ConfigurePipelineState(*state));
    }

    fn clear(&mut self) {
        self.calls.push(DeviceCall::Clear);
    }

    fn compile_shader(&mut self, stage: ShaderStage, name: &str, source: &str) -> Result<ShaderHandle> {
        if !source.contains("void main") || source.contains("#error") {
            engine_bail!(SOURCE, BackendError, "{}: 0:1: error: {} shader has no entry point", name, stage);
        }
        let shader = ShaderHandle(self.next());
        self.shaders.insert(shader, Self::parse(stage, source));
        self.calls.push(DeviceCall::CompileShader { stage, shader });
        Ok(shader)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(&shader);
        self.calls.push(DeviceCall::DeleteShader(shader));
    }

    fn link_program(&mut self, shaders: &[ShaderHandle]) -> Result<(ProgramHandle, ProgramReflection)> {
        let mut reflection = ProgramReflection::default();
        let mut stages = FxHashSet::default();
        for handle in shaders {
            let Some(shader) = self.shaders.get(handle) else {
                engine_bail!(SOURCE, BackendError, "link: unknown shader {}", handle);
            };
            if shader.link_error {
                engine_bail!(SOURCE, BackendError, "link: unresolved symbol in {}", handle);
            }
            stages.insert(shader.stage);
            for (name, data_type) in &shader.attributes {
                let location = AttribLocation(reflection.attributes.len() as u32);
                reflection.attributes.push(ActiveAttribute {
                    name: name.clone(),
                    location,
                    data_type: *data_type,
                });
            }
            for (name, data_type) in &shader.uniforms {
                if reflection.uniforms.iter().any(|u| &u.name == name) {
                    continue;
                }
                let location = UniformLocation(reflection.uniforms.len() as u32);
                reflection.uniforms.push(ActiveUniform {
                    name: name.clone(),
                    location,
                    data_type: *data_type,
                });
            }
        }
        if !stages.contains(&ShaderStage::Vertex) || !stages.contains(&ShaderStage::Fragment) {
            engine_bail!(SOURCE, BackendError, "link: program needs a vertex and a fragment stage");
        }
        let program = ProgramHandle(self.next());
        self.live_programs.insert(program);
        self.calls.push(DeviceCall::LinkProgram(program));
        Ok((program, reflection))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.live_programs.remove(&program);
        self.calls.push(DeviceCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        self.calls.push(DeviceCall::SetUniform { location, value: *value });
    }

    fn create_texture(&mut self, upload: &TextureUpload<'_>) -> Result<TextureHandle> {
        let expected = upload.width as usize * upload.height as usize * 4;
        if upload.rgba.len() != expected {
            engine_bail!(SOURCE, BackendError,
                "create_texture: {} bytes for {}x{} RGBA8", upload.rgba.len(), upload.width, upload.height);
        }
        let texture = TextureHandle(self.next());
        self.live_textures.insert(texture);
        self.calls.push(DeviceCall::CreateTexture {
            texture,
            width: upload.width,
            height: upload.height,
        });
        Ok(texture)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.live_textures.remove(&texture);
        self.calls.push(DeviceCall::DeleteTexture(texture));
    }

    fn bind_texture_unit(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.calls.push(DeviceCall::BindTextureUnit { unit, texture });
    }

    fn create_buffer(&mut self) -> BufferHandle {
        let buffer = BufferHandle(self.next());
        self.live_buffers.insert(buffer);
        self.buffer_sizes.insert(buffer, 0);
        self.calls.push(DeviceCall::CreateBuffer(buffer));
        buffer
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.live_buffers.remove(&buffer);
        self.buffer_sizes.remove(&buffer);
        self.calls.push(DeviceCall::DeleteBuffer(buffer));
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        self.bound_buffers.insert(target, buffer);
        self.calls.push(DeviceCall::BindBuffer { target, buffer });
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8]) {
        if let Some(buffer) = self.bound_buffers.get(&target) {
            self.buffer_sizes.insert(*buffer, data.len());
        }
        self.calls.push(DeviceCall::BufferData { target, size: data.len() });
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        self.calls.push(DeviceCall::BufferSubData { target, offset, size: data.len() });
    }

    fn enable_vertex_attrib(&mut self, location: AttribLocation) {
        self.calls.push(DeviceCall::EnableVertexAttrib(location));
    }

    fn disable_vertex_attrib(&mut self, location: AttribLocation) {
        self.calls.push(DeviceCall::DisableVertexAttrib(location));
    }

    fn vertex_attrib_pointer(&mut self, location: AttribLocation, components: u32, stride: usize, offset: usize) {
        self.calls.push(DeviceCall::VertexAttribPointer { location, components, stride, offset });
    }

    fn draw_arrays(&mut self, primitive: PrimitiveType, first: u32, count: u32) {
        self.calls.push(DeviceCall::DrawArrays { primitive, first, count });
    }

    fn draw_elements(&mut self, primitive: PrimitiveType, count: u32, offset: usize) {
        self.calls.push(DeviceCall::DrawElements { primitive, count, offset });
    }
}
