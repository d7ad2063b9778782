/// Mesh: GPU vertex/index buffers drawn with a material.
///
/// A mesh owns one vertex buffer and, while it has indices, one 16-bit
/// index buffer. Geometry is validated before upload; invalid data is
/// rejected and the previous geometry keeps drawing. When the material's
/// shader is loaded at upload time, the vertex attributes are also checked
/// against it.
///
/// Meshes have no transform of their own: [`trans_draw`](Mesh::trans_draw)
/// wraps a draw in a push/pop of the render state's transform stack.

use std::fmt;
use std::sync::{Arc, Mutex};

use glam::Mat4;

use crate::engine::Engine;
use crate::error::Result;
use crate::graphics_device::{
    lock_device, AttribLocation, BufferHandle, BufferTarget, GraphicsDevice, PrimitiveType,
};
use crate::render::{BufferSync, DrawInfo, Drawable, RenderState};
use crate::resource::geometry::{validate_geometry, BufferLayout, Geometry};
use crate::resource::material::Material;
use crate::resource::shader_program::ShaderStore;
use crate::{engine_bail, engine_error, engine_warn};

const SOURCE: &str = "lumen::Mesh";

const FLOAT_SIZE: usize = std::mem::size_of::<f32>();
const INDEX_SIZE: usize = std::mem::size_of::<u16>();

pub struct Mesh {
    graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
    shaders: Arc<ShaderStore>,
    buffer_sync: Arc<BufferSync>,
    material: Arc<Material>,

    vbo: BufferHandle,
    ibo: Option<BufferHandle>,

    primitive_type: PrimitiveType,
    layout: BufferLayout,
    attributes: Vec<String>,

    vertex_count: usize,
    /// In bytes
    vertex_size: usize,
    /// In bytes
    vbo_size: usize,
    /// Indices drawn; the vertex count when not indexed
    index_count: usize,
    primitive_count: usize,
}

impl Mesh {
    /// Create an empty mesh drawn with `material`
    pub fn new(engine: &Engine, material: Arc<Material>) -> Self {
        Self::from_parts(
            engine.graphics_device().clone(),
            engine.shaders().clone(),
            engine.buffer_sync().clone(),
            material,
        )
    }

    pub(crate) fn from_parts(
        graphics_device: Arc<Mutex<dyn GraphicsDevice>>,
        shaders: Arc<ShaderStore>,
        buffer_sync: Arc<BufferSync>,
        material: Arc<Material>,
    ) -> Self {
        let vbo = lock_device(&graphics_device).create_buffer();
        Self {
            graphics_device,
            shaders,
            buffer_sync,
            material,
            vbo,
            ibo: None,
            primitive_type: PrimitiveType::Triangles,
            layout: BufferLayout::Interleaved,
            attributes: Vec::new(),
            vertex_count: 0,
            vertex_size: 0,
            vbo_size: 0,
            index_count: 0,
            primitive_count: 0,
        }
    }

    // ===== MATERIAL =====

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    // ===== GEOMETRY =====

    /// Validate and upload new geometry
    ///
    /// # Arguments
    ///
    /// * `vertex_count` - Number of vertices
    /// * `vertices` - Raw vertex floats, laid out per `layout`
    /// * `indices` - Optional indices; empty means non-indexed drawing
    /// * `primitive_type` - Topology to draw
    /// * `attributes` - Ordered vertex attribute names
    /// * `layout` - Interleaved or compact
    ///
    /// # Errors
    ///
    /// `InvalidGeometry`; the mesh keeps its previous geometry.
    pub fn set_vertex_data(
        &mut self,
        vertex_count: usize,
        vertices: &[f32],
        indices: &[u16],
        primitive_type: PrimitiveType,
        attributes: &[&str],
        layout: BufferLayout,
    ) -> Result<()> {
        let shader = self.shaders.resolve(self.material.shader_key());
        if shader.is_none() {
            engine_warn!(SOURCE, "Shader '{}' is not loaded, vertex attributes are not checked against it",
                self.material.shader_key());
        }
        let program = shader.as_ref().map(|(_, program)| program.as_ref());
        validate_geometry(vertex_count, vertices, indices, primitive_type, attributes, program)?;

        let element_count = if indices.is_empty() { vertex_count } else { indices.len() };
        self.upload(vertices, indices);
        self.primitive_type = primitive_type;
        self.layout = layout;
        self.attributes = attributes.iter().map(|name| name.to_string()).collect();
        self.vertex_count = vertex_count;
        self.vertex_size = if vertex_count > 0 { vertices.len() / vertex_count * FLOAT_SIZE } else { 0 };
        self.vbo_size = vertices.len() * FLOAT_SIZE;
        self.index_count = element_count;
        self.primitive_count = primitive_type.primitive_count(element_count);
        Ok(())
    }

    /// Upload a [`Geometry`]
    pub fn set_geometry(&mut self, geometry: &Geometry) -> Result<()> {
        let attributes: Vec<&str> = geometry.attributes().iter().map(String::as_str).collect();
        self.set_vertex_data(
            geometry.vertex_count(),
            geometry.vertices(),
            geometry.indices(),
            geometry.primitive_type(),
            &attributes,
            geometry.layout(),
        )
    }

    /// Drop all geometry; drawing becomes a no-op
    pub fn clear_vertex_data(&mut self) {
        self.upload(&[], &[]);
        self.primitive_type = PrimitiveType::Triangles;
        self.layout = BufferLayout::Interleaved;
        self.attributes.clear();
        self.vertex_count = 0;
        self.vertex_size = 0;
        self.vbo_size = 0;
        self.index_count = 0;
        self.primitive_count = 0;
    }

    fn upload(&mut self, vertices: &[f32], indices: &[u16]) {
        {
            let _array = self.buffer_sync.lock(BufferTarget::ArrayBuffer);
            let mut device = lock_device(&self.graphics_device);
            device.bind_buffer(BufferTarget::ArrayBuffer, self.vbo);
            device.buffer_data(BufferTarget::ArrayBuffer, bytemuck::cast_slice(vertices));
        }

        if indices.is_empty() {
            if let Some(ibo) = self.ibo.take() {
                lock_device(&self.graphics_device).delete_buffer(ibo);
            }
            return;
        }

        let _element = self.buffer_sync.lock(BufferTarget::ElementArrayBuffer);
        let mut device = lock_device(&self.graphics_device);
        let ibo = *self.ibo.get_or_insert_with(|| device.create_buffer());
        device.bind_buffer(BufferTarget::ElementArrayBuffer, ibo);
        device.buffer_data(BufferTarget::ElementArrayBuffer, bytemuck::cast_slice(indices));
    }

    /// Overwrite whole vertices starting at `vertex_offset`
    ///
    /// Only for interleaved meshes; the buffer size never changes.
    ///
    /// # Errors
    ///
    /// `OutOfRange` if the range exceeds the vertex count, `InvalidGeometry`
    /// if `vertices` is not a whole number of vertices or the layout is compact.
    pub fn set_vertex_sub_data(&mut self, vertex_offset: usize, vertices: &[f32]) -> Result<()> {
        if self.layout != BufferLayout::Interleaved {
            engine_bail!(SOURCE, InvalidGeometry, "vertex sub data needs an interleaved layout");
        }
        if self.vertex_size == 0 || (vertices.len() * FLOAT_SIZE) % self.vertex_size != 0 {
            engine_bail!(SOURCE, InvalidGeometry,
                "{} floats are not a whole number of {}-byte vertices", vertices.len(), self.vertex_size);
        }
        let count = vertices.len() * FLOAT_SIZE / self.vertex_size;
        if vertex_offset >= self.vertex_count || vertex_offset + count > self.vertex_count {
            engine_bail!(SOURCE, OutOfRange,
                "vertices {}..{} of {}", vertex_offset, vertex_offset + count, self.vertex_count);
        }

        let _array = self.buffer_sync.lock(BufferTarget::ArrayBuffer);
        let mut device = lock_device(&self.graphics_device);
        device.bind_buffer(BufferTarget::ArrayBuffer, self.vbo);
        device.buffer_sub_data(BufferTarget::ArrayBuffer, vertex_offset * self.vertex_size, bytemuck::cast_slice(vertices));
        Ok(())
    }

    /// Overwrite indices starting at `index_offset`
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if the mesh is not indexed or an index is out of
    /// range, `OutOfRange` if the range exceeds the index count.
    pub fn set_index_sub_data(&mut self, index_offset: usize, indices: &[u16]) -> Result<()> {
        let Some(ibo) = self.ibo else {
            engine_bail!(SOURCE, InvalidGeometry, "the mesh does not use indexed drawing");
        };
        if index_offset >= self.index_count || index_offset + indices.len() > self.index_count {
            engine_bail!(SOURCE, OutOfRange,
                "indices {}..{} of {}", index_offset, index_offset + indices.len(), self.index_count);
        }
        if let Some(index) = indices.iter().find(|&&index| index as usize >= self.vertex_count) {
            engine_bail!(SOURCE, InvalidGeometry, "index {} is out of range ({} vertices)", index, self.vertex_count);
        }

        let _element = self.buffer_sync.lock(BufferTarget::ElementArrayBuffer);
        let mut device = lock_device(&self.graphics_device);
        device.bind_buffer(BufferTarget::ElementArrayBuffer, ibo);
        device.buffer_sub_data(BufferTarget::ElementArrayBuffer, index_offset * INDEX_SIZE, bytemuck::cast_slice(indices));
        Ok(())
    }

    // ===== DRAWING =====

    /// Draw with `transform` applied on top of the current model transform
    pub fn trans_draw(&self, render_state: &mut RenderState<'_>, transform: Mat4) {
        render_state.transform_stack_mut().push();
        render_state.transform_stack_mut().mul_right(transform);
        self.draw(render_state);
        render_state.transform_stack_mut().pop();
    }

    /// Apply the material and issue one draw call
    ///
    /// No-op for an empty mesh. Skipped (and logged) when the shader is not
    /// loaded or lacks one of the mesh's attributes.
    pub fn draw(&self, render_state: &mut RenderState<'_>) {
        if self.index_count == 0 {
            return;
        }
        let Some(program) = render_state.apply_material(&self.material) else {
            return;
        };

        let mut pointers: Vec<(AttribLocation, u32)> = Vec::with_capacity(self.attributes.len());
        for name in &self.attributes {
            match program.attribute(name) {
                Some(attribute) => pointers.push((attribute.location, attribute.data_type.components())),
                None => {
                    engine_error!(SOURCE, "Shader '{}' has no vertex attribute '{}', skipping draw",
                        self.material.shader_key(), name);
                    return;
                }
            }
        }

        let buffer_sync = render_state.buffer_sync();
        let _array = buffer_sync.lock(BufferTarget::ArrayBuffer);
        let _element = self.ibo.map(|_| buffer_sync.lock(BufferTarget::ElementArrayBuffer));
        {
            let mut device = lock_device(render_state.graphics_device());
            for &(location, _) in &pointers {
                device.enable_vertex_attrib(location);
            }
            device.bind_buffer(BufferTarget::ArrayBuffer, self.vbo);
            self.configure_attribute_pointers(&mut *device, &pointers);

            match self.ibo {
                Some(ibo) => {
                    device.bind_buffer(BufferTarget::ElementArrayBuffer, ibo);
                    device.draw_elements(self.primitive_type, self.index_count as u32, 0);
                }
                None => device.draw_arrays(self.primitive_type, 0, self.index_count as u32),
            }

            for &(location, _) in &pointers {
                device.disable_vertex_attrib(location);
            }
        }
        render_state.record_draw(self.primitive_count);
    }

    fn configure_attribute_pointers(&self, device: &mut dyn GraphicsDevice, pointers: &[(AttribLocation, u32)]) {
        match self.layout {
            BufferLayout::Interleaved => {
                let mut offset = 0;
                for &(location, components) in pointers {
                    device.vertex_attrib_pointer(location, components, self.vertex_size, offset);
                    offset += components as usize * FLOAT_SIZE;
                }
            }
            BufferLayout::Compact => {
                let mut component = 0;
                for &(location, components) in pointers {
                    let stride = components as usize * FLOAT_SIZE;
                    device.vertex_attrib_pointer(location, components, stride, self.vertex_count * component * FLOAT_SIZE);
                    component += components as usize;
                }
            }
        }
    }

    // ===== INFO =====

    pub fn info(&self) -> DrawInfo {
        DrawInfo {
            primitives: self.primitive_count,
            vertices: self.vertex_count,
            indices: self.index_count,
        }
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn is_indexed(&self) -> bool {
        self.ibo.is_some()
    }

    /// Vertex size in bytes
    pub fn vertex_size(&self) -> usize {
        self.vertex_size
    }

    /// Free the GPU buffers now
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drawable for Mesh {
    fn draw(&self, render_state: &mut RenderState<'_>) {
        Mesh::draw(self, render_state);
    }

    fn info(&self) -> DrawInfo {
        Mesh::info(self)
    }
}

impl fmt::Display for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Primitives  {} ({}, {})", self.primitive_count, self.primitive_type, self.layout)?;
        writeln!(f, "Vertices    {}", self.vertex_count)?;
        writeln!(f, "Indices     {}", self.index_count)?;
        writeln!(f, "Vertex size {} ({} attributes, {} bytes total)",
            self.vertex_size / FLOAT_SIZE, self.attributes.len(), self.vertex_size)?;
        write!(f, "VBO size    {} bytes", self.vbo_size)
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        let mut device = lock_device(&self.graphics_device);
        device.delete_buffer(self.vbo);
        if let Some(ibo) = self.ibo.take() {
            device.delete_buffer(ibo);
        }
    }
}

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
