//! CPU-side geometry and its validation rules.
//!
//! A [`Geometry`] holds raw vertex floats, optional 16-bit indices, the
//! primitive type, the ordered vertex attribute names and the buffer
//! layout. It can be merged with other geometry and uploaded to a
//! [`Mesh`](crate::resource::Mesh).
//!
//! # Layouts
//!
//! ```text
//! Interleaved (2 vertices, position vec3 + uv vec2):
//!   px py pz u v | px py pz u v
//!
//! Compact (same data):
//!   px py pz px py pz | u v u v
//! ```

use std::fmt;

use rustc_hash::FxHashSet;

use crate::engine_bail;
use crate::error::Result;
use crate::graphics_device::PrimitiveType;
use crate::resource::shader_program::ShaderProgram;

const SOURCE: &str = "lumen::Geometry";

/// Largest vertex count addressable by 16-bit indices (0xFFFF is reserved)
pub const MAX_INDEXED_VERTICES: usize = 0xFFFF;

// ============================================================================
// BUFFER LAYOUT
// ============================================================================

/// How attribute values are arranged inside the vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferLayout {
    /// All attributes of one vertex are contiguous
    #[default]
    Interleaved,
    /// Each attribute occupies one contiguous run across all vertices
    Compact,
}

impl fmt::Display for BufferLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferLayout::Interleaved => write!(f, "interleaved"),
            BufferLayout::Compact => write!(f, "compact"),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Check that vertex data is valid in itself and, if `shader` is given,
/// that it matches the shader's active attributes
///
/// Shader-independent rules:
/// - vertex float count divides evenly by `vertex_count`
/// - at least one attribute, no duplicates, no more attributes than floats per vertex
/// - with indices: `vertex_count` fits 16-bit indices, every index is in range,
///   the first and last vertex are referenced and there are at least as many
///   indices as vertices
/// - the element count (indices, or vertices when not indexed) forms whole
///   primitives of `primitive_type`
///
/// Non-indexed geometry is therefore held to the arity rule on its vertex
/// count: 4 vertices drawn as `Triangles` are rejected, although the draw
/// call alone would just ignore the trailing vertex.
///
/// Empty geometry (no vertices, no indices) only needs its attribute names.
///
/// # Errors
///
/// `InvalidGeometry` describing the first violated rule.
pub fn validate_geometry<S: AsRef<str>>(
    vertex_count: usize,
    vertices: &[f32],
    indices: &[u16],
    primitive_type: PrimitiveType,
    attributes: &[S],
    shader: Option<&ShaderProgram>,
) -> Result<()> {
    if attributes.is_empty() {
        engine_bail!(SOURCE, InvalidGeometry, "there are no vertex attributes");
    }
    let mut seen = FxHashSet::default();
    for attribute in attributes {
        if !seen.insert(attribute.as_ref()) {
            engine_bail!(SOURCE, InvalidGeometry, "vertex attribute '{}' is declared twice", attribute.as_ref());
        }
    }

    if vertex_count == 0 {
        if !vertices.is_empty() || !indices.is_empty() {
            engine_bail!(SOURCE, InvalidGeometry,
                "vertex count is 0 but {} floats and {} indices were given", vertices.len(), indices.len());
        }
        return Ok(());
    }

    if vertices.len() % vertex_count != 0 {
        engine_bail!(SOURCE, InvalidGeometry,
            "{} floats do not divide into {} vertices", vertices.len(), vertex_count);
    }
    let vertex_size = vertices.len() / vertex_count;
    if vertex_size < attributes.len() {
        engine_bail!(SOURCE, InvalidGeometry,
            "{} floats per vertex cannot hold {} attributes", vertex_size, attributes.len());
    }

    if !indices.is_empty() {
        validate_indices(vertex_count, indices)?;
    }

    let element_count = if indices.is_empty() { vertex_count } else { indices.len() };
    if let Some(rule) = primitive_type.check_arity(element_count) {
        engine_bail!(SOURCE, InvalidGeometry, "{}", rule);
    }

    if let Some(shader) = shader {
        validate_against_shader(vertex_size, attributes, shader)?;
    }
    Ok(())
}

fn validate_indices(vertex_count: usize, indices: &[u16]) -> Result<()> {
    if vertex_count > MAX_INDEXED_VERTICES {
        engine_bail!(SOURCE, InvalidGeometry,
            "{} vertices cannot be addressed by 16-bit indices", vertex_count);
    }
    if let Some(position) = indices.iter().position(|&index| index as usize >= vertex_count) {
        engine_bail!(SOURCE, InvalidGeometry,
            "index {} at position {} is out of range ({} vertices)", indices[position], position, vertex_count);
    }

    // Best-effort orphan detection; holes in the middle are only caught by the count
    let min = indices.iter().copied().min().unwrap_or(0) as usize;
    let max = indices.iter().copied().max().unwrap_or(0) as usize;
    if min > 0 {
        engine_bail!(SOURCE, InvalidGeometry, "the first {} vertices are not referenced", min);
    }
    if max + 1 < vertex_count {
        engine_bail!(SOURCE, InvalidGeometry, "the last {} vertices are not referenced", vertex_count - 1 - max);
    }
    if indices.len() < vertex_count {
        engine_bail!(SOURCE, InvalidGeometry,
            "{} indices cannot reference all {} vertices", indices.len(), vertex_count);
    }
    Ok(())
}

fn validate_against_shader<S: AsRef<str>>(
    vertex_size: usize,
    attributes: &[S],
    shader: &ShaderProgram,
) -> Result<()> {
    let mut expected_size = 0;
    for name in attributes {
        let Some(attribute) = shader.attribute(name.as_ref()) else {
            engine_bail!(SOURCE, InvalidGeometry, "shader has no vertex attribute '{}'", name.as_ref());
        };
        expected_size += attribute.data_type.components() as usize;
    }
    if shader.attributes().len() > attributes.len() {
        engine_bail!(SOURCE, InvalidGeometry,
            "shader has {} vertex attributes, geometry only {}", shader.attributes().len(), attributes.len());
    }
    if vertex_size != expected_size {
        engine_bail!(SOURCE, InvalidGeometry,
            "shader expects {} floats per vertex, geometry has {}", expected_size, vertex_size);
    }
    Ok(())
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Mergeable vertex/index data
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    vertex_count: usize,
    vertices: Vec<f32>,
    indices: Vec<u16>,
    primitive_type: PrimitiveType,
    attributes: Vec<String>,
    layout: BufferLayout,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            vertex_count: 0,
            vertices: Vec::new(),
            indices: Vec::new(),
            primitive_type: PrimitiveType::Triangles,
            attributes: Vec::new(),
            layout: BufferLayout::Interleaved,
        }
    }
}

impl Geometry {
    /// Build validated geometry
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` if the data breaks a rule of [`validate_geometry`].
    pub fn new(
        vertex_count: usize,
        vertices: Vec<f32>,
        indices: Vec<u16>,
        primitive_type: PrimitiveType,
        attributes: &[&str],
        layout: BufferLayout,
    ) -> Result<Self> {
        let mut geometry = Self::default();
        geometry.set(vertex_count, vertices, indices, primitive_type, attributes, layout)?;
        Ok(geometry)
    }

    /// Replace the contents; on error the previous contents are kept
    pub fn set(
        &mut self,
        vertex_count: usize,
        vertices: Vec<f32>,
        indices: Vec<u16>,
        primitive_type: PrimitiveType,
        attributes: &[&str],
        layout: BufferLayout,
    ) -> Result<()> {
        validate_geometry(vertex_count, &vertices, &indices, primitive_type, attributes, None)?;
        self.vertex_count = vertex_count;
        self.vertices = vertices;
        self.indices = indices;
        self.primitive_type = primitive_type;
        self.attributes = attributes.iter().map(|name| name.to_string()).collect();
        self.layout = layout;
        Ok(())
    }

    /// Merge new data at the end of this geometry
    ///
    /// Empty geometry simply takes the new data. Otherwise both sides must
    /// share primitive type, attributes and the interleaved layout, use a
    /// list primitive (points, lines, triangles), agree on being indexed and
    /// stay within 16-bit index range. Appended indices are offset by the
    /// current vertex count.
    ///
    /// # Errors
    ///
    /// `InvalidGeometry`; this geometry is unchanged on error.
    pub fn append(
        &mut self,
        vertex_count: usize,
        vertices: &[f32],
        indices: &[u16],
        primitive_type: PrimitiveType,
        attributes: &[&str],
        layout: BufferLayout,
    ) -> Result<()> {
        if self.vertex_count == 0 {
            return self.set(vertex_count, vertices.to_vec(), indices.to_vec(), primitive_type, attributes, layout);
        }
        validate_geometry(vertex_count, vertices, indices, primitive_type, attributes, None)?;

        if primitive_type != self.primitive_type {
            engine_bail!(SOURCE, InvalidGeometry,
                "cannot append {} to {} geometry", primitive_type, self.primitive_type);
        }
        if !primitive_type.is_list() {
            engine_bail!(SOURCE, InvalidGeometry, "cannot append {} geometry", primitive_type);
        }
        if attributes.len() != self.attributes.len()
            || attributes.iter().zip(&self.attributes).any(|(a, b)| *a != b.as_str())
        {
            engine_bail!(SOURCE, InvalidGeometry,
                "incompatible vertex attributes: {:?} <> {:?}", self.attributes, attributes);
        }
        if layout != self.layout || layout != BufferLayout::Interleaved {
            engine_bail!(SOURCE, InvalidGeometry,
                "only interleaved geometry can be appended ({} + {})", self.layout, layout);
        }
        if indices.is_empty() != self.indices.is_empty() {
            engine_bail!(SOURCE, InvalidGeometry, "cannot mix indexed and non-indexed geometry");
        }
        let total = self.vertex_count + vertex_count;
        if total > MAX_INDEXED_VERTICES {
            engine_bail!(SOURCE, InvalidGeometry,
                "{} vertices cannot be addressed by 16-bit indices", total);
        }

        let offset = self.vertex_count as u16;
        self.vertices.extend_from_slice(vertices);
        self.indices.extend(indices.iter().map(|&index| index + offset));
        self.vertex_count = total;
        Ok(())
    }

    /// Merge another geometry at the end of this one
    pub fn append_geometry(&mut self, other: &Geometry) -> Result<()> {
        let attributes: Vec<&str> = other.attributes.iter().map(String::as_str).collect();
        self.append(
            other.vertex_count,
            &other.vertices,
            &other.indices,
            other.primitive_type,
            &attributes,
            other.layout,
        )
    }

    // ===== ACCESSORS =====

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn primitive_type(&self) -> PrimitiveType {
        self.primitive_type
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    /// Floats per vertex
    pub fn vertex_size(&self) -> usize {
        if self.vertex_count == 0 {
            0
        } else {
            self.vertices.len() / self.vertex_count
        }
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
