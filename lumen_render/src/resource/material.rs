/// Material: a shader key plus named uniform values and texture bindings.
///
/// A Material is pure data. It names its shader and textures by store key
/// and holds no GPU handles; the render state resolves the keys at draw time.
///
/// Identity matters: the render state skips re-uploading uniforms when two
/// consecutive draws use the same material, compared by [`MaterialId`].
/// Cloning a material therefore yields a new identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};
use rustc_hash::FxHashMap;

use crate::graphics_device::UniformValue;

static NEXT_MATERIAL_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique material identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialId(u64);

impl MaterialId {
    fn next() -> Self {
        MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "material#{}", self.0)
    }
}

/// A sampler uniform bound to a texture key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub uniform: String,
    pub texture_key: String,
}

// ===== MATERIAL =====

#[derive(Debug)]
pub struct Material {
    id: MaterialId,
    shader_key: String,
    uniforms: Vec<(String, UniformValue)>,
    uniform_names: FxHashMap<String, usize>,
    textures: Vec<TextureBinding>,
}

impl Material {
    /// Create an empty material drawing with the shader stored under `shader_key`
    pub fn new(shader_key: impl Into<String>) -> Self {
        Self {
            id: MaterialId::next(),
            shader_key: shader_key.into(),
            uniforms: Vec::new(),
            uniform_names: FxHashMap::default(),
            textures: Vec::new(),
        }
    }

    pub fn id(&self) -> MaterialId {
        self.id
    }

    pub fn shader_key(&self) -> &str {
        &self.shader_key
    }

    pub fn set_shader(&mut self, shader_key: impl Into<String>) {
        self.shader_key = shader_key.into();
    }

    // ===== UNIFORMS =====

    /// Set (or replace) a uniform value
    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.uniform_names.get(&name) {
            Some(&index) => self.uniforms[index].1 = value,
            None => {
                self.uniform_names.insert(name.clone(), self.uniforms.len());
                self.uniforms.push((name, value));
            }
        }
    }

    pub fn set_float(&mut self, name: impl Into<String>, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    pub fn set_vec2(&mut self, name: impl Into<String>, value: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(value.to_array()));
    }

    pub fn set_vec3(&mut self, name: impl Into<String>, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value.to_array()));
    }

    pub fn set_vec4(&mut self, name: impl Into<String>, value: Vec4) {
        self.set_uniform(name, UniformValue::Vec4(value.to_array()));
    }

    /// RGBA color, components in 0..=1
    pub fn set_color(&mut self, name: impl Into<String>, r: f32, g: f32, b: f32, a: f32) {
        self.set_uniform(name, UniformValue::Vec4([r, g, b, a]));
    }

    pub fn set_int(&mut self, name: impl Into<String>, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    pub fn set_ivec2(&mut self, name: impl Into<String>, value: IVec2) {
        self.set_uniform(name, UniformValue::IVec2(value.to_array()));
    }

    pub fn set_ivec3(&mut self, name: impl Into<String>, value: IVec3) {
        self.set_uniform(name, UniformValue::IVec3(value.to_array()));
    }

    pub fn set_ivec4(&mut self, name: impl Into<String>, value: IVec4) {
        self.set_uniform(name, UniformValue::IVec4(value.to_array()));
    }

    pub fn set_mat2(&mut self, name: impl Into<String>, value: Mat2) {
        self.set_uniform(name, UniformValue::Mat2(value));
    }

    pub fn set_mat3(&mut self, name: impl Into<String>, value: Mat3) {
        self.set_uniform(name, UniformValue::Mat3(value));
    }

    pub fn set_mat4(&mut self, name: impl Into<String>, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniform_names.get(name).map(|&index| &self.uniforms[index].1)
    }

    /// Uniform values in the order they were first set
    pub fn uniforms(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.uniforms.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    // ===== TEXTURES =====

    /// Sample the texture stored under `texture_key` through `uniform`
    ///
    /// Rebinding an already bound uniform replaces its texture key.
    pub fn add_texture_binding(&mut self, uniform: impl Into<String>, texture_key: impl Into<String>) {
        let uniform = uniform.into();
        let texture_key = texture_key.into();
        match self.textures.iter_mut().find(|binding| binding.uniform == uniform) {
            Some(binding) => binding.texture_key = texture_key,
            None => self.textures.push(TextureBinding { uniform, texture_key }),
        }
    }

    /// Drop the binding of `uniform`, returning its texture key
    pub fn remove_texture_binding(&mut self, uniform: &str) -> Option<String> {
        let index = self.textures.iter().position(|binding| binding.uniform == uniform)?;
        Some(self.textures.remove(index).texture_key)
    }

    pub fn texture_bindings(&self) -> &[TextureBinding] {
        &self.textures
    }
}

impl Clone for Material {
    /// Copy the contents under a fresh identity
    fn clone(&self) -> Self {
        Self {
            id: MaterialId::next(),
            shader_key: self.shader_key.clone(),
            uniforms: self.uniforms.clone(),
            uniform_names: self.uniform_names.clone(),
            textures: self.textures.clone(),
        }
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
