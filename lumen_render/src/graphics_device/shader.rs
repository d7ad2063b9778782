/// Shader stage and program reflection types

use std::fmt;

use super::{AttribLocation, UniformLocation};

/// Pipeline stage a shader object is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// Data type of an active attribute or uniform, as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderDataType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
}

impl ShaderDataType {
    /// Number of scalar components (a mat4 counts 16)
    pub fn components(&self) -> u32 {
        match self {
            ShaderDataType::Float | ShaderDataType::Int | ShaderDataType::Sampler2D => 1,
            ShaderDataType::Vec2 | ShaderDataType::IVec2 => 2,
            ShaderDataType::Vec3 | ShaderDataType::IVec3 => 3,
            ShaderDataType::Vec4 | ShaderDataType::IVec4 | ShaderDataType::Mat2 => 4,
            ShaderDataType::Mat3 => 9,
            ShaderDataType::Mat4 => 16,
        }
    }

    /// Parse a GLSL type name (`vec3`, `sampler2D`, ...)
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "float" => ShaderDataType::Float,
            "vec2" => ShaderDataType::Vec2,
            "vec3" => ShaderDataType::Vec3,
            "vec4" => ShaderDataType::Vec4,
            "int" => ShaderDataType::Int,
            "ivec2" => ShaderDataType::IVec2,
            "ivec3" => ShaderDataType::IVec3,
            "ivec4" => ShaderDataType::IVec4,
            "mat2" => ShaderDataType::Mat2,
            "mat3" => ShaderDataType::Mat3,
            "mat4" => ShaderDataType::Mat4,
            "sampler2D" => ShaderDataType::Sampler2D,
            _ => return None,
        })
    }
}

/// An active vertex attribute of a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: AttribLocation,
    pub data_type: ShaderDataType,
}

/// An active uniform of a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub location: UniformLocation,
    pub data_type: ShaderDataType,
}

/// Introspection result of a successful link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    pub attributes: Vec<ActiveAttribute>,
    pub uniforms: Vec<ActiveUniform>,
}
