/// Shader program resource: a linked vertex + fragment pair with reflection.
///
/// Two uniforms are reserved and fed by the render state rather than by
/// materials:
/// - `modelTransform`: top of the transform stack, pushed every draw
/// - `vpMatrix`: camera view-projection, pushed on program activation

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graphics_device::{
    ActiveAttribute, ActiveUniform, GraphicsDevice, ProgramHandle, ProgramReflection, ShaderStage,
    UniformLocation,
};
use crate::hot_reload::clean_path;
use crate::resource::resource_store::{ResourceStore, StoreResource};

/// Uniform receiving the per-draw model transform
pub const MODEL_TRANSFORM_UNIFORM: &str = "modelTransform";

/// Uniform receiving the camera view-projection matrix
pub const VIEW_PROJECTION_UNIFORM: &str = "vpMatrix";

/// Store of shader programs keyed by caller-chosen names
pub type ShaderStore = ResourceStore<ShaderProgram>;

// ===== DEFINITION =====

/// Source files of a shader program
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderProgramDefinition {
    pub vertex_path: PathBuf,
    pub fragment_path: PathBuf,
}

impl ShaderProgramDefinition {
    pub fn new(vertex_path: impl Into<PathBuf>, fragment_path: impl Into<PathBuf>) -> Self {
        Self {
            vertex_path: vertex_path.into(),
            fragment_path: fragment_path.into(),
        }
    }
}

/// Sources read from disk, ready to compile
pub struct ShaderSources {
    vertex_name: String,
    vertex: String,
    fragment_name: String,
    fragment: String,
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|err| Error::IoError(format!("{}: {}", path.display(), err)))
}

// ===== SHADER PROGRAM =====

#[derive(Debug)]
pub struct ShaderProgram {
    program: ProgramHandle,
    attributes: Vec<ActiveAttribute>,
    attribute_names: FxHashMap<String, usize>,
    uniforms: Vec<ActiveUniform>,
    uniform_names: FxHashMap<String, usize>,
    model_transform: Option<UniformLocation>,
    view_projection: Option<UniformLocation>,
}

impl ShaderProgram {
    /// Wrap a linked program, splitting the reserved uniforms out
    pub fn from_reflection(program: ProgramHandle, reflection: ProgramReflection) -> Self {
        let mut model_transform = None;
        let mut view_projection = None;
        let mut uniforms = Vec::with_capacity(reflection.uniforms.len());
        for uniform in reflection.uniforms {
            match uniform.name.as_str() {
                MODEL_TRANSFORM_UNIFORM => model_transform = Some(uniform.location),
                VIEW_PROJECTION_UNIFORM => view_projection = Some(uniform.location),
                _ => uniforms.push(uniform),
            }
        }

        let attributes = reflection.attributes;
        let attribute_names = attributes
            .iter()
            .enumerate()
            .map(|(index, attribute)| (attribute.name.clone(), index))
            .collect();
        let uniform_names = uniforms
            .iter()
            .enumerate()
            .map(|(index, uniform)| (uniform.name.clone(), index))
            .collect();

        Self {
            program,
            attributes,
            attribute_names,
            uniforms,
            uniform_names,
            model_transform,
            view_projection,
        }
    }

    // ===== ACCESSORS =====

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Active vertex attributes, in link order
    pub fn attributes(&self) -> &[ActiveAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&ActiveAttribute> {
        self.attribute_names.get(name).map(|&index| &self.attributes[index])
    }

    /// Active uniforms, excluding the reserved transform uniforms
    pub fn uniforms(&self) -> &[ActiveUniform] {
        &self.uniforms
    }

    pub fn uniform(&self, name: &str) -> Option<&ActiveUniform> {
        self.uniform_names.get(name).map(|&index| &self.uniforms[index])
    }

    pub fn model_transform_location(&self) -> Option<UniformLocation> {
        self.model_transform
    }

    pub fn view_projection_location(&self) -> Option<UniformLocation> {
        self.view_projection
    }

    /// Floats per vertex the program consumes (sum of attribute components)
    pub fn expected_vertex_elements(&self) -> u32 {
        self.attributes.iter().map(|a| a.data_type.components()).sum()
    }
}

impl StoreResource for ShaderProgram {
    type Definition = ShaderProgramDefinition;
    type Source = ShaderSources;

    const LOG_SOURCE: &'static str = "lumen::ShaderStore";
    const KIND: &'static str = "shader";

    fn normalize(definition: &mut ShaderProgramDefinition) {
        definition.vertex_path = clean_path(&definition.vertex_path);
        definition.fragment_path = clean_path(&definition.fragment_path);
    }

    fn source_paths(definition: &ShaderProgramDefinition) -> Vec<PathBuf> {
        vec![definition.vertex_path.clone(), definition.fragment_path.clone()]
    }

    fn prepare(definition: &ShaderProgramDefinition) -> Result<ShaderSources> {
        Ok(ShaderSources {
            vertex_name: definition.vertex_path.display().to_string(),
            vertex: read_source(&definition.vertex_path)?,
            fragment_name: definition.fragment_path.display().to_string(),
            fragment: read_source(&definition.fragment_path)?,
        })
    }

    fn create(device: &mut dyn GraphicsDevice, sources: ShaderSources) -> Result<Self> {
        let vertex = device
            .compile_shader(ShaderStage::Vertex, &sources.vertex_name, &sources.vertex)
            .map_err(|err| Error::BuildFailed(format!("compile shaders: {}", err)))?;
        let fragment = match device.compile_shader(ShaderStage::Fragment, &sources.fragment_name, &sources.fragment) {
            Ok(fragment) => fragment,
            Err(err) => {
                device.delete_shader(vertex);
                return Err(Error::BuildFailed(format!("compile shaders: {}", err)));
            }
        };

        let linked = device.link_program(&[vertex, fragment]);
        device.delete_shader(vertex);
        device.delete_shader(fragment);

        let (program, reflection) =
            linked.map_err(|err| Error::BuildFailed(format!("link program: {}", err)))?;
        Ok(Self::from_reflection(program, reflection))
    }

    fn destroy(&self, device: &mut dyn GraphicsDevice) {
        device.delete_program(self.program);
    }
}

#[cfg(test)]
#[path = "shader_program_tests.rs"]
mod tests;
