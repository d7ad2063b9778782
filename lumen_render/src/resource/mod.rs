//! GPU resources and the data that feeds them.
//!
//! Shader programs and textures live in keyed, hot-reloadable
//! [`ResourceStore`]s. Materials, geometry and meshes are owned by the
//! caller and reference stored resources by key.

pub mod geometry;
pub mod material;
pub mod mesh;
pub mod resource_store;
pub mod shader_program;
pub mod texture;

pub use geometry::{validate_geometry, BufferLayout, Geometry, MAX_INDEXED_VERTICES};
pub use material::{Material, MaterialId, TextureBinding};
pub use mesh::Mesh;
pub use resource_store::{ResourceStore, StoreResource, VersionedId};
pub use shader_program::{
    ShaderProgram, ShaderProgramDefinition, ShaderStore, MODEL_TRANSFORM_UNIFORM,
    VIEW_PROJECTION_UNIFORM,
};
pub use texture::{Texture, TextureDefinition, TextureStore};
