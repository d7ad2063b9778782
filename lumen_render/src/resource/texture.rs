/// Texture resource: a decoded image uploaded as a 2D RGBA8 texture.
///
/// Decoding goes through the `image` crate (PNG and JPEG), so any source
/// format is converted to RGBA8 before upload.

use std::path::PathBuf;

use glam::UVec2;
use image::ImageError;

use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, SamplerParams, TextureFilter, TextureHandle, TextureUpload, TextureWrap,
};
use crate::hot_reload::clean_path;
use crate::resource::resource_store::{ResourceStore, StoreResource};

/// Store of textures keyed by caller-chosen names
pub type TextureStore = ResourceStore<Texture>;

// ===== DEFINITION =====

/// Image file plus sampling state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDefinition {
    pub path: PathBuf,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
}

impl TextureDefinition {
    /// Trilinear minification, linear magnification, repeat wrapping
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            min_filter: TextureFilter::LinearMipmapLinear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::Repeat,
            wrap_t: TextureWrap::Repeat,
        }
    }

    pub fn with_filters(mut self, min_filter: TextureFilter, mag_filter: TextureFilter) -> Self {
        self.min_filter = min_filter;
        self.mag_filter = mag_filter;
        self
    }

    pub fn with_wrap(mut self, wrap_s: TextureWrap, wrap_t: TextureWrap) -> Self {
        self.wrap_s = wrap_s;
        self.wrap_t = wrap_t;
        self
    }

    fn sampler_params(&self) -> SamplerParams {
        SamplerParams {
            min_filter: self.min_filter,
            mag_filter: self.mag_filter,
            wrap_s: self.wrap_s,
            wrap_t: self.wrap_t,
        }
    }
}

/// Decoded pixels awaiting upload
pub struct DecodedImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
    params: SamplerParams,
}

// ===== TEXTURE =====

#[derive(Debug)]
pub struct Texture {
    handle: TextureHandle,
    size: UVec2,
}

impl Texture {
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Width and height in pixels
    pub fn size(&self) -> UVec2 {
        self.size
    }
}

impl StoreResource for Texture {
    type Definition = TextureDefinition;
    type Source = DecodedImage;

    const LOG_SOURCE: &'static str = "lumen::TextureStore";
    const KIND: &'static str = "texture";

    fn normalize(definition: &mut TextureDefinition) {
        definition.path = clean_path(&definition.path);
    }

    fn source_paths(definition: &TextureDefinition) -> Vec<PathBuf> {
        vec![definition.path.clone()]
    }

    fn prepare(definition: &TextureDefinition) -> Result<DecodedImage> {
        let path = &definition.path;
        let image = image::open(path).map_err(|err| match err {
            ImageError::IoError(io) => Error::IoError(format!("{}: {}", path.display(), io)),
            other => Error::BuildFailed(format!("decode {}: {}", path.display(), other)),
        })?;
        let rgba = image.to_rgba8();
        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
            params: definition.sampler_params(),
        })
    }

    fn create(device: &mut dyn GraphicsDevice, image: DecodedImage) -> Result<Self> {
        let handle = device
            .create_texture(&TextureUpload {
                width: image.width,
                height: image.height,
                rgba: &image.rgba,
                params: image.params,
                generate_mipmaps: image.params.min_filter.uses_mipmaps(),
            })
            .map_err(|err| Error::BuildFailed(format!("upload texture: {}", err)))?;
        Ok(Self {
            handle,
            size: UVec2::new(image.width, image.height),
        })
    }

    fn destroy(&self, device: &mut dyn GraphicsDevice) {
        device.delete_texture(self.handle);
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
