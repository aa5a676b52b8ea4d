//! Decoded images for texture upload
//!
//! Decodes image files with the `image` crate into tightly packed 8-bit
//! pixels, bottom row first, ready for [`TextureDescriptor`].

use std::path::Path;
use std::rc::Rc;

use image::DynamicImage;

use crate::assets::AssetError;
use crate::render::api::{PixelFormat, Renderer, Texture, TextureDescriptor, TextureFilter, TextureWrap};

/// Decoded 8-bit pixels plus their layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw pixel data, rows bottom to top
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Pixel format (1 to 4 8-bit channels)
    pub format: PixelFormat,
}

impl ImageData {
    /// Decode a file; the format is sniffed from its contents and extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to decode {}: {e}", path.display())))?;
        let data = Self::from_image(&img);
        log::info!("Decoded {:?} image {}x{} from {:?}", data.format, data.width, data.height, path);
        Ok(data)
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| AssetError::LoadFailed(format!("Failed to load image from bytes: {e}")))?;
        let data = Self::from_image(&img);
        log::debug!("Loaded image {}x{} from memory", data.width, data.height);
        Ok(data)
    }

    /// Keep the source channel count where an 8-bit format exists, else expand to RGBA
    fn from_image(img: &DynamicImage) -> Self {
        let img = img.flipv();
        let (width, height) = (img.width(), img.height());
        let (data, format) = match img.color().channel_count() {
            1 => (img.to_luma8().into_raw(), PixelFormat::R8),
            2 => (img.to_luma_alpha8().into_raw(), PixelFormat::Rg8),
            3 => (img.to_rgb8().into_raw(), PixelFormat::Rgb8),
            _ => (img.to_rgba8().into_raw(), PixelFormat::Rgba8),
        };
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// Single-colour RGBA image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
            format: PixelFormat::Rgba8,
        }
    }

    /// Pixel payload length in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Whether both sides are powers of two
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Texture descriptor carrying a copy of the pixels
    pub fn to_texture_descriptor(&self, filter: TextureFilter, wrap: TextureWrap) -> TextureDescriptor {
        TextureDescriptor {
            filter,
            wrap,
            ..TextureDescriptor::with_data(self.width, self.height, self.format, self.data.clone())
        }
    }
}

/// Creates textures from image files through a [`Renderer`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader {
    /// Filter applied to loaded textures
    pub filter: TextureFilter,
    /// Wrapping applied to loaded textures
    pub wrap: TextureWrap,
}

impl ImageLoader {
    /// Loader with the given sampling state
    pub const fn new(filter: TextureFilter, wrap: TextureWrap) -> Self {
        Self { filter, wrap }
    }

    /// Decode `path` and upload it
    pub fn load_texture<P: AsRef<Path>>(&self, renderer: &dyn Renderer, path: P) -> Result<Rc<dyn Texture>, AssetError> {
        let image = ImageData::from_file(path.as_ref())?;
        self.create_texture(renderer, &image)
            .ok_or_else(|| AssetError::LoadFailed(format!("Texture creation failed for {}", path.as_ref().display())))
    }

    /// Upload already decoded pixels
    pub fn create_texture(&self, renderer: &dyn Renderer, image: &ImageData) -> Option<Rc<dyn Texture>> {
        renderer.create_texture(&image.to_texture_descriptor(self.filter, self.wrap))
    }
}
