//! 2D textures

use std::any::Any;
use std::rc::Rc;

use super::api::{GlApi, NativeId};
use super::handles::{OwnedHandle, TextureHandle};
use crate::render::api::{PixelFormat, Texture, TextureDescriptor, MAX_TEXTURE_SLOTS};
use crate::render::ResourceError;

/// Unit used while uploading; draw units `0..MAX_TEXTURE_SLOTS` stay untouched
pub const UPLOAD_TEXTURE_UNIT: u32 = MAX_TEXTURE_SLOTS as u32;

/// Texture created from a [`TextureDescriptor`]
#[derive(Debug)]
pub struct GlTexture {
    handle: OwnedHandle<TextureHandle>,
    size: (u32, u32),
    format: PixelFormat,
}

impl GlTexture {
    /// Validate the descriptor, allocate and upload
    pub fn create(api: &Rc<dyn GlApi>, descriptor: &TextureDescriptor) -> Result<Self, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "texture size {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        if let Some(data) = &descriptor.data {
            if data.len() != descriptor.expected_len() {
                return Err(ResourceError::SizeMismatch {
                    expected: descriptor.expected_len(),
                    actual: data.len(),
                });
            }
        }

        let handle = OwnedHandle::try_new(Rc::clone(api), TextureHandle::create(api.as_ref()))?;
        api.active_texture(UPLOAD_TEXTURE_UNIT);
        handle.bind();
        api.tex_image_2d(
            descriptor.width,
            descriptor.height,
            descriptor.format,
            descriptor.data.as_deref(),
        );
        api.tex_parameters(descriptor.filter, descriptor.wrap);

        Ok(Self {
            handle,
            size: (descriptor.width, descriptor.height),
            format: descriptor.format,
        })
    }

    /// Raw identifier
    pub fn id(&self) -> NativeId {
        self.handle.id()
    }
}

impl Texture for GlTexture {
    fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn bind(&self, slot: u32) {
        self.handle.api().active_texture(slot);
        self.handle.bind();
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::gl::headless::{HeadlessGl, ObjectKind};

    fn headless() -> (Rc<HeadlessGl>, Rc<dyn GlApi>) {
        let gl = Rc::new(HeadlessGl::new());
        let api: Rc<dyn GlApi> = gl.clone();
        (gl, api)
    }

    #[test]
    fn test_create_uploads_image() {
        let (gl, api) = headless();
        let desc = TextureDescriptor::with_data(2, 2, PixelFormat::Rgba8, vec![255; 16]);
        let texture = GlTexture::create(&api, &desc).unwrap();

        assert!(texture.is_valid());
        assert_eq!(texture.size(), (2, 2));
        assert_eq!(gl.texture_size(texture.id()), Some((2, 2)));
    }

    #[test]
    fn test_pixel_length_must_match() {
        let (gl, api) = headless();
        let desc = TextureDescriptor::with_data(2, 2, PixelFormat::Rgb8, vec![0; 11]);
        let result = GlTexture::create(&api, &desc);
        assert!(matches!(result, Err(ResourceError::SizeMismatch { expected: 12, actual: 11 })));
        assert_eq!(gl.allocation_count(ObjectKind::Texture), 0);
    }

    #[test]
    fn test_render_target_has_no_data() {
        let (gl, api) = headless();
        let desc = TextureDescriptor::render_target(64, 32, PixelFormat::Rgba8);
        let texture = GlTexture::create(&api, &desc).unwrap();
        assert_eq!(gl.texture_size(texture.id()), Some((64, 32)));
        assert!(GlTexture::create(&api, &TextureDescriptor::render_target(0, 32, PixelFormat::R8)).is_err());
    }

    #[test]
    fn test_upload_leaves_draw_units_alone() {
        let (gl, api) = headless();
        let bound = GlTexture::create(&api, &TextureDescriptor::render_target(4, 4, PixelFormat::R8)).unwrap();
        bound.bind(0);

        let fresh = GlTexture::create(&api, &TextureDescriptor::render_target(2, 2, PixelFormat::R8)).unwrap();
        assert_eq!(gl.bound_texture(0), bound.id());
        assert_eq!(gl.bound_texture(UPLOAD_TEXTURE_UNIT), fresh.id());
    }

    #[test]
    fn test_bind_selects_unit() {
        let (gl, api) = headless();
        let texture = GlTexture::create(&api, &TextureDescriptor::render_target(4, 4, PixelFormat::R8)).unwrap();
        texture.bind(5);
        assert_eq!(gl.bound_texture(5), texture.id());
    }
}
