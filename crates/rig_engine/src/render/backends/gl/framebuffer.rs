//! Framebuffers and render buffers

use std::any::Any;
use std::rc::Rc;

use super::api::{GlApi, NativeId, FRAMEBUFFER_COMPLETE, NULL_ID};
use super::handles::{FramebufferHandle, OwnedHandle, RenderbufferHandle};
use super::texture::GlTexture;
use crate::render::api::{
    FrameBufferAttachment, FrameBufferObject, FrameBufferObjectDescriptor, FrameBufferTarget, PixelFormat,
    RenderBufferObject, RenderBufferObjectDescriptor, Texture,
};
use crate::render::ResourceError;

/// Render buffer storage
#[derive(Debug)]
pub struct GlRenderBufferObject {
    handle: OwnedHandle<RenderbufferHandle>,
    size: (u32, u32),
    format: PixelFormat,
}

impl GlRenderBufferObject {
    /// Allocate storage of the described size and format
    pub fn create(api: &Rc<dyn GlApi>, descriptor: &RenderBufferObjectDescriptor) -> Result<Self, ResourceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "render buffer size {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        let handle = OwnedHandle::try_new(Rc::clone(api), RenderbufferHandle::create(api.as_ref()))?;
        handle.bind();
        api.renderbuffer_storage(descriptor.format, descriptor.width, descriptor.height);
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

impl RenderBufferObject for GlRenderBufferObject {
    fn is_valid(&self) -> bool {
        self.handle.is_valid()
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

/// Off-screen render target
///
/// Holds its attachments so they live at least as long as the framebuffer.
pub struct GlFrameBufferObject {
    handle: OwnedHandle<FramebufferHandle>,
    attachments: Vec<FrameBufferAttachment>,
}

fn attachment_id(attachment: &FrameBufferAttachment) -> Result<NativeId, ResourceError> {
    let id = match attachment {
        FrameBufferAttachment::Texture(texture) if texture.is_valid() => texture
            .as_any()
            .downcast_ref::<GlTexture>()
            .map(GlTexture::id),
        FrameBufferAttachment::RenderBuffer(buffer) if buffer.is_valid() => buffer
            .as_any()
            .downcast_ref::<GlRenderBufferObject>()
            .map(GlRenderBufferObject::id),
        _ => return Err(ResourceError::InvalidHandle("framebuffer attachment")),
    };
    id.ok_or_else(|| ResourceError::InvalidDescriptor("attachment was not created by this backend".to_owned()))
}

impl GlFrameBufferObject {
    /// Allocate a framebuffer, attach everything and check completeness
    ///
    /// Leaves the default framebuffer bound.
    pub fn create(api: &Rc<dyn GlApi>, descriptor: &FrameBufferObjectDescriptor) -> Result<Self, ResourceError> {
        if descriptor.attachments.is_empty() {
            return Err(ResourceError::InvalidDescriptor("framebuffer has no attachments".to_owned()));
        }
        let ids = descriptor
            .attachments
            .iter()
            .map(|(point, attachment)| attachment_id(attachment).map(|id| (*point, id)))
            .collect::<Result<Vec<_>, _>>()?;

        let handle = OwnedHandle::try_new(Rc::clone(api), FramebufferHandle::create(api.as_ref()))?;
        handle.bind();
        for (&(point, id), (_, attachment)) in ids.iter().zip(&descriptor.attachments) {
            match attachment {
                FrameBufferAttachment::Texture(_) => api.framebuffer_texture_2d(point, id),
                FrameBufferAttachment::RenderBuffer(_) => api.framebuffer_renderbuffer(point, id),
            }
        }
        let status = api.check_framebuffer_status();
        api.bind_framebuffer(FrameBufferTarget::ReadDraw, NULL_ID);

        if status != FRAMEBUFFER_COMPLETE {
            return Err(ResourceError::IncompleteFramebuffer(status));
        }
        Ok(Self {
            handle,
            attachments: descriptor.attachments.iter().map(|(_, a)| a.clone()).collect(),
        })
    }

    /// Raw identifier
    pub fn id(&self) -> NativeId {
        self.handle.id()
    }
}

impl FrameBufferObject for GlFrameBufferObject {
    fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn bind(&self, target: FrameBufferTarget) {
        if self.handle.is_valid() {
            self.handle.api().bind_framebuffer(target, self.handle.id());
        } else {
            log::error!("Refusing to bind invalid framebuffer");
        }
    }

    fn attachment_count(&self) -> usize {
        self.attachments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{AttachmentPoint, TextureDescriptor};
    use crate::render::backends::gl::headless::{HeadlessGl, ObjectKind};

    fn headless() -> (Rc<HeadlessGl>, Rc<dyn GlApi>) {
        let gl = Rc::new(HeadlessGl::new());
        let api: Rc<dyn GlApi> = gl.clone();
        (gl, api)
    }

    #[test]
    fn test_color_and_depth_attachments() {
        let (gl, api) = headless();
        let color: Rc<dyn Texture> =
            Rc::new(GlTexture::create(&api, &TextureDescriptor::render_target(8, 8, PixelFormat::Rgba8)).unwrap());
        let depth: Rc<dyn RenderBufferObject> = Rc::new(
            GlRenderBufferObject::create(
                &api,
                &RenderBufferObjectDescriptor {
                    width: 8,
                    height: 8,
                    format: PixelFormat::Depth24Stencil8,
                },
            )
            .unwrap(),
        );

        let desc = FrameBufferObjectDescriptor::default()
            .with_texture(AttachmentPoint::Color(0), color)
            .with_render_buffer(AttachmentPoint::DepthStencil, depth);
        let fbo = GlFrameBufferObject::create(&api, &desc).unwrap();
        drop(desc);

        assert_eq!(fbo.attachment_count(), 2);
        assert_eq!(gl.bound_framebuffer(FrameBufferTarget::Draw), NULL_ID);

        // Attachments stay alive with the framebuffer
        assert_eq!(gl.live_count(ObjectKind::Texture), 1);
        drop(fbo);
        assert_eq!(gl.live_count(ObjectKind::Texture), 0);
        assert_eq!(gl.live_count(ObjectKind::Renderbuffer), 0);
    }

    #[test]
    fn test_empty_framebuffer_is_rejected() {
        let (gl, api) = headless();
        let result = GlFrameBufferObject::create(&api, &FrameBufferObjectDescriptor::default());
        assert!(matches!(result, Err(ResourceError::InvalidDescriptor(_))));
        assert_eq!(gl.allocation_count(ObjectKind::Framebuffer), 0);
    }

    #[test]
    fn test_bind_target() {
        let (gl, api) = headless();
        let color: Rc<dyn Texture> =
            Rc::new(GlTexture::create(&api, &TextureDescriptor::render_target(4, 4, PixelFormat::Rgb8)).unwrap());
        let desc = FrameBufferObjectDescriptor::default().with_texture(AttachmentPoint::Color(0), color);
        let fbo = GlFrameBufferObject::create(&api, &desc).unwrap();

        fbo.bind(FrameBufferTarget::Read);
        assert_eq!(gl.bound_framebuffer(FrameBufferTarget::Read), fbo.id());
        assert_eq!(gl.bound_framebuffer(FrameBufferTarget::Draw), NULL_ID);
    }
}
