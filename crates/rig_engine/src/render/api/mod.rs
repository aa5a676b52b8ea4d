//! Backend-agnostic rendering contracts
//!
//! This module defines the descriptors, resource capability traits and the
//! renderer facade that backends implement.

pub mod debug_monitor;
pub mod descriptors;
pub mod renderer;
pub mod resources;

pub use debug_monitor::{
    log_debug_messages_and_flush, DebugSeverity, RendererDebugMessage, RendererDebugMessageMonitor,
};
pub use descriptors::{
    AttachmentPoint, BufferComponentDataType, BufferDescriptor, BufferObjectType, BufferUsage,
    FrameBufferAttachment, FrameBufferObjectDescriptor, FrameBufferTarget, PixelFormat,
    RenderBufferObjectDescriptor, TextureDescriptor, TextureFilter, TextureWrap,
};
pub use renderer::{DrawState, MeshRenderMode, Renderer, MAX_TEXTURE_SLOTS};
pub use resources::{
    FrameBufferObject, GpuBufferArrayObject, GpuBufferObject, GpuProgram, RenderBufferObject, Texture,
};
