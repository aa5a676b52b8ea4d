//! Capability traits for GPU-backed resources
//!
//! Each resource kind has exactly one production implementation (the OpenGL
//! backend). Keeping the contracts here keeps native types out of
//! application code.

use std::any::Any;

use bytemuck::Pod;

use super::descriptors::{BufferDescriptor, FrameBufferTarget, PixelFormat};
use crate::foundation::math::Mat4;
use crate::render::ResourceError;

/// A linked shader program
pub trait GpuProgram {
    /// Whether the native program exists
    fn is_valid(&self) -> bool;

    /// Make this the active program for subsequent draws
    fn bind(&self);

    /// Upload a `mat4` (or `mat4[]`) uniform; returns `false` if the program
    /// has no active uniform with that name
    fn set_mat4(&self, name: &str, matrices: &[Mat4]) -> bool;
}

/// One typed attribute or index buffer
pub trait GpuBufferObject {
    /// Whether the native buffer exists
    fn is_valid(&self) -> bool;

    /// Layout fixed at creation
    fn descriptor(&self) -> &BufferDescriptor;

    /// Number of elements in the last upload
    fn element_count(&self) -> u32;

    /// Bind as the active buffer of this object's role
    fn bind(&self);

    /// Replace the storage with `element_count` elements read from `data`
    ///
    /// The byte count is `element_count * descriptor().element_byte_width()`;
    /// `data` must hold at least that many bytes.
    fn update_bytes(&mut self, element_count: u32, data: &[u8]) -> Result<(), ResourceError>;
}

impl dyn GpuBufferObject + '_ {
    /// Replace the storage from a typed slice
    ///
    /// The slice is re-validated against the declared layout: its byte length
    /// must be a whole number of declared elements.
    pub fn update_buffer<T: Pod>(&mut self, data: &[T]) -> Result<(), ResourceError> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let element_count = whole_elements(self.descriptor(), bytes.len())?;
        self.update_bytes(element_count, bytes)
    }
}

pub(crate) fn whole_elements(descriptor: &BufferDescriptor, byte_len: usize) -> Result<u32, ResourceError> {
    let width = descriptor.element_byte_width();
    if width == 0 || byte_len % width != 0 {
        return Err(ResourceError::SizeMismatch {
            expected: byte_len - byte_len % width.max(1),
            actual: byte_len,
        });
    }
    u32::try_from(byte_len / width).map_err(|_| {
        ResourceError::InvalidDescriptor(format!("{} elements exceed the native count range", byte_len / width))
    })
}

/// A set of buffers bound together under one vertex array; the unit a draw renders
pub trait GpuBufferArrayObject {
    /// Whether the vertex array and every constituent buffer exist
    fn is_valid(&self) -> bool;

    /// Bind the vertex array
    fn bind(&self);

    /// Buffer at `slot` (descriptor order); out-of-range is a caller bug and panics
    fn buffer_object(&self, slot: usize) -> &dyn GpuBufferObject;

    /// Mutable buffer at `slot`; out-of-range panics
    fn buffer_object_mut(&mut self, slot: usize) -> &mut dyn GpuBufferObject;

    /// Number of slots
    fn buffer_object_count(&self) -> usize;

    /// Replace one slot's data without touching the others
    fn update_buffer(&mut self, slot: usize, element_count: u32, data: &[u8]) -> Result<(), ResourceError>;

    /// Element count currently held by the index slot (0 without one)
    fn index_count(&self) -> u32;

    /// Indexed triangle draw; returns whether a native draw was issued
    ///
    /// `None` draws everything held by the index slot.
    fn render(&self, index_count: Option<u32>) -> bool;

    /// Indexed line draw; returns whether a native draw was issued
    fn render_lines(&self, index_count: Option<u32>) -> bool;
}

impl dyn GpuBufferArrayObject + '_ {
    /// Replace one slot from a typed slice
    pub fn update_slot<T: Pod>(&mut self, slot: usize, data: &[T]) -> Result<(), ResourceError> {
        self.buffer_object_mut(slot).update_buffer(data)
    }
}

/// A sampled 2D texture
pub trait Texture {
    /// Whether the native texture exists
    fn is_valid(&self) -> bool;

    /// Bind to texture unit `slot`
    fn bind(&self, slot: u32);

    /// Width and height in pixels
    fn size(&self) -> (u32, u32);

    /// Pixel format
    fn format(&self) -> PixelFormat;

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn Any;
}

/// A non-sampleable render target image
pub trait RenderBufferObject {
    /// Whether the native render buffer exists
    fn is_valid(&self) -> bool;

    /// Width and height in pixels
    fn size(&self) -> (u32, u32);

    /// Storage format
    fn format(&self) -> PixelFormat;

    /// Downcast to the concrete backend type
    fn as_any(&self) -> &dyn Any;
}

/// An off-screen render target
pub trait FrameBufferObject {
    /// Whether the native framebuffer exists
    fn is_valid(&self) -> bool;

    /// Bind as the render target for `target`
    fn bind(&self, target: FrameBufferTarget);

    /// Number of attached images
    fn attachment_count(&self) -> usize;
}
