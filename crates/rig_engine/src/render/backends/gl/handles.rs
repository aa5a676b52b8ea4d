//! Handle layer
//!
//! A handle is a plain `Copy` record naming one native object, plus whatever
//! metadata is needed to rebuild the calls made against it. An identifier of
//! [`NULL_ID`] marks a handle whose creation failed. Handles never free
//! themselves; [`OwnedHandle`] gives one exactly one owner and frees it
//! exactly once when that owner is dropped.

use std::fmt;
use std::rc::Rc;

use super::api::{BufferTarget, GlApi, NativeId, ShaderStage, NULL_ID};
use crate::render::api::{BufferDescriptor, BufferObjectType, FrameBufferTarget};
use crate::render::ResourceError;

/// Operations shared by every native handle kind
pub trait NativeHandle: Copy + fmt::Debug {
    /// Object kind, for diagnostics
    const KIND: &'static str;

    /// Raw identifier
    fn id(&self) -> NativeId;

    /// Whether creation succeeded
    fn is_valid(&self) -> bool {
        self.id() != NULL_ID
    }

    /// Bind the object; only called on valid handles
    fn bind(&self, api: &dyn GlApi);

    /// Delete the object; only called on valid handles
    fn free(&self, api: &dyn GlApi);
}

/// Linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHandle {
    id: NativeId,
}

impl ProgramHandle {
    /// Allocate a program object
    pub fn create(api: &dyn GlApi) -> Self {
        Self { id: api.create_program() }
    }
}

impl NativeHandle for ProgramHandle {
    const KIND: &'static str = "program";

    fn id(&self) -> NativeId {
        self.id
    }

    fn bind(&self, api: &dyn GlApi) {
        api.use_program(self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_program(self.id);
    }
}

/// Shader stage object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderHandle {
    id: NativeId,
    stage: ShaderStage,
}

impl ShaderHandle {
    /// Allocate a shader object for `stage`
    pub fn create(api: &dyn GlApi, stage: ShaderStage) -> Self {
        Self {
            id: api.create_shader(stage),
            stage,
        }
    }

    /// Pipeline stage
    pub const fn stage(&self) -> ShaderStage {
        self.stage
    }
}

impl NativeHandle for ShaderHandle {
    const KIND: &'static str = "shader";

    fn id(&self) -> NativeId {
        self.id
    }

    /// Shaders have no binding point; programs are bound instead
    fn bind(&self, _api: &dyn GlApi) {}

    fn free(&self, api: &dyn GlApi) {
        api.delete_shader(self.id);
    }
}

/// Buffer object with its declared layout and current element count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle {
    id: NativeId,
    descriptor: BufferDescriptor,
    count: u32,
}

impl BufferHandle {
    /// Wrap an identifier produced by a batch allocation
    pub const fn from_raw(id: NativeId, descriptor: BufferDescriptor) -> Self {
        Self {
            id,
            descriptor,
            count: 0,
        }
    }

    /// Binding point implied by the role
    pub const fn target(&self) -> BufferTarget {
        match self.descriptor.buffer_type {
            BufferObjectType::Index => BufferTarget::ElementArray,
            BufferObjectType::Vertex => BufferTarget::Array,
        }
    }

    /// Declared layout
    pub const fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Elements in the last upload
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Bytes per element
    pub const fn element_bytes(&self) -> usize {
        self.descriptor.element_byte_width()
    }

    /// Total bytes of the last upload
    pub const fn byte_size(&self) -> usize {
        self.count as usize * self.element_bytes()
    }

    pub(crate) fn set_count(&mut self, count: u32) {
        self.count = count;
    }
}

impl NativeHandle for BufferHandle {
    const KIND: &'static str = "buffer";

    fn id(&self) -> NativeId {
        self.id
    }

    fn bind(&self, api: &dyn GlApi) {
        api.bind_buffer(self.target(), self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_buffer(self.id);
    }
}

/// Vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexArrayHandle {
    id: NativeId,
}

impl VertexArrayHandle {
    /// Allocate a vertex array
    pub fn create(api: &dyn GlApi) -> Self {
        Self {
            id: api.create_vertex_array(),
        }
    }
}

impl NativeHandle for VertexArrayHandle {
    const KIND: &'static str = "vertex array";

    fn id(&self) -> NativeId {
        self.id
    }

    fn bind(&self, api: &dyn GlApi) {
        api.bind_vertex_array(self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_vertex_array(self.id);
    }
}

/// 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureHandle {
    id: NativeId,
}

impl TextureHandle {
    /// Allocate a texture
    pub fn create(api: &dyn GlApi) -> Self {
        Self { id: api.create_texture() }
    }
}

impl NativeHandle for TextureHandle {
    const KIND: &'static str = "texture";

    fn id(&self) -> NativeId {
        self.id
    }

    /// Binds to the currently active texture unit
    fn bind(&self, api: &dyn GlApi) {
        api.bind_texture(self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_texture(self.id);
    }
}

/// Framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferHandle {
    id: NativeId,
}

impl FramebufferHandle {
    /// Allocate a framebuffer
    pub fn create(api: &dyn GlApi) -> Self {
        Self {
            id: api.create_framebuffer(),
        }
    }
}

impl NativeHandle for FramebufferHandle {
    const KIND: &'static str = "framebuffer";

    fn id(&self) -> NativeId {
        self.id
    }

    fn bind(&self, api: &dyn GlApi) {
        api.bind_framebuffer(FrameBufferTarget::ReadDraw, self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_framebuffer(self.id);
    }
}

/// Render buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderbufferHandle {
    id: NativeId,
}

impl RenderbufferHandle {
    /// Allocate a render buffer
    pub fn create(api: &dyn GlApi) -> Self {
        Self {
            id: api.create_renderbuffer(),
        }
    }
}

impl NativeHandle for RenderbufferHandle {
    const KIND: &'static str = "render buffer";

    fn id(&self) -> NativeId {
        self.id
    }

    fn bind(&self, api: &dyn GlApi) {
        api.bind_renderbuffer(self.id);
    }

    fn free(&self, api: &dyn GlApi) {
        api.delete_renderbuffer(self.id);
    }
}

/// Unique owner of a native handle
///
/// Dropping the owner frees the handle, once, and only if it is valid.
/// Binding an invalid handle is a contract violation: debug builds panic,
/// release builds log an error and skip the call.
pub struct OwnedHandle<H: NativeHandle> {
    handle: H,
    api: Rc<dyn GlApi>,
    owns: bool,
}

impl<H: NativeHandle> OwnedHandle<H> {
    /// Take ownership of `handle`, valid or not
    pub fn new(api: Rc<dyn GlApi>, handle: H) -> Self {
        Self {
            handle,
            api,
            owns: true,
        }
    }

    /// Take ownership of `handle`, failing if it is invalid
    pub fn try_new(api: Rc<dyn GlApi>, handle: H) -> Result<Self, ResourceError> {
        if handle.is_valid() {
            Ok(Self::new(api, handle))
        } else {
            Err(ResourceError::HandleCreation(H::KIND))
        }
    }

    /// The owned handle
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub(crate) fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Raw identifier
    pub fn id(&self) -> NativeId {
        self.handle.id()
    }

    /// Whether the handle is valid
    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    /// Native function table this handle was created against
    pub fn api(&self) -> &dyn GlApi {
        self.api.as_ref()
    }

    /// Bind the handle; returns `false` (and binds nothing) if it is invalid
    pub fn bind(&self) -> bool {
        let valid = self.handle.is_valid();
        debug_assert!(valid, "bind on invalid {} handle", H::KIND);
        if !valid {
            log::error!("Refusing to bind invalid {} handle", H::KIND);
            return false;
        }
        self.handle.bind(self.api.as_ref());
        true
    }

    /// Give up ownership without freeing
    pub fn release(mut self) -> H {
        self.owns = false;
        self.handle
    }
}

impl<H: NativeHandle> fmt::Debug for OwnedHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedHandle")
            .field("handle", &self.handle)
            .field("owns", &self.owns)
            .finish()
    }
}

impl<H: NativeHandle> Drop for OwnedHandle<H> {
    fn drop(&mut self) {
        if self.owns && self.handle.is_valid() {
            log::trace!("Freeing {} {}", H::KIND, self.handle.id());
            self.handle.free(self.api.as_ref());
        }
    }
}

/// Allocate one buffer per descriptor in a single native call
///
/// If any member of the batch fails, every buffer already allocated in the
/// batch is freed before the error is returned.
pub fn allocate_buffer_batch(
    api: &Rc<dyn GlApi>,
    descriptors: &[BufferDescriptor],
) -> Result<Vec<OwnedHandle<BufferHandle>>, ResourceError> {
    if descriptors.is_empty() {
        return Err(ResourceError::EmptyBatch);
    }

    let ids = api.create_buffers(descriptors.len());
    let owned: Vec<OwnedHandle<BufferHandle>> = descriptors
        .iter()
        .enumerate()
        .map(|(slot, descriptor)| {
            let id = ids.get(slot).copied().unwrap_or(NULL_ID);
            OwnedHandle::new(Rc::clone(api), BufferHandle::from_raw(id, *descriptor))
        })
        .collect();

    if let Some(slot) = owned.iter().position(|handle| !handle.is_valid()) {
        log::warn!(
            "Buffer batch of {} failed at slot {}; releasing {} allocated buffers",
            descriptors.len(),
            slot,
            owned.iter().filter(|h| h.is_valid()).count()
        );
        // Dropping `owned` frees the valid members
        return Err(ResourceError::HandleCreation(BufferHandle::KIND));
    }
    Ok(owned)
}
