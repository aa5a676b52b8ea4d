//! OpenGL buffer object

use std::rc::Rc;

use super::api::{BufferTarget, GlApi, NativeId, NULL_ID};
use super::handles::{BufferHandle, NativeHandle, OwnedHandle};
use crate::render::api::{BufferDescriptor, BufferUsage, GpuBufferObject};
use crate::render::ResourceError;

/// One typed buffer with a fixed layout
///
/// Every upload is a full replace of the native storage, always with the
/// same usage hint.
#[derive(Debug)]
pub struct GlBufferObject {
    handle: OwnedHandle<BufferHandle>,
    usage: BufferUsage,
    // Element array bindings are vertex array state. Index uploads bind the
    // owning vertex array (none for a standalone buffer) and leave no vertex
    // array bound afterwards.
    vertex_array: NativeId,
}

impl GlBufferObject {
    /// Allocate a standalone buffer; the result is invalid if allocation failed
    pub fn create(api: &Rc<dyn GlApi>, descriptor: BufferDescriptor, usage: BufferUsage) -> Self {
        let id = api.create_buffers(1).first().copied().unwrap_or(NULL_ID);
        if id == NULL_ID {
            log::warn!("Failed to allocate {:?} buffer", descriptor.buffer_type);
        }
        Self::from_owned(OwnedHandle::new(Rc::clone(api), BufferHandle::from_raw(id, descriptor)), usage)
    }

    pub(crate) fn from_owned(handle: OwnedHandle<BufferHandle>, usage: BufferUsage) -> Self {
        Self {
            handle,
            usage,
            vertex_array: NULL_ID,
        }
    }

    pub(crate) fn set_vertex_array(&mut self, vertex_array: NativeId) {
        self.vertex_array = vertex_array;
    }

    /// Raw identifier
    pub fn id(&self) -> NativeId {
        self.handle.id()
    }

    /// Usage hint applied to every upload
    pub const fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl GpuBufferObject for GlBufferObject {
    fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    fn descriptor(&self) -> &BufferDescriptor {
        self.handle.handle().descriptor()
    }

    fn element_count(&self) -> u32 {
        self.handle.handle().count()
    }

    fn bind(&self) {
        self.handle.bind();
    }

    fn update_bytes(&mut self, element_count: u32, data: &[u8]) -> Result<(), ResourceError> {
        if !self.handle.is_valid() {
            return Err(ResourceError::InvalidHandle(BufferHandle::KIND));
        }

        let byte_len = element_count as usize * self.handle.handle().element_bytes();
        let bytes = data.get(..byte_len).ok_or(ResourceError::SizeMismatch {
            expected: byte_len,
            actual: data.len(),
        })?;

        let api = self.handle.api();
        let target = self.handle.handle().target();
        let is_index = target == BufferTarget::ElementArray;
        if is_index {
            api.bind_vertex_array(self.vertex_array);
        }
        self.handle.bind();
        api.buffer_data(target, bytes, self.usage);
        if is_index && self.vertex_array != NULL_ID {
            api.bind_vertex_array(NULL_ID);
        }
        self.handle.handle_mut().set_count(element_count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::BufferComponentDataType;
    use crate::render::backends::gl::headless::{HeadlessGl, ObjectKind};

    fn headless() -> (Rc<HeadlessGl>, Rc<dyn GlApi>) {
        let gl = Rc::new(HeadlessGl::new());
        let api: Rc<dyn GlApi> = gl.clone();
        (gl, api)
    }

    #[test]
    fn test_create_then_is_valid() {
        let (_gl, api) = headless();
        let desc = BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1);
        let buffer = GlBufferObject::create(&api, desc, BufferUsage::Static);
        assert!(buffer.is_valid());
        assert_eq!(buffer.element_count(), 0);
    }

    #[test]
    fn test_failed_allocation_is_invalid() {
        let (gl, api) = headless();
        gl.fail_next(ObjectKind::Buffer, 1);
        let desc = BufferDescriptor::index(BufferComponentDataType::Uint32);
        let mut buffer = GlBufferObject::create(&api, desc, BufferUsage::Static);
        assert!(!buffer.is_valid());

        let err = buffer.update_bytes(1, &[0; 4]);
        assert!(matches!(err, Err(ResourceError::InvalidHandle("buffer"))));
        drop(buffer);
        assert_eq!(gl.invalid_free_count(), 0);
    }

    #[test]
    fn test_upload_uses_declared_width() {
        let (gl, api) = headless();
        let desc = BufferDescriptor::vertex(2, BufferComponentDataType::Uint16, 0);
        let mut buffer = GlBufferObject::create(&api, desc, BufferUsage::Stream);

        // Two elements of 2 x u16 = 8 bytes; trailing bytes are not uploaded
        buffer.update_bytes(2, &[1, 0, 2, 0, 3, 0, 4, 0, 9, 9]).unwrap();
        assert_eq!(buffer.element_count(), 2);
        assert_eq!(gl.buffer_contents(buffer.id()), Some(vec![1, 0, 2, 0, 3, 0, 4, 0]));
        assert_eq!(gl.buffer_usage(buffer.id()), Some(BufferUsage::Stream));
    }

    #[test]
    fn test_short_source_is_rejected() {
        let (gl, api) = headless();
        let desc = BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1);
        let mut buffer = GlBufferObject::create(&api, desc, BufferUsage::Static);

        let err = buffer.update_bytes(2, &[0; 12]);
        assert!(matches!(err, Err(ResourceError::SizeMismatch { expected: 24, actual: 12 })));
        assert_eq!(gl.buffer_contents(buffer.id()), Some(Vec::new()));
    }

    #[test]
    fn test_standalone_index_upload_keeps_vertex_array_bindings() {
        let (gl, api) = headless();
        let vao = api.create_vertex_array();
        let owned = api.create_buffers(1)[0];
        api.bind_vertex_array(vao);
        api.bind_buffer(BufferTarget::ElementArray, owned);

        let mut standalone =
            GlBufferObject::create(&api, BufferDescriptor::index(BufferComponentDataType::Uint32), BufferUsage::Static);
        standalone.update_bytes(1, &[0; 4]).unwrap();

        assert_eq!(gl.element_buffer(vao), owned);
        assert_eq!(gl.buffer_contents(standalone.id()), Some(vec![0; 4]));
    }

    #[test]
    fn test_typed_update_revalidates_layout() {
        let (gl, api) = headless();
        let desc = BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1);
        let mut buffer = GlBufferObject::create(&api, desc, BufferUsage::Static);
        let object: &mut dyn GpuBufferObject = &mut buffer;

        object.update_buffer(&[0.0_f32; 6]).unwrap();
        assert_eq!(object.element_count(), 2);

        // 4 floats is not a whole number of vec3 elements
        assert!(object.update_buffer(&[0.0_f32; 4]).is_err());
        assert_eq!(object.element_count(), 2);
        assert_eq!(gl.buffer_contents(buffer.id()).map(|b| b.len()), Some(24));
    }
}
