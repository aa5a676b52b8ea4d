//! OpenGL buffer array object
//!
//! A set of buffer objects bound together under one vertex array. Slot order
//! is descriptor order. At most one slot holds indices; it is bound as the
//! vertex array's element buffer and never as a vertex attribute. Every other
//! slot is bound to the attribute location its descriptor declares.

use std::collections::HashSet;
use std::rc::Rc;

use super::api::{GlApi, NativeId, PrimitiveMode, NULL_ID};
use super::buffer_object::GlBufferObject;
use super::handles::{allocate_buffer_batch, OwnedHandle, VertexArrayHandle};
use crate::foundation::logging::{LogSeverity, LogSource, SharedSink};
use crate::render::api::{BufferDescriptor, BufferUsage, GpuBufferArrayObject, GpuBufferObject};
use crate::render::ResourceError;

/// Buffers plus the vertex array binding them
pub struct GlBufferArrayObject {
    vertex_array: OwnedHandle<VertexArrayHandle>,
    buffers: Vec<GlBufferObject>,
    index_slot: Option<usize>,
    sink: SharedSink,
}

fn validate(descriptors: &[BufferDescriptor]) -> Result<Option<usize>, ResourceError> {
    if descriptors.is_empty() {
        return Err(ResourceError::EmptyBatch);
    }

    let mut index_slot = None;
    let mut locations = HashSet::new();
    for (slot, desc) in descriptors.iter().enumerate() {
        if !(1..=4).contains(&desc.component_count) {
            return Err(ResourceError::InvalidDescriptor(format!(
                "slot {slot}: component count {} outside 1-4",
                desc.component_count
            )));
        }
        if desc.is_index() {
            if let Some(previous) = index_slot {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "slots {previous} and {slot} both declare an index buffer"
                )));
            }
            if desc.component_count != 1 || !desc.data_type.is_index_type() {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "slot {slot}: index buffers hold single unsigned components, got {} x {:?}",
                    desc.component_count, desc.data_type
                )));
            }
            index_slot = Some(slot);
        } else if !locations.insert(desc.attribute_index) {
            return Err(ResourceError::InvalidDescriptor(format!(
                "slot {slot}: attribute location {} bound twice",
                desc.attribute_index
            )));
        }
    }
    Ok(index_slot)
}

impl GlBufferArrayObject {
    /// Allocate one buffer per descriptor and a vertex array binding them
    ///
    /// Nothing is leaked on failure: buffers allocated before a failing
    /// member (or before a failing vertex array) are freed.
    pub fn create(
        api: &Rc<dyn GlApi>,
        descriptors: &[BufferDescriptor],
        usage: BufferUsage,
        sink: SharedSink,
    ) -> Result<Self, ResourceError> {
        let index_slot = validate(descriptors)?;
        let handles = allocate_buffer_batch(api, descriptors)?;
        let vertex_array = OwnedHandle::try_new(Rc::clone(api), VertexArrayHandle::create(api.as_ref()))?;

        let buffers = handles
            .into_iter()
            .map(|handle| {
                let mut buffer = GlBufferObject::from_owned(handle, usage);
                buffer.set_vertex_array(vertex_array.id());
                buffer
            })
            .collect();

        let bao = Self {
            vertex_array,
            buffers,
            index_slot,
            sink,
        };
        bao.enable_buffers();
        Ok(bao)
    }

    fn enable_buffers(&self) {
        let api = self.vertex_array.api();
        self.vertex_array.bind();
        for buffer in &self.buffers {
            buffer.bind();
            let desc = buffer.descriptor();
            if desc.is_index() {
                continue;
            }
            api.enable_vertex_attrib_array(desc.attribute_index);
            if desc.data_type.is_float() {
                api.vertex_attrib_pointer_f32(desc.attribute_index, desc.component_count, desc.data_type, false);
            } else {
                api.vertex_attrib_pointer_i32(desc.attribute_index, desc.component_count, desc.data_type);
            }
        }
        api.bind_vertex_array(NULL_ID);
    }

    /// Raw vertex array identifier
    pub fn vertex_array_id(&self) -> NativeId {
        self.vertex_array.id()
    }

    fn draw(&self, mode: PrimitiveMode, requested: Option<u32>) -> bool {
        if !self.is_valid() {
            self.sink.log(
                LogSource::Renderer,
                LogSeverity::Warn,
                "Skipping draw of buffer array object with invalid handles",
            );
            return false;
        }
        let Some(index) = self.index_slot.and_then(|slot| self.buffers.get(slot)) else {
            self.sink.log(
                LogSource::Renderer,
                LogSeverity::Warn,
                "Skipping draw of buffer array object without an index buffer",
            );
            return false;
        };

        let available = index.element_count();
        let mut count = requested.unwrap_or(available);
        if count > available {
            self.sink.log(
                LogSource::Renderer,
                LogSeverity::Warn,
                &format!("Draw of {count} indices clamped to the {available} uploaded"),
            );
            count = available;
        }
        if count == 0 {
            return false;
        }

        self.vertex_array.bind();
        self.vertex_array
            .api()
            .draw_elements(mode, count, index.descriptor().data_type);
        true
    }
}

impl GpuBufferArrayObject for GlBufferArrayObject {
    fn is_valid(&self) -> bool {
        self.vertex_array.is_valid() && self.buffers.iter().all(|buffer| buffer.is_valid())
    }

    fn bind(&self) {
        self.vertex_array.bind();
    }

    fn buffer_object(&self, slot: usize) -> &dyn GpuBufferObject {
        &self.buffers[slot]
    }

    fn buffer_object_mut(&mut self, slot: usize) -> &mut dyn GpuBufferObject {
        &mut self.buffers[slot]
    }

    fn buffer_object_count(&self) -> usize {
        self.buffers.len()
    }

    fn update_buffer(&mut self, slot: usize, element_count: u32, data: &[u8]) -> Result<(), ResourceError> {
        let count = self.buffers.len();
        self.buffers
            .get_mut(slot)
            .ok_or_else(|| ResourceError::InvalidDescriptor(format!("slot {slot} out of range ({count} slots)")))?
            .update_bytes(element_count, data)
    }

    fn index_count(&self) -> u32 {
        self.index_slot
            .and_then(|slot| self.buffers.get(slot))
            .map_or(0, |buffer| buffer.element_count())
    }

    fn render(&self, index_count: Option<u32>) -> bool {
        self.draw(PrimitiveMode::Triangles, index_count)
    }

    fn render_lines(&self, index_count: Option<u32>) -> bool {
        self.draw(PrimitiveMode::Lines, index_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::logging::RecordingSink;
    use crate::render::api::BufferComponentDataType;
    use crate::render::backends::gl::headless::{HeadlessGl, ObjectKind};

    struct Fixture {
        gl: Rc<HeadlessGl>,
        api: Rc<dyn GlApi>,
        sink: Rc<RecordingSink>,
    }

    impl Fixture {
        fn new() -> Self {
            let gl = Rc::new(HeadlessGl::new());
            let api: Rc<dyn GlApi> = gl.clone();
            Self {
                gl,
                api,
                sink: Rc::new(RecordingSink::new()),
            }
        }

        fn create(&self, descriptors: &[BufferDescriptor]) -> Result<GlBufferArrayObject, ResourceError> {
            GlBufferArrayObject::create(&self.api, descriptors, BufferUsage::Static, self.sink.clone())
        }
    }

    fn skinned_layout() -> Vec<BufferDescriptor> {
        vec![
            BufferDescriptor::index(BufferComponentDataType::Uint32),
            BufferDescriptor::vertex(2, BufferComponentDataType::Float32, 0),
            BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1),
            BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 2),
            BufferDescriptor::vertex(4, BufferComponentDataType::Uint8, 3),
            BufferDescriptor::vertex(4, BufferComponentDataType::Uint8, 4),
        ]
    }

    #[test]
    fn test_attribute_binding() {
        let fx = Fixture::new();
        let bao = fx.create(&skinned_layout()).unwrap();
        assert!(bao.is_valid());
        assert_eq!(bao.buffer_object_count(), 6);

        let attributes = fx.gl.vertex_attributes(bao.vertex_array_id());
        assert_eq!(attributes.len(), 5);
        assert!(!attributes[&0].integer);
        assert_eq!(attributes[&1].size, 3);
        assert!(attributes[&3].integer);
        assert_eq!(attributes[&4].data_type, BufferComponentDataType::Uint8);
        assert!(attributes.values().all(|a| a.enabled));

        // The index slot is the element buffer, not an attribute
        let index = &bao.buffers[0];
        assert_eq!(fx.gl.element_buffer(bao.vertex_array_id()), index.id());
        assert!(attributes.values().all(|a| a.buffer != index.id()));
    }

    #[test]
    fn test_empty_index_buffer_never_draws() {
        let fx = Fixture::new();
        let bao = fx.create(&skinned_layout()).unwrap();

        assert!(!bao.render(None));
        assert!(!bao.render(Some(0)));
        assert!(!bao.render_lines(Some(3)));
        assert!(fx.gl.draw_calls().is_empty());
    }

    #[test]
    fn test_render_uses_index_slot() {
        let fx = Fixture::new();
        let mut bao = fx.create(&skinned_layout()).unwrap();
        let bao_dyn: &mut dyn GpuBufferArrayObject = &mut bao;
        bao_dyn.update_slot(0, &[0_u32, 1, 2, 2, 3, 0]).unwrap();
        assert_eq!(bao_dyn.index_count(), 6);

        assert!(bao_dyn.render(None));
        assert!(bao_dyn.render_lines(Some(4)));

        let draws = fx.gl.draw_calls();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].mode, PrimitiveMode::Triangles);
        assert_eq!(draws[0].count, 6);
        assert_eq!(draws[0].index_type, BufferComponentDataType::Uint32);
        assert_eq!(draws[0].vertex_array, bao.vertex_array_id());
        assert_eq!(draws[1].mode, PrimitiveMode::Lines);
        assert_eq!(draws[1].count, 4);
    }

    #[test]
    fn test_oversized_count_is_clamped() {
        let fx = Fixture::new();
        let mut bao = fx.create(&skinned_layout()).unwrap();
        bao.update_buffer(0, 3, bytemuck::cast_slice(&[0_u32, 1, 2])).unwrap();

        assert!(bao.render(Some(30)));
        assert_eq!(fx.gl.draw_calls()[0].count, 3);
        assert_eq!(fx.sink.count_at_least(LogSeverity::Warn), 1);
    }

    #[test]
    fn test_slot_update_leaves_other_slots() {
        let fx = Fixture::new();
        let mut bao = fx.create(&skinned_layout()).unwrap();
        bao.update_buffer(1, 1, bytemuck::cast_slice(&[0.5_f32, 0.25])).unwrap();
        bao.update_buffer(4, 1, &[1, 2, 3, 4]).unwrap();
        bao.update_buffer(1, 2, bytemuck::cast_slice(&[1.0_f32, 1.0, 2.0, 2.0])).unwrap();

        assert_eq!(fx.gl.buffer_contents(bao.buffers[4].id()), Some(vec![1, 2, 3, 4]));
        assert_eq!(bao.buffer_object(1).element_count(), 2);
        assert_eq!(bao.buffer_object(2).element_count(), 0);
        assert!(matches!(
            bao.update_buffer(9, 0, &[]),
            Err(ResourceError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn test_index_upload_targets_own_vertex_array() {
        let fx = Fixture::new();
        let mut first = fx.create(&skinned_layout()).unwrap();
        let second = fx.create(&skinned_layout()).unwrap();
        second.bind();

        first.update_buffer(0, 1, bytemuck::cast_slice(&[7_u32])).unwrap();
        assert_eq!(fx.gl.element_buffer(first.vertex_array_id()), first.buffers[0].id());
        assert_eq!(fx.gl.element_buffer(second.vertex_array_id()), second.buffers[0].id());
    }

    #[test]
    fn test_index_upload_after_draw_keeps_element_binding() {
        let fx = Fixture::new();
        let mut bao = fx.create(&skinned_layout()).unwrap();
        bao.update_buffer(0, 3, bytemuck::cast_slice(&[0_u32, 1, 2])).unwrap();
        assert!(bao.render(None));
        let element_buffer = fx.gl.element_buffer(bao.vertex_array_id());

        let mut standalone = GlBufferObject::create(
            &fx.api,
            BufferDescriptor::index(BufferComponentDataType::Uint32),
            BufferUsage::Static,
        );
        standalone.update_bytes(1, &[0; 4]).unwrap();
        assert_eq!(fx.gl.element_buffer(bao.vertex_array_id()), element_buffer);
        assert_eq!(element_buffer, bao.buffers[0].id());

        // Own index uploads leave no vertex array bound
        bao.update_buffer(0, 1, bytemuck::cast_slice(&[2_u32])).unwrap();
        let mut other = GlBufferObject::create(
            &fx.api,
            BufferDescriptor::index(BufferComponentDataType::Uint16),
            BufferUsage::Static,
        );
        other.update_bytes(1, &[0; 2]).unwrap();
        assert_eq!(fx.gl.element_buffer(bao.vertex_array_id()), bao.buffers[0].id());
    }

    #[test]
    fn test_failed_member_leaks_nothing() {
        let fx = Fixture::new();
        fx.gl.fail_next(ObjectKind::Buffer, 1);

        assert!(fx.create(&skinned_layout()).is_err());
        assert_eq!(fx.gl.allocation_count(ObjectKind::Buffer), 5);
        assert_eq!(fx.gl.free_count(ObjectKind::Buffer), 5);
        assert_eq!(fx.gl.live_count(ObjectKind::VertexArray), 0);
    }

    #[test]
    fn test_failed_vertex_array_releases_buffers() {
        let fx = Fixture::new();
        fx.gl.fail_next(ObjectKind::VertexArray, 1);

        let result = fx.create(&skinned_layout());
        assert!(matches!(result, Err(ResourceError::HandleCreation("vertex array"))));
        assert_eq!(fx.gl.live_count(ObjectKind::Buffer), 0);
        assert_eq!(fx.gl.free_count(ObjectKind::Buffer), 6);
    }

    #[test]
    fn test_layout_validation() {
        let fx = Fixture::new();
        let two_indices = [
            BufferDescriptor::index(BufferComponentDataType::Uint32),
            BufferDescriptor::index(BufferComponentDataType::Uint16),
        ];
        let shared_location = [
            BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1),
            BufferDescriptor::vertex(2, BufferComponentDataType::Float32, 1),
        ];
        let float_index = [BufferDescriptor::index(BufferComponentDataType::Float32)];

        for layout in [&two_indices[..], &shared_location[..], &float_index[..]] {
            assert!(matches!(fx.create(layout), Err(ResourceError::InvalidDescriptor(_))));
        }
        assert!(matches!(fx.create(&[]), Err(ResourceError::EmptyBatch)));
        assert_eq!(fx.gl.allocation_count(ObjectKind::Buffer), 0);
    }

    #[test]
    fn test_missing_index_slot_warns() {
        let fx = Fixture::new();
        let bao = fx
            .create(&[BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 0)])
            .unwrap();
        assert!(!bao.render(None));
        assert_eq!(fx.sink.count_at_least(LogSeverity::Warn), 1);
        assert!(fx.gl.draw_calls().is_empty());
    }
}
