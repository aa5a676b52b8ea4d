//! CPU-side meshes bound to a buffer array object
//!
//! Both mesh kinds keep their vertex data in plain vectors that the
//! application edits freely; nothing reaches the GPU until [`BaseMesh::upload`]
//! (or [`AnimatedMesh::upload`]) writes every slot.

use crate::animation::AnimationData;
use crate::foundation::logging::{DiagnosticSink, LogSeverity, LogSource};
use crate::foundation::math::Vec4;
use crate::render::api::{
    BufferComponentDataType as DataType, BufferDescriptor, GpuBufferArrayObject, MeshRenderMode,
};
use crate::render::ResourceError;

const INDEX_SLOT: usize = 0;
const UV_SLOT: usize = 1;
const POSITION_SLOT: usize = 2;
const NORMAL_SLOT: usize = 3;
const COLOR_SLOT: usize = 4;
const BLEND_INDEX_SLOT: usize = 4;
const BLEND_WEIGHT_SLOT: usize = 5;

fn draw(bao: &dyn GpuBufferArrayObject, mode: MeshRenderMode) -> bool {
    match mode {
        MeshRenderMode::Triangles => bao.render(None),
        MeshRenderMode::Lines => bao.render_lines(None),
    }
}

/// Static mesh: indices, texture coordinates, positions, normals and colours
pub struct BaseMesh {
    /// Triangle (or line) indices
    pub indices: Vec<u32>,
    /// Texture coordinates, attribute 0
    pub uvs: Vec<[f32; 2]>,
    /// Positions, attribute 1
    pub positions: Vec<[f32; 3]>,
    /// Normals, attribute 2
    pub normals: Vec<[f32; 3]>,
    /// Vertex colours, attribute 3
    pub colors: Vec<[f32; 3]>,
    bao: Box<dyn GpuBufferArrayObject>,
}

impl BaseMesh {
    /// Slot layout expected by [`BaseMesh::new`]
    pub const fn descriptors() -> [BufferDescriptor; 5] {
        [
            BufferDescriptor::index(DataType::Uint32),
            BufferDescriptor::vertex(2, DataType::Float32, 0),
            BufferDescriptor::vertex(3, DataType::Float32, 1),
            BufferDescriptor::vertex(3, DataType::Float32, 2),
            BufferDescriptor::vertex(3, DataType::Float32, 3),
        ]
    }

    /// Wrap a buffer array object created from [`BaseMesh::descriptors`]
    pub fn new(bao: Box<dyn GpuBufferArrayObject>) -> Self {
        Self {
            indices: Vec::new(),
            uvs: Vec::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            colors: Vec::new(),
            bao,
        }
    }

    /// Write every CPU buffer to its slot
    pub fn upload(&mut self) -> Result<(), ResourceError> {
        let bao = self.bao.as_mut();
        bao.update_slot(INDEX_SLOT, &self.indices)?;
        bao.update_slot(UV_SLOT, &self.uvs)?;
        bao.update_slot(POSITION_SLOT, &self.positions)?;
        bao.update_slot(NORMAL_SLOT, &self.normals)?;
        bao.update_slot(COLOR_SLOT, &self.colors)
    }

    /// Empty every CPU buffer and upload the empty state
    pub fn clear(&mut self) -> Result<(), ResourceError> {
        self.indices.clear();
        self.uvs.clear();
        self.positions.clear();
        self.normals.clear();
        self.colors.clear();
        self.upload()
    }

    /// Draw every uploaded index with the currently bound program
    pub fn render(&self, mode: MeshRenderMode) -> bool {
        draw(self.bao.as_ref(), mode)
    }

    /// The underlying buffer array object
    pub fn buffer_array_object(&self) -> &dyn GpuBufferArrayObject {
        self.bao.as_ref()
    }

    /// Mutable access for direct per-slot updates
    pub fn buffer_array_object_mut(&mut self) -> &mut dyn GpuBufferArrayObject {
        self.bao.as_mut()
    }
}

/// Skinned mesh: like [`BaseMesh`] but with four bone influences per vertex
/// in place of colours, plus the animation state driving them
pub struct AnimatedMesh {
    /// Triangle (or line) indices
    pub indices: Vec<u32>,
    /// Texture coordinates, attribute 0
    pub uvs: Vec<[f32; 2]>,
    /// Positions, attribute 1
    pub positions: Vec<[f32; 3]>,
    /// Normals, attribute 2
    pub normals: Vec<[f32; 3]>,
    /// Bone indices, attribute 3
    pub blend_indices: Vec<[u8; 4]>,
    /// Bone weights (0-255), attribute 4
    pub blend_weights: Vec<[u8; 4]>,
    animation: AnimationData,
    bao: Box<dyn GpuBufferArrayObject>,
}

impl AnimatedMesh {
    /// Slot layout expected by [`AnimatedMesh::new`]
    pub const fn descriptors() -> [BufferDescriptor; 6] {
        [
            BufferDescriptor::index(DataType::Uint32),
            BufferDescriptor::vertex(2, DataType::Float32, 0),
            BufferDescriptor::vertex(3, DataType::Float32, 1),
            BufferDescriptor::vertex(3, DataType::Float32, 2),
            BufferDescriptor::vertex(4, DataType::Uint8, 3),
            BufferDescriptor::vertex(4, DataType::Uint8, 4),
        ]
    }

    /// Wrap a buffer array object created from [`AnimatedMesh::descriptors`]
    pub fn new(bao: Box<dyn GpuBufferArrayObject>, animation: AnimationData) -> Self {
        Self {
            indices: Vec::new(),
            uvs: Vec::new(),
            positions: Vec::new(),
            normals: Vec::new(),
            blend_indices: Vec::new(),
            blend_weights: Vec::new(),
            animation,
            bao,
        }
    }

    /// Write every CPU buffer to its slot and dump the blend buffers at info level
    pub fn upload(&mut self) -> Result<(), ResourceError> {
        let bao = self.bao.as_mut();
        bao.update_slot(INDEX_SLOT, &self.indices)?;
        bao.update_slot(UV_SLOT, &self.uvs)?;
        bao.update_slot(POSITION_SLOT, &self.positions)?;
        bao.update_slot(NORMAL_SLOT, &self.normals)?;
        bao.update_slot(BLEND_INDEX_SLOT, &self.blend_indices)?;
        bao.update_slot(BLEND_WEIGHT_SLOT, &self.blend_weights)?;

        let sink = self.animation.sink();
        self.dump_blend_buffers(sink.as_ref());
        Ok(())
    }

    /// Empty every CPU buffer and upload the empty state
    pub fn clear(&mut self) -> Result<(), ResourceError> {
        self.indices.clear();
        self.uvs.clear();
        self.positions.clear();
        self.normals.clear();
        self.blend_indices.clear();
        self.blend_weights.clear();
        self.upload()
    }

    /// Draw every uploaded index with the currently bound program
    pub fn render(&self, mode: MeshRenderMode) -> bool {
        draw(self.bao.as_ref(), mode)
    }

    /// Log the blend index and weight buffers through `sink`
    pub fn dump_blend_buffers(&self, sink: &dyn DiagnosticSink) {
        let widen = |values: &[[u8; 4]]| -> Vec<Vec4> {
            values
                .iter()
                .map(|v| Vec4::new(f32::from(v[0]), f32::from(v[1]), f32::from(v[2]), f32::from(v[3])))
                .collect()
        };
        dump_buffer("BlendIndices", &widen(&self.blend_indices), sink);
        dump_buffer("BlendWeights", &widen(&self.blend_weights), sink);
    }

    /// Animation state
    pub fn animation(&self) -> &AnimationData {
        &self.animation
    }

    /// Mutable animation state, for clip selection and [`AnimationData::animate`]
    pub fn animation_mut(&mut self) -> &mut AnimationData {
        &mut self.animation
    }

    /// The underlying buffer array object
    pub fn buffer_array_object(&self) -> &dyn GpuBufferArrayObject {
        self.bao.as_ref()
    }

    /// Mutable access for direct per-slot updates
    pub fn buffer_array_object_mut(&mut self) -> &mut dyn GpuBufferArrayObject {
        self.bao.as_mut()
    }
}

/// Log `values` as one info-level message, one `v[i] = [x,y,z,w]` line each
pub fn dump_buffer(name: &str, values: &[Vec4], sink: &dyn DiagnosticSink) {
    let mut message = format!("Buffer {name}: ");
    for (i, v) in values.iter().enumerate() {
        message.push_str(&format!("v[{i}] = [{:03.2},{:03.2},{:03.2},{:03.2}]\n", v.x, v.y, v.z, v.w));
    }
    sink.log(LogSource::Renderer, LogSeverity::Info, &message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::logging::RecordingSink;

    #[test]
    fn test_dump_buffer_format() {
        let sink = RecordingSink::new();
        dump_buffer(
            "Weights",
            &[Vec4::new(1.0, 0.5, 0.0, 0.0), Vec4::new(0.25, 0.25, 0.25, 0.25)],
            &sink,
        );

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, LogSeverity::Info);
        assert_eq!(
            entries[0].message,
            "Buffer Weights: v[0] = [1.00,0.50,0.00,0.00]\nv[1] = [0.25,0.25,0.25,0.25]\n"
        );
    }

    #[test]
    fn test_standard_layouts() {
        let base = BaseMesh::descriptors();
        assert!(base[INDEX_SLOT].is_index());
        assert_eq!(base[COLOR_SLOT].attribute_index, 3);

        let skinned = AnimatedMesh::descriptors();
        assert_eq!(skinned[BLEND_WEIGHT_SLOT].data_type, DataType::Uint8);
        assert_eq!(skinned[BLEND_WEIGHT_SLOT].component_count, 4);
        assert_eq!(skinned[BLEND_WEIGHT_SLOT].attribute_index, 4);
    }
}
