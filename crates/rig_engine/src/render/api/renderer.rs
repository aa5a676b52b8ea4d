//! Renderer facade contract
//!
//! The renderer is the single point of creation for GPU-backed resources and
//! the single point of per-frame state changes. Factory methods never signal
//! failure through an error channel: they emit a warning through the
//! renderer's diagnostic sink and return `None`.

use std::rc::Rc;

use super::debug_monitor::RendererDebugMessageMonitor;
use super::descriptors::{
    BufferDescriptor, FrameBufferObjectDescriptor, FrameBufferTarget,
    RenderBufferObjectDescriptor, TextureDescriptor,
};
use super::resources::{FrameBufferObject, GpuBufferArrayObject, GpuProgram, RenderBufferObject, Texture};
use crate::animation::AnimationData;
use crate::foundation::math::Mat4;
use crate::render::mesh::{AnimatedMesh, BaseMesh};

/// Maximum number of simultaneously bound texture units
pub const MAX_TEXTURE_SLOTS: usize = 8;

/// Primitive assembly for mesh draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeshRenderMode {
    /// Indexed triangles
    #[default]
    Triangles,
    /// Indexed lines (wireframes, debug geometry)
    Lines,
}

/// Per-draw state supplied by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct DrawState {
    /// Model-view-projection matrix, uploaded as the `MVP` uniform
    pub mvp: Mat4,
    /// Depth test for this draw
    pub depth_test: bool,
    /// Primitive assembly
    pub mode: MeshRenderMode,
}

impl DrawState {
    /// Depth-tested triangles with the given transform
    pub fn new(mvp: Mat4) -> Self {
        Self {
            mvp,
            depth_test: true,
            mode: MeshRenderMode::Triangles,
        }
    }

    /// Override the primitive assembly
    pub fn with_mode(mut self, mode: MeshRenderMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the depth test
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self::new(Mat4::identity())
    }
}

/// Factory and per-frame command surface
pub trait Renderer {
    /// Native debug monitor, if one was attached
    fn debug_message_monitor(&mut self) -> Option<&mut dyn RendererDebugMessageMonitor>;

    /// Compile and link a program; empty sources mean "stage absent"
    fn create_program(&self, vert_source: &str, frag_source: &str, geom_source: &str) -> Option<Rc<dyn GpuProgram>>;

    /// Create a buffer array object with one buffer per descriptor
    fn create_buffer_array_object(&self, descriptors: &[BufferDescriptor]) -> Option<Box<dyn GpuBufferArrayObject>>;

    /// Create a 2D texture
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Rc<dyn Texture>>;

    /// Create a framebuffer from textures and render buffers
    fn create_frame_buffer_object(&self, descriptor: &FrameBufferObjectDescriptor) -> Option<Rc<dyn FrameBufferObject>>;

    /// Create a render buffer
    fn create_render_buffer_object(&self, descriptor: &RenderBufferObjectDescriptor) -> Option<Rc<dyn RenderBufferObject>>;

    /// Bind up to [`MAX_TEXTURE_SLOTS`] textures, skipping `None` entries and
    /// packing the rest into consecutive units starting at 0
    ///
    /// Returns the number of units bound.
    fn set_active_textures(&mut self, textures: &[Option<Rc<dyn Texture>>]) -> usize;

    /// Redirect subsequent draws; `None` selects the window-provided target
    fn set_active_frame_buffer(&mut self, fbo: Option<Rc<dyn FrameBufferObject>>, target: FrameBufferTarget);

    /// Set the clear colour (0-255 per channel)
    fn set_clear_color(&mut self, color: [u8; 3]);

    /// Clear colour and depth of the active target
    fn clear(&mut self);

    /// Toggle depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Start a frame (clears the active target)
    fn begin_frame(&mut self);

    /// Finish a frame (drains native debug messages when monitored)
    fn end_frame(&mut self);

    /// Create a static mesh with the standard attribute layout
    fn create_base_mesh(&self) -> Option<BaseMesh>;

    /// Create a skinned mesh with the standard attribute layout
    fn create_animated_mesh(&self, animation: AnimationData) -> Option<AnimatedMesh>;

    /// Draw a static mesh; returns whether a native draw was issued
    fn render_mesh(
        &mut self,
        mesh: &BaseMesh,
        program: &dyn GpuProgram,
        state: &DrawState,
        textures: &[Option<Rc<dyn Texture>>],
    ) -> bool;

    /// Draw a skinned mesh, uploading its current pose as the `Bones` uniform
    fn render_animated_mesh(
        &mut self,
        mesh: &AnimatedMesh,
        program: &dyn GpuProgram,
        state: &DrawState,
        textures: &[Option<Rc<dyn Texture>>],
    ) -> bool;
}
