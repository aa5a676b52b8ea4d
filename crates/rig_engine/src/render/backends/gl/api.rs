//! Native OpenGL function table
//!
//! Every native call the backend makes goes through [`GlApi`]. The trait is
//! object safe and takes `&self` everywhere: OpenGL state lives in the
//! context, not in the Rust value, and the context is bound to exactly one
//! thread. Identifiers cross the boundary as [`NativeId`], with
//! [`NULL_ID`] standing for "no object" (allocation failure, or the default
//! binding).

use bitflags::bitflags;

use crate::render::api::{
    AttachmentPoint, BufferComponentDataType, BufferUsage, DebugSeverity, FrameBufferTarget,
    PixelFormat, TextureFilter, TextureWrap,
};

/// Raw identifier of a native object
pub type NativeId = u64;

/// The null identifier; never names a live object
pub const NULL_ID: NativeId = 0;

/// `GL_FRAMEBUFFER_COMPLETE`
pub const FRAMEBUFFER_COMPLETE: u32 = 0x8CD5;

/// `GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT`
pub const FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT: u32 = 0x8CD7;

/// Buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// `GL_ARRAY_BUFFER`
    Array,
    /// `GL_ELEMENT_ARRAY_BUFFER`
    ElementArray,
}

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
    /// Geometry shader
    Geometry,
}

impl ShaderStage {
    /// Human-readable stage name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
        }
    }
}

/// Primitive assembly for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    /// `GL_TRIANGLES`
    Triangles,
    /// `GL_LINES`
    Lines,
}

/// Server-side capabilities toggled with enable/disable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// `GL_DEPTH_TEST`
    DepthTest,
    /// `GL_CULL_FACE` (back faces)
    CullFace,
    /// `GL_DEBUG_OUTPUT`
    DebugOutput,
    /// `GL_DEBUG_OUTPUT_SYNCHRONOUS`
    DebugOutputSynchronous,
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        /// Colour buffer
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// One entry of the native debug message log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDebugMessage {
    /// `GL_DEBUG_SOURCE_*`
    pub source: u32,
    /// `GL_DEBUG_TYPE_*`
    pub kind: u32,
    /// Implementation-defined id
    pub id: u32,
    /// `GL_DEBUG_SEVERITY_*`
    pub severity: u32,
    /// Message text
    pub message: String,
}

/// `GL_DEBUG_SEVERITY_HIGH`
pub const DEBUG_SEVERITY_HIGH: u32 = 0x9146;
/// `GL_DEBUG_SEVERITY_MEDIUM`
pub const DEBUG_SEVERITY_MEDIUM: u32 = 0x9147;
/// `GL_DEBUG_SEVERITY_LOW`
pub const DEBUG_SEVERITY_LOW: u32 = 0x9148;
/// `GL_DEBUG_SEVERITY_NOTIFICATION`
pub const DEBUG_SEVERITY_NOTIFICATION: u32 = 0x826B;

/// Map a native severity code; unknown codes are treated as notifications
pub const fn debug_severity_from_native(code: u32) -> DebugSeverity {
    match code {
        DEBUG_SEVERITY_HIGH => DebugSeverity::High,
        DEBUG_SEVERITY_MEDIUM => DebugSeverity::Medium,
        DEBUG_SEVERITY_LOW => DebugSeverity::Low,
        _ => DebugSeverity::Notification,
    }
}

/// The subset of OpenGL the backend uses
///
/// Creation calls return [`NULL_ID`] on failure and never panic. Calls that
/// take an identifier must only ever receive identifiers previously returned
/// by this table; the handle layer enforces that.
pub trait GlApi {
    // Buffers

    /// Generate `count` buffer names in one call; failed slots are [`NULL_ID`]
    fn create_buffers(&self, count: usize) -> Vec<NativeId>;
    /// Delete a buffer
    fn delete_buffer(&self, id: NativeId);
    /// Bind a buffer (or [`NULL_ID`]) to `target`
    fn bind_buffer(&self, target: BufferTarget, id: NativeId);
    /// Replace the storage of the buffer bound to `target`
    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    // Vertex arrays

    /// Generate a vertex array name
    fn create_vertex_array(&self) -> NativeId;
    /// Delete a vertex array
    fn delete_vertex_array(&self, id: NativeId);
    /// Bind a vertex array (or [`NULL_ID`])
    fn bind_vertex_array(&self, id: NativeId);
    /// Enable attribute `index` on the bound vertex array
    fn enable_vertex_attrib_array(&self, index: u32);
    /// Float attribute pointer into the bound array buffer (tightly packed)
    fn vertex_attrib_pointer_f32(&self, index: u32, size: u32, data_type: BufferComponentDataType, normalized: bool);
    /// Integer attribute pointer into the bound array buffer (tightly packed)
    fn vertex_attrib_pointer_i32(&self, index: u32, size: u32, data_type: BufferComponentDataType);
    /// Indexed draw from the bound vertex array
    fn draw_elements(&self, mode: PrimitiveMode, count: u32, index_type: BufferComponentDataType);

    // Shaders and programs

    /// Create a shader object
    fn create_shader(&self, stage: ShaderStage) -> NativeId;
    /// Set source and compile; returns the compile status
    fn compile_shader(&self, id: NativeId, source: &str) -> bool;
    /// Shader info log
    fn shader_info_log(&self, id: NativeId) -> String;
    /// Delete a shader object
    fn delete_shader(&self, id: NativeId);
    /// Create a program object
    fn create_program(&self) -> NativeId;
    /// Attach a compiled shader
    fn attach_shader(&self, program: NativeId, shader: NativeId);
    /// Detach a shader
    fn detach_shader(&self, program: NativeId, shader: NativeId);
    /// Link; returns the link status
    fn link_program(&self, program: NativeId) -> bool;
    /// Program info log
    fn program_info_log(&self, program: NativeId) -> String;
    /// Delete a program object
    fn delete_program(&self, program: NativeId);
    /// Make `program` current (or [`NULL_ID`])
    fn use_program(&self, program: NativeId);
    /// Location of an active uniform
    fn uniform_location(&self, program: NativeId, name: &str) -> Option<u32>;
    /// Upload column-major 4x4 matrices to a uniform of the current program
    fn uniform_matrix4(&self, location: u32, data: &[f32]);

    // Textures

    /// Generate a texture name
    fn create_texture(&self) -> NativeId;
    /// Delete a texture
    fn delete_texture(&self, id: NativeId);
    /// Select texture unit `unit`
    fn active_texture(&self, unit: u32);
    /// Bind a 2D texture to the active unit
    fn bind_texture(&self, id: NativeId);
    /// Define the image of the bound 2D texture
    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>);
    /// Sampling parameters of the bound 2D texture
    fn tex_parameters(&self, filter: TextureFilter, wrap: TextureWrap);

    // Framebuffers and render buffers

    /// Generate a framebuffer name
    fn create_framebuffer(&self) -> NativeId;
    /// Delete a framebuffer
    fn delete_framebuffer(&self, id: NativeId);
    /// Bind a framebuffer (or [`NULL_ID`] for the default target)
    fn bind_framebuffer(&self, target: FrameBufferTarget, id: NativeId);
    /// Attach a texture to the bound draw framebuffer
    fn framebuffer_texture_2d(&self, point: AttachmentPoint, texture: NativeId);
    /// Attach a render buffer to the bound draw framebuffer
    fn framebuffer_renderbuffer(&self, point: AttachmentPoint, renderbuffer: NativeId);
    /// Completeness status of the bound draw framebuffer
    fn check_framebuffer_status(&self) -> u32;
    /// Generate a render buffer name
    fn create_renderbuffer(&self) -> NativeId;
    /// Delete a render buffer
    fn delete_renderbuffer(&self, id: NativeId);
    /// Bind a render buffer
    fn bind_renderbuffer(&self, id: NativeId);
    /// Allocate storage for the bound render buffer
    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32);

    // Global state

    /// Set the clear colour (normalised)
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    /// Clear the selected buffers of the bound framebuffer
    fn clear(&self, flags: ClearFlags);
    /// Enable or disable a capability
    fn set_capability(&self, capability: Capability, enabled: bool);

    // Debug output

    /// Whether the context exposes `GL_KHR_debug` (core in 4.3)
    fn supports_debug_output(&self) -> bool;
    /// Drain up to `max` entries from the native debug log
    fn debug_message_log(&self, max: u32) -> Vec<RawDebugMessage>;
}
