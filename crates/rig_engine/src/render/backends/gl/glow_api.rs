//! Production [`GlApi`] on top of `glow`
//!
//! Every `glow` call is `unsafe` because it talks to a driver through raw
//! function pointers. The invariants the calls rely on are upheld by
//! construction: the context handed to [`GlowApi::new`] is current on the
//! calling thread for the lifetime of the value, every identifier passed in
//! came out of this table, and slices are passed with their exact lengths.

#![allow(unsafe_code)]

use std::num::NonZeroU32;

use glow::HasContext;

use super::api::{
    BufferTarget, Capability, ClearFlags, GlApi, NativeId, PrimitiveMode, RawDebugMessage, ShaderStage, NULL_ID,
};
use crate::render::api::{
    AttachmentPoint, BufferComponentDataType, BufferUsage, FrameBufferTarget, PixelFormat, TextureFilter,
    TextureWrap,
};

/// OpenGL function table backed by a `glow` context
pub struct GlowApi {
    gl: glow::Context,
}

impl GlowApi {
    /// Wrap a context that is current on this thread
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Access the wrapped context for calls outside this table
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn to_native<T>(id: NativeId, wrap: fn(NonZeroU32) -> T) -> Option<T> {
    u32::try_from(id).ok().and_then(NonZeroU32::new).map(wrap)
}

fn to_id(raw: NonZeroU32) -> NativeId {
    NativeId::from(raw.get())
}

fn log_failure(kind: &str, result: Result<NativeId, String>) -> NativeId {
    result.unwrap_or_else(|err| {
        log::error!("glow failed to create {}: {}", kind, err);
        NULL_ID
    })
}

const fn buffer_target(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Array => glow::ARRAY_BUFFER,
        BufferTarget::ElementArray => glow::ELEMENT_ARRAY_BUFFER,
    }
}

const fn component_type(data_type: BufferComponentDataType) -> u32 {
    match data_type {
        BufferComponentDataType::Int8 => glow::BYTE,
        BufferComponentDataType::Uint8 => glow::UNSIGNED_BYTE,
        BufferComponentDataType::Int16 => glow::SHORT,
        BufferComponentDataType::Uint16 => glow::UNSIGNED_SHORT,
        BufferComponentDataType::Int32 => glow::INT,
        BufferComponentDataType::Uint32 => glow::UNSIGNED_INT,
        BufferComponentDataType::Float32 => glow::FLOAT,
    }
}

const fn framebuffer_target(target: FrameBufferTarget) -> u32 {
    match target {
        FrameBufferTarget::Read => glow::READ_FRAMEBUFFER,
        FrameBufferTarget::Draw => glow::DRAW_FRAMEBUFFER,
        FrameBufferTarget::ReadDraw => glow::FRAMEBUFFER,
    }
}

const fn attachment(point: AttachmentPoint) -> u32 {
    match point {
        AttachmentPoint::Color(n) => glow::COLOR_ATTACHMENT0 + n as u32,
        AttachmentPoint::Depth => glow::DEPTH_ATTACHMENT,
        AttachmentPoint::DepthStencil => glow::DEPTH_STENCIL_ATTACHMENT,
    }
}

/// (internal format, format, type)
const fn pixel_layout(format: PixelFormat) -> (u32, u32, u32) {
    match format {
        PixelFormat::R8 => (glow::R8, glow::RED, glow::UNSIGNED_BYTE),
        PixelFormat::Rg8 => (glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
        PixelFormat::Rgb8 => (glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
        PixelFormat::Rgba8 => (glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
        PixelFormat::Depth24Stencil8 => (glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8),
    }
}

const fn capability(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::DebugOutput => glow::DEBUG_OUTPUT,
        Capability::DebugOutputSynchronous => glow::DEBUG_OUTPUT_SYNCHRONOUS,
    }
}

impl GlApi for GlowApi {
    fn create_buffers(&self, count: usize) -> Vec<NativeId> {
        (0..count)
            .map(|_| log_failure("buffer", unsafe { self.gl.create_buffer() }.map(|b| to_id(b.0))))
            .collect()
    }

    fn delete_buffer(&self, id: NativeId) {
        if let Some(buffer) = to_native(id, glow::NativeBuffer) {
            unsafe { self.gl.delete_buffer(buffer) };
        }
    }

    fn bind_buffer(&self, target: BufferTarget, id: NativeId) {
        unsafe {
            self.gl
                .bind_buffer(buffer_target(target), to_native(id, glow::NativeBuffer));
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let usage = match usage {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        };
        unsafe { self.gl.buffer_data_u8_slice(buffer_target(target), data, usage) };
    }

    fn create_vertex_array(&self) -> NativeId {
        log_failure("vertex array", unsafe { self.gl.create_vertex_array() }.map(|v| to_id(v.0)))
    }

    fn delete_vertex_array(&self, id: NativeId) {
        if let Some(vao) = to_native(id, glow::NativeVertexArray) {
            unsafe { self.gl.delete_vertex_array(vao) };
        }
    }

    fn bind_vertex_array(&self, id: NativeId) {
        unsafe { self.gl.bind_vertex_array(to_native(id, glow::NativeVertexArray)) };
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) };
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: u32, data_type: BufferComponentDataType, normalized: bool) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size as i32, component_type(data_type), normalized, 0, 0);
        }
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: u32, data_type: BufferComponentDataType) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_i32(index, size as i32, component_type(data_type), 0, 0);
        }
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: u32, index_type: BufferComponentDataType) {
        let mode = match mode {
            PrimitiveMode::Triangles => glow::TRIANGLES,
            PrimitiveMode::Lines => glow::LINES,
        };
        unsafe {
            self.gl
                .draw_elements(mode, count as i32, component_type(index_type), 0);
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> NativeId {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        };
        log_failure("shader", unsafe { self.gl.create_shader(kind) }.map(|s| to_id(s.0)))
    }

    fn compile_shader(&self, id: NativeId, source: &str) -> bool {
        let Some(shader) = to_native(id, glow::NativeShader) else {
            return false;
        };
        unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        }
    }

    fn shader_info_log(&self, id: NativeId) -> String {
        to_native(id, glow::NativeShader)
            .map(|shader| unsafe { self.gl.get_shader_info_log(shader) })
            .unwrap_or_default()
    }

    fn delete_shader(&self, id: NativeId) {
        if let Some(shader) = to_native(id, glow::NativeShader) {
            unsafe { self.gl.delete_shader(shader) };
        }
    }

    fn create_program(&self) -> NativeId {
        log_failure("program", unsafe { self.gl.create_program() }.map(|p| to_id(p.0)))
    }

    fn attach_shader(&self, program: NativeId, shader: NativeId) {
        if let (Some(p), Some(s)) = (to_native(program, glow::NativeProgram), to_native(shader, glow::NativeShader)) {
            unsafe { self.gl.attach_shader(p, s) };
        }
    }

    fn detach_shader(&self, program: NativeId, shader: NativeId) {
        if let (Some(p), Some(s)) = (to_native(program, glow::NativeProgram), to_native(shader, glow::NativeShader)) {
            unsafe { self.gl.detach_shader(p, s) };
        }
    }

    fn link_program(&self, program: NativeId) -> bool {
        let Some(program) = to_native(program, glow::NativeProgram) else {
            return false;
        };
        unsafe {
            self.gl.link_program(program);
            self.gl.get_program_link_status(program)
        }
    }

    fn program_info_log(&self, program: NativeId) -> String {
        to_native(program, glow::NativeProgram)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn delete_program(&self, program: NativeId) {
        if let Some(p) = to_native(program, glow::NativeProgram) {
            unsafe { self.gl.delete_program(p) };
        }
    }

    fn use_program(&self, program: NativeId) {
        unsafe { self.gl.use_program(to_native(program, glow::NativeProgram)) };
    }

    fn uniform_location(&self, program: NativeId, name: &str) -> Option<u32> {
        let program = to_native(program, glow::NativeProgram)?;
        unsafe { self.gl.get_uniform_location(program, name) }.map(|location| location.0)
    }

    fn uniform_matrix4(&self, location: u32, data: &[f32]) {
        let location = glow::NativeUniformLocation(location);
        unsafe { self.gl.uniform_matrix_4_f32_slice(Some(&location), false, data) };
    }

    fn create_texture(&self) -> NativeId {
        log_failure("texture", unsafe { self.gl.create_texture() }.map(|t| to_id(t.0)))
    }

    fn delete_texture(&self, id: NativeId) {
        if let Some(texture) = to_native(id, glow::NativeTexture) {
            unsafe { self.gl.delete_texture(texture) };
        }
    }

    fn active_texture(&self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) };
    }

    fn bind_texture(&self, id: NativeId) {
        unsafe {
            self.gl
                .bind_texture(glow::TEXTURE_2D, to_native(id, glow::NativeTexture));
        }
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>) {
        let (internal, layout, kind) = pixel_layout(format);
        unsafe {
            // Rows are tightly packed regardless of channel count
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                internal as i32,
                width as i32,
                height as i32,
                0,
                layout,
                kind,
                pixels,
            );
        }
    }

    fn tex_parameters(&self, filter: TextureFilter, wrap: TextureWrap) {
        let filter = match filter {
            TextureFilter::Nearest => glow::NEAREST,
            TextureFilter::Linear => glow::LINEAR,
        } as i32;
        let wrap = match wrap {
            TextureWrap::Repeat => glow::REPEAT,
            TextureWrap::ClampToEdge => glow::CLAMP_TO_EDGE,
        } as i32;
        unsafe {
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
        }
    }

    fn create_framebuffer(&self) -> NativeId {
        log_failure("framebuffer", unsafe { self.gl.create_framebuffer() }.map(|f| to_id(f.0)))
    }

    fn delete_framebuffer(&self, id: NativeId) {
        if let Some(fbo) = to_native(id, glow::NativeFramebuffer) {
            unsafe { self.gl.delete_framebuffer(fbo) };
        }
    }

    fn bind_framebuffer(&self, target: FrameBufferTarget, id: NativeId) {
        unsafe {
            self.gl
                .bind_framebuffer(framebuffer_target(target), to_native(id, glow::NativeFramebuffer));
        }
    }

    fn framebuffer_texture_2d(&self, point: AttachmentPoint, texture: NativeId) {
        unsafe {
            self.gl.framebuffer_texture_2d(
                glow::DRAW_FRAMEBUFFER,
                attachment(point),
                glow::TEXTURE_2D,
                to_native(texture, glow::NativeTexture),
                0,
            );
        }
    }

    fn framebuffer_renderbuffer(&self, point: AttachmentPoint, renderbuffer: NativeId) {
        unsafe {
            self.gl.framebuffer_renderbuffer(
                glow::DRAW_FRAMEBUFFER,
                attachment(point),
                glow::RENDERBUFFER,
                to_native(renderbuffer, glow::NativeRenderbuffer),
            );
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        unsafe { self.gl.check_framebuffer_status(glow::DRAW_FRAMEBUFFER) }
    }

    fn create_renderbuffer(&self) -> NativeId {
        log_failure("render buffer", unsafe { self.gl.create_renderbuffer() }.map(|r| to_id(r.0)))
    }

    fn delete_renderbuffer(&self, id: NativeId) {
        if let Some(rbo) = to_native(id, glow::NativeRenderbuffer) {
            unsafe { self.gl.delete_renderbuffer(rbo) };
        }
    }

    fn bind_renderbuffer(&self, id: NativeId) {
        unsafe {
            self.gl
                .bind_renderbuffer(glow::RENDERBUFFER, to_native(id, glow::NativeRenderbuffer));
        }
    }

    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32) {
        let (internal, _, _) = pixel_layout(format);
        unsafe {
            self.gl
                .renderbuffer_storage(glow::RENDERBUFFER, internal, width as i32, height as i32);
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) };
    }

    fn clear(&self, flags: ClearFlags) {
        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= glow::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= glow::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= glow::STENCIL_BUFFER_BIT;
        }
        unsafe { self.gl.clear(mask) };
    }

    fn set_capability(&self, cap: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability(cap));
                if cap == Capability::CullFace {
                    self.gl.cull_face(glow::BACK);
                }
            } else {
                self.gl.disable(capability(cap));
            }
        }
    }

    fn supports_debug_output(&self) -> bool {
        self.gl.supports_debug()
    }

    fn debug_message_log(&self, max: u32) -> Vec<RawDebugMessage> {
        unsafe { self.gl.get_debug_message_log(max) }
            .into_iter()
            .map(|entry| RawDebugMessage {
                source: entry.source,
                kind: entry.msg_type,
                id: entry.id,
                severity: entry.severity,
                message: entry.message,
            })
            .collect()
    }
}
