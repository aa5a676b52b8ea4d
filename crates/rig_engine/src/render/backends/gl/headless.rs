//! In-memory OpenGL stand-in
//!
//! [`HeadlessGl`] implements [`GlApi`] without a driver. Objects live in a
//! generational slot map, so identifiers are never zero and a stale
//! identifier is detected instead of aliasing a newer object. Every call is
//! recorded; allocations, frees and draws are counted; allocations of a
//! given kind can be made to fail on demand.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use slotmap::{DefaultKey, Key, KeyData, SlotMap};

use super::api::{
    BufferTarget, Capability, ClearFlags, GlApi, NativeId, PrimitiveMode, RawDebugMessage, ShaderStage,
    DEBUG_SEVERITY_HIGH, FRAMEBUFFER_COMPLETE, FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT, NULL_ID,
};
use crate::render::api::{
    AttachmentPoint, BufferComponentDataType, BufferUsage, FrameBufferTarget, PixelFormat, TextureFilter,
    TextureWrap,
};

/// `GL_DEBUG_SOURCE_API`
const DEBUG_SOURCE_API: u32 = 0x8246;
/// `GL_DEBUG_TYPE_ERROR`
const DEBUG_TYPE_ERROR: u32 = 0x824C;
/// `GL_INVALID_OPERATION`
const INVALID_OPERATION: u32 = 0x0502;

/// Kind of native object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    /// Buffer object
    Buffer,
    /// Vertex array object
    VertexArray,
    /// Shader object
    Shader,
    /// Program object
    Program,
    /// Texture
    Texture,
    /// Framebuffer
    Framebuffer,
    /// Render buffer
    Renderbuffer,
}

/// One recorded native call
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum GlCall {
    CreateBuffers(Vec<NativeId>),
    DeleteBuffer(NativeId),
    BindBuffer(BufferTarget, NativeId),
    BufferData { target: BufferTarget, len: usize, usage: BufferUsage },
    CreateVertexArray(NativeId),
    DeleteVertexArray(NativeId),
    BindVertexArray(NativeId),
    EnableVertexAttribArray(u32),
    VertexAttribPointer { index: u32, size: u32, data_type: BufferComponentDataType, integer: bool },
    DrawElements { mode: PrimitiveMode, count: u32, index_type: BufferComponentDataType },
    CreateShader(ShaderStage, NativeId),
    CompileShader(NativeId),
    DeleteShader(NativeId),
    CreateProgram(NativeId),
    AttachShader { program: NativeId, shader: NativeId },
    DetachShader { program: NativeId, shader: NativeId },
    LinkProgram(NativeId),
    DeleteProgram(NativeId),
    UseProgram(NativeId),
    UniformMatrix4 { location: u32, matrices: usize },
    CreateTexture(NativeId),
    DeleteTexture(NativeId),
    ActiveTexture(u32),
    BindTexture(NativeId),
    TexImage2D { width: u32, height: u32, format: PixelFormat },
    TexParameters { filter: TextureFilter, wrap: TextureWrap },
    CreateFramebuffer(NativeId),
    DeleteFramebuffer(NativeId),
    BindFramebuffer(FrameBufferTarget, NativeId),
    FramebufferTexture2D(AttachmentPoint, NativeId),
    FramebufferRenderbuffer(AttachmentPoint, NativeId),
    CreateRenderbuffer(NativeId),
    DeleteRenderbuffer(NativeId),
    BindRenderbuffer(NativeId),
    RenderbufferStorage { format: PixelFormat, width: u32, height: u32 },
    ClearColor([f32; 4]),
    Clear(ClearFlags),
    SetCapability(Capability, bool),
}

/// A recorded indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Vertex array bound at draw time
    pub vertex_array: NativeId,
    /// Program current at draw time
    pub program: NativeId,
    /// Primitive assembly
    pub mode: PrimitiveMode,
    /// Index count
    pub count: u32,
    /// Index type
    pub index_type: BufferComponentDataType,
}

/// Attribute pointer state of a vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Array buffer the pointer refers to
    pub buffer: NativeId,
    /// Components per vertex
    pub size: u32,
    /// Component type
    pub data_type: BufferComponentDataType,
    /// Integer (`true`) or float pointer
    pub integer: bool,
    /// Whether the attribute array is enabled
    pub enabled: bool,
}

#[derive(Debug)]
enum Object {
    Buffer {
        data: Vec<u8>,
        usage: Option<BufferUsage>,
    },
    VertexArray {
        attributes: BTreeMap<u32, VertexAttribute>,
        element_buffer: NativeId,
    },
    Shader {
        source: String,
        compiled: bool,
        log: String,
    },
    Program {
        shaders: Vec<NativeId>,
        linked: bool,
        log: String,
        uniforms: Vec<(String, Vec<f32>)>,
    },
    Texture {
        size: (u32, u32),
        format: Option<PixelFormat>,
    },
    Framebuffer {
        attachments: Vec<(AttachmentPoint, NativeId)>,
    },
    Renderbuffer {
        size: (u32, u32),
        format: Option<PixelFormat>,
    },
}

impl Object {
    const fn kind(&self) -> ObjectKind {
        match self {
            Self::Buffer { .. } => ObjectKind::Buffer,
            Self::VertexArray { .. } => ObjectKind::VertexArray,
            Self::Shader { .. } => ObjectKind::Shader,
            Self::Program { .. } => ObjectKind::Program,
            Self::Texture { .. } => ObjectKind::Texture,
            Self::Framebuffer { .. } => ObjectKind::Framebuffer,
            Self::Renderbuffer { .. } => ObjectKind::Renderbuffer,
        }
    }
}

/// Allocations to let through, then allocations to fail
#[derive(Debug, Default, Clone, Copy)]
struct FailurePlan {
    skip: u32,
    fail: u32,
}

#[derive(Debug, Default)]
struct HeadlessState {
    objects: SlotMap<DefaultKey, Object>,
    allocated: HashMap<ObjectKind, usize>,
    freed: HashMap<ObjectKind, usize>,
    invalid_frees: usize,
    pending_failures: HashMap<ObjectKind, FailurePlan>,
    debug_output_unsupported: bool,
    calls: Vec<GlCall>,
    draws: Vec<DrawCall>,
    bound_buffers: HashMap<BufferTarget, NativeId>,
    bound_vertex_array: NativeId,
    current_program: NativeId,
    active_unit: u32,
    texture_units: BTreeMap<u32, NativeId>,
    bound_renderbuffer: NativeId,
    draw_framebuffer: NativeId,
    read_framebuffer: NativeId,
    capabilities: BTreeSet<Capability>,
    clear_color: [f32; 4],
    debug_log: VecDeque<RawDebugMessage>,
}

fn key_of(id: NativeId) -> DefaultKey {
    KeyData::from_ffi(id).into()
}

impl HeadlessState {
    fn allocate(&mut self, object: Object) -> NativeId {
        let kind = object.kind();
        if let Some(plan) = self.pending_failures.get_mut(&kind) {
            if plan.skip > 0 {
                plan.skip -= 1;
            } else if plan.fail > 0 {
                plan.fail -= 1;
                return NULL_ID;
            }
        }
        *self.allocated.entry(kind).or_default() += 1;
        self.objects.insert(object).data().as_ffi()
    }

    fn free(&mut self, id: NativeId, kind: ObjectKind) {
        let key = key_of(id);
        let live = id != NULL_ID && self.objects.get(key).is_some_and(|object| object.kind() == kind);
        if live {
            self.objects.remove(key);
            *self.freed.entry(kind).or_default() += 1;
        } else {
            self.invalid_frees += 1;
        }
    }

    fn get_mut(&mut self, id: NativeId) -> Option<&mut Object> {
        if id == NULL_ID {
            return None;
        }
        self.objects.get_mut(key_of(id))
    }

    fn get(&self, id: NativeId) -> Option<&Object> {
        if id == NULL_ID {
            return None;
        }
        self.objects.get(key_of(id))
    }

    fn report_error(&mut self, message: String) {
        self.debug_log.push_back(RawDebugMessage {
            source: DEBUG_SOURCE_API,
            kind: DEBUG_TYPE_ERROR,
            id: INVALID_OPERATION,
            severity: DEBUG_SEVERITY_HIGH,
            message,
        });
    }
}

/// Driverless [`GlApi`] implementation for tests and tools
#[derive(Debug, Default)]
pub struct HeadlessGl {
    state: RefCell<HeadlessState>,
}

impl HeadlessGl {
    /// Create an empty native layer
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` allocations of `kind` return the null identifier
    pub fn fail_next(&self, kind: ObjectKind, count: u32) {
        self.fail_after(kind, 0, count);
    }

    /// Let `skip` allocations of `kind` succeed, then fail the following `count`
    pub fn fail_after(&self, kind: ObjectKind, skip: u32, count: u32) {
        let mut state = self.state.borrow_mut();
        let plan = state.pending_failures.entry(kind).or_default();
        plan.skip = skip;
        plan.fail += count;
    }

    /// Emulate a context with or without `GL_KHR_debug` (supported by default)
    pub fn set_debug_output_supported(&self, supported: bool) {
        self.state.borrow_mut().debug_output_unsupported = !supported;
    }

    /// Successful allocations of `kind` so far
    pub fn allocation_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().allocated.get(&kind).copied().unwrap_or(0)
    }

    /// Successful frees of `kind` so far
    pub fn free_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().freed.get(&kind).copied().unwrap_or(0)
    }

    /// Objects of `kind` currently alive
    pub fn live_count(&self, kind: ObjectKind) -> usize {
        self.state.borrow().objects.values().filter(|o| o.kind() == kind).count()
    }

    /// Deletes of null, stale or mistyped identifiers
    pub fn invalid_free_count(&self) -> usize {
        self.state.borrow().invalid_frees
    }

    /// Whether `id` names a live object
    pub fn is_live(&self, id: NativeId) -> bool {
        self.state.borrow().get(id).is_some()
    }

    /// Every call recorded so far
    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    /// Forget recorded calls and draws (counters are kept)
    pub fn clear_calls(&self) {
        let mut state = self.state.borrow_mut();
        state.calls.clear();
        state.draws.clear();
    }

    /// Indexed draws issued so far
    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    /// Texture bound to `unit`, or [`NULL_ID`]
    pub fn bound_texture(&self, unit: u32) -> NativeId {
        self.state.borrow().texture_units.get(&unit).copied().unwrap_or(NULL_ID)
    }

    /// Framebuffer bound for drawing (`Draw`/`ReadDraw`) or reading (`Read`)
    pub fn bound_framebuffer(&self, target: FrameBufferTarget) -> NativeId {
        let state = self.state.borrow();
        match target {
            FrameBufferTarget::Read => state.read_framebuffer,
            FrameBufferTarget::Draw | FrameBufferTarget::ReadDraw => state.draw_framebuffer,
        }
    }

    /// Currently used program
    pub fn current_program(&self) -> NativeId {
        self.state.borrow().current_program
    }

    /// Last matrix data uploaded to uniform `name` of `program`
    pub fn uniform(&self, program: NativeId, name: &str) -> Option<Vec<f32>> {
        match self.state.borrow().get(program) {
            Some(Object::Program { uniforms, .. }) => uniforms
                .iter()
                .find(|(uniform, data)| uniform == name && !data.is_empty())
                .map(|(_, data)| data.clone()),
            _ => None,
        }
    }

    /// Contents of a buffer
    pub fn buffer_contents(&self, id: NativeId) -> Option<Vec<u8>> {
        match self.state.borrow().get(id) {
            Some(Object::Buffer { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    /// Usage hint of the last upload to a buffer
    pub fn buffer_usage(&self, id: NativeId) -> Option<BufferUsage> {
        match self.state.borrow().get(id) {
            Some(Object::Buffer { usage, .. }) => *usage,
            _ => None,
        }
    }

    /// Attribute state of a vertex array, by attribute index
    pub fn vertex_attributes(&self, vertex_array: NativeId) -> BTreeMap<u32, VertexAttribute> {
        match self.state.borrow().get(vertex_array) {
            Some(Object::VertexArray { attributes, .. }) => attributes.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// Element buffer recorded in a vertex array
    pub fn element_buffer(&self, vertex_array: NativeId) -> NativeId {
        match self.state.borrow().get(vertex_array) {
            Some(Object::VertexArray { element_buffer, .. }) => *element_buffer,
            _ => NULL_ID,
        }
    }

    /// Size of a texture's image
    pub fn texture_size(&self, id: NativeId) -> Option<(u32, u32)> {
        match self.state.borrow().get(id) {
            Some(Object::Texture { size, format: Some(_) }) => Some(*size),
            _ => None,
        }
    }

    /// Whether a capability is enabled
    pub fn capability_enabled(&self, capability: Capability) -> bool {
        self.state.borrow().capabilities.contains(&capability)
    }

    /// Current clear colour
    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    /// Queue a message in the native debug log
    pub fn push_debug_message(&self, message: RawDebugMessage) {
        self.state.borrow_mut().debug_log.push_back(message);
    }

    fn record(&self, call: GlCall) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlApi for HeadlessGl {
    fn create_buffers(&self, count: usize) -> Vec<NativeId> {
        let ids: Vec<NativeId> = {
            let mut state = self.state.borrow_mut();
            (0..count)
                .map(|_| state.allocate(Object::Buffer { data: Vec::new(), usage: None }))
                .collect()
        };
        self.record(GlCall::CreateBuffers(ids.clone()));
        ids
    }

    fn delete_buffer(&self, id: NativeId) {
        self.record(GlCall::DeleteBuffer(id));
        self.state.borrow_mut().free(id, ObjectKind::Buffer);
    }

    fn bind_buffer(&self, target: BufferTarget, id: NativeId) {
        self.record(GlCall::BindBuffer(target, id));
        let mut state = self.state.borrow_mut();
        state.bound_buffers.insert(target, id);
        if target == BufferTarget::ElementArray {
            let vao = state.bound_vertex_array;
            if let Some(Object::VertexArray { element_buffer, .. }) = state.get_mut(vao) {
                *element_buffer = id;
            }
        }
    }

    fn buffer_data(&self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        self.record(GlCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
        let mut state = self.state.borrow_mut();
        let id = state.bound_buffers.get(&target).copied().unwrap_or(NULL_ID);
        match state.get_mut(id) {
            Some(Object::Buffer { data: storage, usage: hint }) => {
                storage.clear();
                storage.extend_from_slice(data);
                *hint = Some(usage);
            }
            _ => state.report_error(format!("buffer_data with no buffer bound to {target:?}")),
        }
    }

    fn create_vertex_array(&self) -> NativeId {
        let id = self.state.borrow_mut().allocate(Object::VertexArray {
            attributes: BTreeMap::new(),
            element_buffer: NULL_ID,
        });
        self.record(GlCall::CreateVertexArray(id));
        id
    }

    fn delete_vertex_array(&self, id: NativeId) {
        self.record(GlCall::DeleteVertexArray(id));
        let mut state = self.state.borrow_mut();
        state.free(id, ObjectKind::VertexArray);
        if state.bound_vertex_array == id {
            state.bound_vertex_array = NULL_ID;
        }
    }

    fn bind_vertex_array(&self, id: NativeId) {
        self.record(GlCall::BindVertexArray(id));
        self.state.borrow_mut().bound_vertex_array = id;
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(GlCall::EnableVertexAttribArray(index));
        let mut state = self.state.borrow_mut();
        let vao = state.bound_vertex_array;
        match state.get_mut(vao) {
            Some(Object::VertexArray { attributes, .. }) => {
                attributes
                    .entry(index)
                    .or_insert(VertexAttribute {
                        buffer: NULL_ID,
                        size: 4,
                        data_type: BufferComponentDataType::Float32,
                        integer: false,
                        enabled: false,
                    })
                    .enabled = true;
            }
            _ => state.report_error(format!("enable_vertex_attrib_array({index}) with no vertex array bound")),
        }
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: u32, data_type: BufferComponentDataType, _normalized: bool) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            data_type,
            integer: false,
        });
        set_attribute(&mut self.state.borrow_mut(), index, size, data_type, false);
    }

    fn vertex_attrib_pointer_i32(&self, index: u32, size: u32, data_type: BufferComponentDataType) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            data_type,
            integer: true,
        });
        set_attribute(&mut self.state.borrow_mut(), index, size, data_type, true);
    }

    fn draw_elements(&self, mode: PrimitiveMode, count: u32, index_type: BufferComponentDataType) {
        self.record(GlCall::DrawElements { mode, count, index_type });
        let mut state = self.state.borrow_mut();
        let draw = DrawCall {
            vertex_array: state.bound_vertex_array,
            program: state.current_program,
            mode,
            count,
            index_type,
        };
        state.draws.push(draw);
    }

    fn create_shader(&self, stage: ShaderStage) -> NativeId {
        let id = self.state.borrow_mut().allocate(Object::Shader {
            source: String::new(),
            compiled: false,
            log: String::new(),
        });
        self.record(GlCall::CreateShader(stage, id));
        id
    }

    fn compile_shader(&self, id: NativeId, source: &str) -> bool {
        self.record(GlCall::CompileShader(id));
        let mut state = self.state.borrow_mut();
        match state.get_mut(id) {
            Some(Object::Shader {
                source: stored,
                compiled,
                log,
            }) => {
                // `#error` is the portable way to force a GLSL compile failure
                *stored = source.to_owned();
                *compiled = !source.trim().is_empty() && !source.contains("#error");
                *log = if *compiled {
                    String::new()
                } else {
                    "0:1(1): error: shader rejected".to_owned()
                };
                *compiled
            }
            _ => false,
        }
    }

    fn shader_info_log(&self, id: NativeId) -> String {
        match self.state.borrow().get(id) {
            Some(Object::Shader { log, .. }) => log.clone(),
            _ => String::new(),
        }
    }

    fn delete_shader(&self, id: NativeId) {
        self.record(GlCall::DeleteShader(id));
        self.state.borrow_mut().free(id, ObjectKind::Shader);
    }

    fn create_program(&self) -> NativeId {
        let id = self.state.borrow_mut().allocate(Object::Program {
            shaders: Vec::new(),
            linked: false,
            log: String::new(),
            uniforms: Vec::new(),
        });
        self.record(GlCall::CreateProgram(id));
        id
    }

    fn attach_shader(&self, program: NativeId, shader: NativeId) {
        self.record(GlCall::AttachShader { program, shader });
        if let Some(Object::Program { shaders, .. }) = self.state.borrow_mut().get_mut(program) {
            shaders.push(shader);
        }
    }

    fn detach_shader(&self, program: NativeId, shader: NativeId) {
        self.record(GlCall::DetachShader { program, shader });
        if let Some(Object::Program { shaders, .. }) = self.state.borrow_mut().get_mut(program) {
            shaders.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: NativeId) -> bool {
        self.record(GlCall::LinkProgram(program));
        let mut state = self.state.borrow_mut();
        let attached = match state.get(program) {
            Some(Object::Program { shaders, .. }) => shaders.clone(),
            _ => return false,
        };
        let all_compiled = !attached.is_empty()
            && attached
                .iter()
                .all(|s| matches!(state.get(*s), Some(Object::Shader { compiled: true, .. })));
        if let Some(Object::Program { linked, log, .. }) = state.get_mut(program) {
            *linked = all_compiled;
            *log = if all_compiled {
                String::new()
            } else {
                "error: program has no valid attached shaders".to_owned()
            };
        }
        all_compiled
    }

    fn program_info_log(&self, program: NativeId) -> String {
        match self.state.borrow().get(program) {
            Some(Object::Program { log, .. }) => log.clone(),
            _ => String::new(),
        }
    }

    fn delete_program(&self, program: NativeId) {
        self.record(GlCall::DeleteProgram(program));
        let mut state = self.state.borrow_mut();
        state.free(program, ObjectKind::Program);
        if state.current_program == program {
            state.current_program = NULL_ID;
        }
    }

    fn use_program(&self, program: NativeId) {
        self.record(GlCall::UseProgram(program));
        self.state.borrow_mut().current_program = program;
    }

    fn uniform_location(&self, program: NativeId, name: &str) -> Option<u32> {
        let mut state = self.state.borrow_mut();
        let (shaders, linked) = match state.get(program) {
            Some(Object::Program { shaders, linked, .. }) => (shaders.clone(), *linked),
            _ => return None,
        };
        let declared = shaders
            .iter()
            .any(|s| matches!(state.get(*s), Some(Object::Shader { source, .. }) if source.contains(name)));
        if !linked || !declared {
            return None;
        }
        match state.get_mut(program) {
            Some(Object::Program { uniforms, .. }) => {
                let index = uniforms.iter().position(|(n, _)| n == name).unwrap_or_else(|| {
                    uniforms.push((name.to_owned(), Vec::new()));
                    uniforms.len() - 1
                });
                u32::try_from(index).ok()
            }
            _ => None,
        }
    }

    fn uniform_matrix4(&self, location: u32, data: &[f32]) {
        self.record(GlCall::UniformMatrix4 {
            location,
            matrices: data.len() / 16,
        });
        let mut state = self.state.borrow_mut();
        let program = state.current_program;
        let stored = match state.get_mut(program) {
            Some(Object::Program { uniforms, .. }) => uniforms
                .get_mut(location as usize)
                .map(|(_, value)| *value = data.to_vec())
                .is_some(),
            _ => false,
        };
        if !stored {
            state.report_error(format!("uniform_matrix4 at location {location} with no matching program"));
        }
    }

    fn create_texture(&self) -> NativeId {
        let id = self.state.borrow_mut().allocate(Object::Texture {
            size: (0, 0),
            format: None,
        });
        self.record(GlCall::CreateTexture(id));
        id
    }

    fn delete_texture(&self, id: NativeId) {
        self.record(GlCall::DeleteTexture(id));
        let mut state = self.state.borrow_mut();
        state.free(id, ObjectKind::Texture);
        state.texture_units.retain(|_, bound| *bound != id);
    }

    fn active_texture(&self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, id: NativeId) {
        self.record(GlCall::BindTexture(id));
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        state.texture_units.insert(unit, id);
    }

    fn tex_image_2d(&self, width: u32, height: u32, format: PixelFormat, pixels: Option<&[u8]>) {
        self.record(GlCall::TexImage2D { width, height, format });
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;
        let id = state.texture_units.get(&unit).copied().unwrap_or(NULL_ID);
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.is_some_and(|p| p.len() < expected) {
            state.report_error(format!("tex_image_2d reads past the end of {expected} byte pixel data"));
            return;
        }
        match state.get_mut(id) {
            Some(Object::Texture { size, format: stored }) => {
                *size = (width, height);
                *stored = Some(format);
            }
            _ => state.report_error("tex_image_2d with no texture bound".to_owned()),
        }
    }

    fn tex_parameters(&self, filter: TextureFilter, wrap: TextureWrap) {
        self.record(GlCall::TexParameters { filter, wrap });
    }

    fn create_framebuffer(&self) -> NativeId {
        let id = self
            .state
            .borrow_mut()
            .allocate(Object::Framebuffer { attachments: Vec::new() });
        self.record(GlCall::CreateFramebuffer(id));
        id
    }

    fn delete_framebuffer(&self, id: NativeId) {
        self.record(GlCall::DeleteFramebuffer(id));
        let mut state = self.state.borrow_mut();
        state.free(id, ObjectKind::Framebuffer);
        if state.draw_framebuffer == id {
            state.draw_framebuffer = NULL_ID;
        }
        if state.read_framebuffer == id {
            state.read_framebuffer = NULL_ID;
        }
    }

    fn bind_framebuffer(&self, target: FrameBufferTarget, id: NativeId) {
        self.record(GlCall::BindFramebuffer(target, id));
        let mut state = self.state.borrow_mut();
        match target {
            FrameBufferTarget::Read => state.read_framebuffer = id,
            FrameBufferTarget::Draw => state.draw_framebuffer = id,
            FrameBufferTarget::ReadDraw => {
                state.read_framebuffer = id;
                state.draw_framebuffer = id;
            }
        }
    }

    fn framebuffer_texture_2d(&self, point: AttachmentPoint, texture: NativeId) {
        self.record(GlCall::FramebufferTexture2D(point, texture));
        attach(&mut self.state.borrow_mut(), point, texture);
    }

    fn framebuffer_renderbuffer(&self, point: AttachmentPoint, renderbuffer: NativeId) {
        self.record(GlCall::FramebufferRenderbuffer(point, renderbuffer));
        attach(&mut self.state.borrow_mut(), point, renderbuffer);
    }

    fn check_framebuffer_status(&self) -> u32 {
        let state = self.state.borrow();
        match state.get(state.draw_framebuffer) {
            Some(Object::Framebuffer { attachments }) if !attachments.is_empty() => FRAMEBUFFER_COMPLETE,
            Some(Object::Framebuffer { .. }) => FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT,
            // The default framebuffer is always complete
            _ => FRAMEBUFFER_COMPLETE,
        }
    }

    fn create_renderbuffer(&self) -> NativeId {
        let id = self.state.borrow_mut().allocate(Object::Renderbuffer {
            size: (0, 0),
            format: None,
        });
        self.record(GlCall::CreateRenderbuffer(id));
        id
    }

    fn delete_renderbuffer(&self, id: NativeId) {
        self.record(GlCall::DeleteRenderbuffer(id));
        self.state.borrow_mut().free(id, ObjectKind::Renderbuffer);
    }

    fn bind_renderbuffer(&self, id: NativeId) {
        self.record(GlCall::BindRenderbuffer(id));
        self.state.borrow_mut().bound_renderbuffer = id;
    }

    fn renderbuffer_storage(&self, format: PixelFormat, width: u32, height: u32) {
        self.record(GlCall::RenderbufferStorage { format, width, height });
        let mut state = self.state.borrow_mut();
        let id = state.bound_renderbuffer;
        match state.get_mut(id) {
            Some(Object::Renderbuffer { size, format: stored }) => {
                *size = (width, height);
                *stored = Some(format);
            }
            _ => state.report_error("renderbuffer_storage with no render buffer bound".to_owned()),
        }
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear(&self, flags: ClearFlags) {
        self.record(GlCall::Clear(flags));
    }

    fn set_capability(&self, capability: Capability, enabled: bool) {
        self.record(GlCall::SetCapability(capability, enabled));
        let mut state = self.state.borrow_mut();
        if enabled {
            state.capabilities.insert(capability);
        } else {
            state.capabilities.remove(&capability);
        }
    }

    fn supports_debug_output(&self) -> bool {
        !self.state.borrow().debug_output_unsupported
    }

    fn debug_message_log(&self, max: u32) -> Vec<RawDebugMessage> {
        let mut state = self.state.borrow_mut();
        let take = state.debug_log.len().min(max as usize);
        state.debug_log.drain(..take).collect()
    }
}

fn set_attribute(
    state: &mut HeadlessState,
    index: u32,
    size: u32,
    data_type: BufferComponentDataType,
    integer: bool,
) {
    let buffer = state.bound_buffers.get(&BufferTarget::Array).copied().unwrap_or(NULL_ID);
    let vao = state.bound_vertex_array;
    match state.get_mut(vao) {
        Some(Object::VertexArray { attributes, .. }) => {
            let attribute = attributes.entry(index).or_insert(VertexAttribute {
                buffer,
                size,
                data_type,
                integer,
                enabled: false,
            });
            attribute.buffer = buffer;
            attribute.size = size;
            attribute.data_type = data_type;
            attribute.integer = integer;
        }
        _ => state.report_error(format!("attribute pointer {index} with no vertex array bound")),
    }
}

fn attach(state: &mut HeadlessState, point: AttachmentPoint, image: NativeId) {
    let fbo = state.draw_framebuffer;
    match state.get_mut(fbo) {
        Some(Object::Framebuffer { attachments }) => {
            attachments.retain(|(p, _)| *p != point);
            attachments.push((point, image));
        }
        _ => state.report_error("attachment with no framebuffer bound".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_never_null() {
        let gl = HeadlessGl::new();
        let ids = gl.create_buffers(3);
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(|id| *id != NULL_ID));
        assert_eq!(gl.live_count(ObjectKind::Buffer), 3);
    }

    #[test]
    fn test_failure_injection_consumes_per_object() {
        let gl = HeadlessGl::new();
        gl.fail_next(ObjectKind::Buffer, 1);
        let ids = gl.create_buffers(3);
        assert_eq!(ids[0], NULL_ID);
        assert!(ids[1] != NULL_ID && ids[2] != NULL_ID);
        assert_eq!(gl.allocation_count(ObjectKind::Buffer), 2);

        // Other kinds are unaffected
        assert_ne!(gl.create_vertex_array(), NULL_ID);
    }

    #[test]
    fn test_failure_injection_after_successes() {
        let gl = HeadlessGl::new();
        gl.fail_after(ObjectKind::Buffer, 2, 1);
        let ids = gl.create_buffers(5);
        assert!(ids[0] != NULL_ID && ids[1] != NULL_ID);
        assert_eq!(ids[2], NULL_ID);
        assert!(ids[3] != NULL_ID && ids[4] != NULL_ID);
        assert_eq!(gl.allocation_count(ObjectKind::Buffer), 4);
    }

    #[test]
    fn test_stale_free_is_detected() {
        let gl = HeadlessGl::new();
        let id = gl.create_texture();
        gl.delete_texture(id);
        gl.delete_texture(id);
        gl.delete_buffer(NULL_ID);

        assert_eq!(gl.free_count(ObjectKind::Texture), 1);
        assert_eq!(gl.invalid_free_count(), 2);

        // A new object in the same slot does not alias the stale id
        let fresh = gl.create_texture();
        assert_ne!(fresh, id);
        assert!(!gl.is_live(id));
    }

    #[test]
    fn test_buffer_upload_and_vertex_array_state() {
        let gl = HeadlessGl::new();
        let vao = gl.create_vertex_array();
        let ids = gl.create_buffers(2);

        gl.bind_vertex_array(vao);
        gl.bind_buffer(BufferTarget::Array, ids[0]);
        gl.buffer_data(BufferTarget::Array, &[1, 2, 3, 4], BufferUsage::Stream);
        gl.enable_vertex_attrib_array(2);
        gl.vertex_attrib_pointer_i32(2, 4, BufferComponentDataType::Uint8);
        gl.bind_buffer(BufferTarget::ElementArray, ids[1]);

        assert_eq!(gl.buffer_contents(ids[0]), Some(vec![1, 2, 3, 4]));
        assert_eq!(gl.buffer_usage(ids[0]), Some(BufferUsage::Stream));
        let attributes = gl.vertex_attributes(vao);
        assert_eq!(attributes[&2].buffer, ids[0]);
        assert!(attributes[&2].integer && attributes[&2].enabled);
        assert_eq!(gl.element_buffer(vao), ids[1]);
    }

    #[test]
    fn test_uniform_requires_linked_program_and_declaration() {
        let gl = HeadlessGl::new();
        let shader = gl.create_shader(ShaderStage::Vertex);
        assert!(gl.compile_shader(shader, "uniform mat4 MVP; void main() {}"));
        let program = gl.create_program();
        gl.attach_shader(program, shader);
        assert_eq!(gl.uniform_location(program, "MVP"), None);
        assert!(gl.link_program(program));

        let location = gl.uniform_location(program, "MVP");
        assert!(location.is_some());
        assert_eq!(gl.uniform_location(program, "Bones"), None);

        gl.use_program(program);
        gl.uniform_matrix4(location.unwrap_or_default(), &[1.0; 16]);
        assert_eq!(gl.uniform(program, "MVP").map(|m| m.len()), Some(16));
    }

    #[test]
    fn test_invalid_operations_reach_debug_log() {
        let gl = HeadlessGl::new();
        gl.buffer_data(BufferTarget::Array, &[0; 4], BufferUsage::Static);
        let messages = gl.debug_message_log(16);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, DEBUG_SEVERITY_HIGH);
        assert!(gl.debug_message_log(16).is_empty());
    }
}
