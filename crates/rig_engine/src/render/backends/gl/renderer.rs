//! OpenGL renderer facade

use std::rc::Rc;

use super::api::{Capability, ClearFlags, GlApi, NULL_ID};
use super::buffer_array_object::GlBufferArrayObject;
use super::debug_monitor::GlDebugMessageMonitor;
use super::framebuffer::{GlFrameBufferObject, GlRenderBufferObject};
use super::program::GlProgram;
use super::texture::GlTexture;
use crate::animation::AnimationData;
use crate::config::{ConfigError, RendererConfig};
use crate::foundation::logging::{default_sink, LogSeverity, LogSource, SharedSink};
use crate::render::api::{
    log_debug_messages_and_flush, BufferDescriptor, DrawState, FrameBufferObject, FrameBufferObjectDescriptor,
    FrameBufferTarget, GpuBufferArrayObject, GpuProgram, RenderBufferObject, RenderBufferObjectDescriptor, Renderer,
    RendererDebugMessageMonitor, Texture, TextureDescriptor, MAX_TEXTURE_SLOTS,
};
use crate::render::mesh::{AnimatedMesh, BaseMesh};
use crate::render::ResourceError;

/// Renderer over any [`GlApi`]
///
/// Owns the per-frame state: clear colour, depth test, active framebuffer and
/// the number of texture units bound by the last draw.
pub struct GlRenderer {
    api: Rc<dyn GlApi>,
    config: RendererConfig,
    sink: SharedSink,
    monitor: Option<GlDebugMessageMonitor>,
    active_frame_buffer: Option<Rc<dyn FrameBufferObject>>,
    active_target: FrameBufferTarget,
    depth_test: Option<bool>,
    bound_textures: usize,
}

impl GlRenderer {
    /// Apply the initial native state described by `config`
    ///
    /// A debug message monitor is attached when `config.debug_output` is set
    /// and the context supports debug output; otherwise rendering proceeds
    /// without one.
    pub fn new(api: Rc<dyn GlApi>, config: RendererConfig, sink: SharedSink) -> Result<Self, ConfigError> {
        config.validate()?;

        let debug_supported = api.supports_debug_output();
        if config.debug_output && !debug_supported {
            sink.log(
                LogSource::Renderer,
                LogSeverity::Info,
                "Debug output requested but not supported by the context; continuing without a debug monitor",
            );
        }
        let monitor = (config.debug_output && debug_supported).then(|| {
            let mut monitor = GlDebugMessageMonitor::new(Rc::clone(&api), config.debug_message_batch);
            monitor.set_debugging(true);
            monitor
        });

        let mut renderer = Self {
            api,
            config,
            sink,
            monitor,
            active_frame_buffer: None,
            active_target: FrameBufferTarget::ReadDraw,
            depth_test: None,
            bound_textures: 0,
        };
        renderer.set_depth_test(renderer.config.depth_test);
        renderer
            .api
            .set_capability(Capability::CullFace, renderer.config.cull_back_faces);
        renderer.set_clear_color(renderer.config.clear_color);

        log::info!(
            "Initialized renderer (depth test: {}, culling: {}, debug output: {})",
            renderer.config.depth_test,
            renderer.config.cull_back_faces,
            renderer.monitor.is_some()
        );
        Ok(renderer)
    }

    /// Renderer reporting through the `log` facade
    pub fn with_default_sink(api: Rc<dyn GlApi>, config: RendererConfig) -> Result<Self, ConfigError> {
        Self::new(api, config, default_sink())
    }

    /// Native function table
    pub fn api(&self) -> &Rc<dyn GlApi> {
        &self.api
    }

    /// Active configuration; the clear colour tracks [`Renderer::set_clear_color`]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Diagnostic sink
    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Texture units bound by the last [`Renderer::set_active_textures`]
    pub fn bound_texture_count(&self) -> usize {
        self.bound_textures
    }

    fn warn(&self, message: &str) {
        self.sink.log(LogSource::Renderer, LogSeverity::Warn, message);
    }

    fn created<T>(&self, what: &str, result: Result<T, ResourceError>) -> Option<T> {
        match result {
            Ok(resource) => Some(resource),
            Err(err) => {
                self.warn(&format!("Failed to create {what}: {err}"));
                None
            }
        }
    }

    fn bind_active_frame_buffer(&self) {
        match &self.active_frame_buffer {
            Some(fbo) => fbo.bind(self.active_target),
            None => self.api.bind_framebuffer(self.active_target, NULL_ID),
        }
    }

    fn prepare_draw(
        &mut self,
        program: &dyn GpuProgram,
        state: &DrawState,
        textures: &[Option<Rc<dyn Texture>>],
    ) -> bool {
        if !program.is_valid() {
            self.warn("Skipping draw with an invalid program");
            return false;
        }
        self.set_depth_test(state.depth_test);
        program.bind();
        if !program.set_mat4("MVP", &[state.mvp]) {
            log::debug!("Program has no MVP uniform");
        }
        self.set_active_textures(textures);
        true
    }
}

impl Renderer for GlRenderer {
    fn debug_message_monitor(&mut self) -> Option<&mut dyn RendererDebugMessageMonitor> {
        self.monitor
            .as_mut()
            .map(|monitor| monitor as &mut dyn RendererDebugMessageMonitor)
    }

    fn create_program(&self, vert_source: &str, frag_source: &str, geom_source: &str) -> Option<Rc<dyn GpuProgram>> {
        let program = self.created(
            "program",
            GlProgram::create(&self.api, vert_source, frag_source, geom_source),
        )?;
        Some(Rc::new(program))
    }

    fn create_buffer_array_object(&self, descriptors: &[BufferDescriptor]) -> Option<Box<dyn GpuBufferArrayObject>> {
        let bao = self.created(
            "buffer array object",
            GlBufferArrayObject::create(&self.api, descriptors, self.config.buffer_usage, Rc::clone(&self.sink)),
        )?;
        Some(Box::new(bao))
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Rc<dyn Texture>> {
        let texture = self.created("texture", GlTexture::create(&self.api, descriptor))?;
        Some(Rc::new(texture))
    }

    fn create_frame_buffer_object(&self, descriptor: &FrameBufferObjectDescriptor) -> Option<Rc<dyn FrameBufferObject>> {
        let result = GlFrameBufferObject::create(&self.api, descriptor);
        // Creation leaves the default framebuffer bound
        self.bind_active_frame_buffer();
        let fbo = self.created("framebuffer", result)?;
        Some(Rc::new(fbo))
    }

    fn create_render_buffer_object(&self, descriptor: &RenderBufferObjectDescriptor) -> Option<Rc<dyn RenderBufferObject>> {
        let buffer = self.created("render buffer", GlRenderBufferObject::create(&self.api, descriptor))?;
        Some(Rc::new(buffer))
    }

    fn set_active_textures(&mut self, textures: &[Option<Rc<dyn Texture>>]) -> usize {
        let mut unit = 0;
        for (index, texture) in textures.iter().enumerate() {
            let Some(texture) = texture else {
                continue;
            };
            if !texture.is_valid() {
                self.warn(&format!("Skipping invalid texture at index {index}"));
                continue;
            }
            if unit == MAX_TEXTURE_SLOTS {
                self.warn(&format!(
                    "Ignoring textures from index {index}: only {MAX_TEXTURE_SLOTS} units are available"
                ));
                break;
            }
            texture.bind(unit as u32);
            unit += 1;
        }
        self.bound_textures = unit;
        unit
    }

    fn set_active_frame_buffer(&mut self, fbo: Option<Rc<dyn FrameBufferObject>>, target: FrameBufferTarget) {
        let fbo = match fbo {
            Some(fbo) if !fbo.is_valid() => {
                self.warn("Binding the default framebuffer in place of an invalid framebuffer object");
                None
            }
            other => other,
        };
        self.active_frame_buffer = fbo;
        self.active_target = target;
        self.bind_active_frame_buffer();
    }

    fn set_clear_color(&mut self, color: [u8; 3]) {
        let [r, g, b] = color.map(|channel| f32::from(channel) / 255.0);
        self.api.clear_color(r, g, b, 1.0);
        self.config.clear_color = color;
    }

    fn clear(&mut self) {
        self.api.clear(ClearFlags::COLOR | ClearFlags::DEPTH);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        if self.depth_test != Some(enabled) {
            self.api.set_capability(Capability::DepthTest, enabled);
            self.depth_test = Some(enabled);
        }
    }

    fn begin_frame(&mut self) {
        self.clear();
    }

    fn end_frame(&mut self) {
        if let Some(monitor) = self.monitor.as_mut() {
            log_debug_messages_and_flush(monitor, self.sink.as_ref());
        }
    }

    fn create_base_mesh(&self) -> Option<BaseMesh> {
        self.create_buffer_array_object(&BaseMesh::descriptors())
            .map(BaseMesh::new)
    }

    fn create_animated_mesh(&self, animation: AnimationData) -> Option<AnimatedMesh> {
        self.create_buffer_array_object(&AnimatedMesh::descriptors())
            .map(|bao| AnimatedMesh::new(bao, animation))
    }

    fn render_mesh(
        &mut self,
        mesh: &BaseMesh,
        program: &dyn GpuProgram,
        state: &DrawState,
        textures: &[Option<Rc<dyn Texture>>],
    ) -> bool {
        self.prepare_draw(program, state, textures) && mesh.render(state.mode)
    }

    fn render_animated_mesh(
        &mut self,
        mesh: &AnimatedMesh,
        program: &dyn GpuProgram,
        state: &DrawState,
        textures: &[Option<Rc<dyn Texture>>],
    ) -> bool {
        if !self.prepare_draw(program, state, textures) {
            return false;
        }
        let pose = mesh.animation().current_frame();
        if !pose.is_empty() && !program.set_mat4("Bones", pose) {
            log::debug!("Program has no Bones uniform");
        }
        mesh.render(state.mode)
    }
}
