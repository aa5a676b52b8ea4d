//! Tests for the renderer facade against the headless native layer

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::animation::{AnimationClip, AnimationData, Bone, BoneKeys, KeyframeTrack, Skeleton};
    use crate::config::RendererConfig;
    use crate::foundation::logging::{LogSeverity, RecordingSink};
    use crate::foundation::math::{Mat4, Quat, Vec3};
    use crate::render::api::*;
    use crate::render::backends::gl::api::{Capability, ClearFlags, GlApi, RawDebugMessage, DEBUG_SEVERITY_HIGH, NULL_ID};
    use crate::render::backends::gl::headless::{GlCall, HeadlessGl, ObjectKind};
    use crate::render::backends::gl::renderer::GlRenderer;
    use crate::render::backends::gl::texture::GlTexture;
    use crate::render::mesh::BaseMesh;

    const VERT: &str = "uniform mat4 MVP; uniform mat4 Bones[2]; in vec3 position; \
                        void main() { gl_Position = MVP * vec4(position, 1.0); }";
    const FRAG: &str = "out vec4 color; void main() { color = vec4(1.0); }";

    struct Fixture {
        gl: Rc<HeadlessGl>,
        sink: Rc<RecordingSink>,
        renderer: GlRenderer,
    }

    fn fixture_with(config: RendererConfig) -> Fixture {
        let gl = Rc::new(HeadlessGl::new());
        let sink = Rc::new(RecordingSink::new());
        let api: Rc<dyn GlApi> = gl.clone();
        let renderer = GlRenderer::new(api, config, sink.clone()).unwrap();
        Fixture { gl, sink, renderer }
    }

    fn fixture() -> Fixture {
        fixture_with(RendererConfig::default().with_debug_output(false))
    }

    fn pixel_texture(renderer: &GlRenderer) -> Rc<dyn Texture> {
        renderer
            .create_texture(&TextureDescriptor::with_data(1, 1, PixelFormat::Rgba8, vec![255; 4]))
            .unwrap()
    }

    fn texture_id(texture: &Rc<dyn Texture>) -> u64 {
        texture.as_any().downcast_ref::<GlTexture>().unwrap().id()
    }

    fn triangle(mesh: &mut BaseMesh) {
        mesh.indices = vec![0, 1, 2];
        mesh.positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        mesh.uvs = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        mesh.normals = vec![[0.0, 0.0, 1.0]; 3];
        mesh.colors = vec![[1.0, 1.0, 1.0]; 3];
    }

    struct BrokenProgram;

    impl GpuProgram for BrokenProgram {
        fn is_valid(&self) -> bool {
            false
        }

        fn bind(&self) {}

        fn set_mat4(&self, _name: &str, _matrices: &[Mat4]) -> bool {
            false
        }
    }

    #[test]
    fn test_initial_native_state() {
        let f = fixture_with(
            RendererConfig::default()
                .with_debug_output(false)
                .with_clear_color([255, 0, 0]),
        );
        assert!(f.gl.capability_enabled(Capability::DepthTest));
        assert!(f.gl.capability_enabled(Capability::CullFace));
        assert_eq!(f.gl.clear_color_value(), [1.0, 0.0, 0.0, 1.0]);

        let mut renderer = f.renderer;
        assert!(renderer.debug_message_monitor().is_none());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RendererConfig::default().with_debug_output(true);
        config.debug_message_batch = 0;
        let api: Rc<dyn GlApi> = Rc::new(HeadlessGl::new());
        assert!(GlRenderer::with_default_sink(api, config).is_err());
    }

    #[test]
    fn test_depth_test_toggles_are_cached() {
        let mut f = fixture();
        f.gl.clear_calls();

        f.renderer.set_depth_test(true);
        assert!(f.gl.calls().is_empty());

        f.renderer.set_depth_test(false);
        f.renderer.set_depth_test(false);
        assert_eq!(f.gl.calls(), vec![GlCall::SetCapability(Capability::DepthTest, false)]);
    }

    #[test]
    fn test_begin_frame_clears_colour_and_depth() {
        let mut f = fixture();
        f.gl.clear_calls();
        f.renderer.begin_frame();
        assert_eq!(f.gl.calls(), vec![GlCall::Clear(ClearFlags::COLOR | ClearFlags::DEPTH)]);
    }

    #[test]
    fn test_active_textures_are_compacted() {
        let mut f = fixture();
        let t1 = pixel_texture(&f.renderer);
        let t2 = pixel_texture(&f.renderer);

        let bound = f.renderer.set_active_textures(&[None, Some(t1.clone()), None, Some(t2.clone())]);
        assert_eq!(bound, 2);
        assert_eq!(f.gl.bound_texture(0), texture_id(&t1));
        assert_eq!(f.gl.bound_texture(1), texture_id(&t2));
        assert_eq!(f.gl.bound_texture(2), NULL_ID);
        assert!(f.sink.entries().is_empty());
    }

    #[test]
    fn test_textures_beyond_unit_limit_are_dropped() {
        let mut f = fixture();
        let textures: Vec<Option<Rc<dyn Texture>>> = (0..MAX_TEXTURE_SLOTS + 2)
            .map(|_| Some(pixel_texture(&f.renderer)))
            .collect();

        assert_eq!(f.renderer.set_active_textures(&textures), MAX_TEXTURE_SLOTS);
        assert_eq!(f.renderer.bound_texture_count(), MAX_TEXTURE_SLOTS);
        assert_eq!(f.sink.count_at_least(LogSeverity::Warn), 1);
    }

    #[test]
    fn test_failed_creation_warns_and_returns_none() {
        let f = fixture();

        f.gl.fail_next(ObjectKind::Texture, 1);
        assert!(f
            .renderer
            .create_texture(&TextureDescriptor::render_target(4, 4, PixelFormat::Rgba8))
            .is_none());

        assert!(f.renderer.create_program(VERT, "#error missing", "").is_none());

        f.gl.fail_next(ObjectKind::Buffer, 1);
        assert!(f.renderer.create_base_mesh().is_none());
        assert_eq!(f.gl.live_count(ObjectKind::Buffer), 0);
        assert_eq!(f.gl.live_count(ObjectKind::VertexArray), 0);

        let warnings = f.sink.entries();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|e| e.severity == LogSeverity::Warn));
        assert!(warnings[1].message.contains("fragment"));
    }

    #[test]
    fn test_failed_middle_buffer_frees_whole_batch() {
        let f = fixture();
        let descriptors = [
            BufferDescriptor::index(BufferComponentDataType::Uint32),
            BufferDescriptor::vertex(2, BufferComponentDataType::Float32, 0),
            BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 1),
            BufferDescriptor::vertex(3, BufferComponentDataType::Float32, 2),
            BufferDescriptor::vertex(4, BufferComponentDataType::Uint8, 3),
        ];
        f.gl.fail_after(ObjectKind::Buffer, 2, 1);

        assert!(f.renderer.create_buffer_array_object(&descriptors).is_none());
        assert_eq!(f.gl.allocation_count(ObjectKind::Buffer), 4);
        assert_eq!(f.gl.free_count(ObjectKind::Buffer), 4);
        assert_eq!(f.gl.live_count(ObjectKind::Buffer), 0);
        assert_eq!(f.gl.live_count(ObjectKind::VertexArray), 0);
        assert_eq!(f.gl.invalid_free_count(), 0);

        let entries = f.sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity, LogSeverity::Warn);
    }

    #[test]
    fn test_null_frame_buffer_selects_default_target() {
        let mut f = fixture();
        let color = f
            .renderer
            .create_texture(&TextureDescriptor::render_target(8, 8, PixelFormat::Rgba8))
            .unwrap();
        let desc = FrameBufferObjectDescriptor::default().with_texture(AttachmentPoint::Color(0), color);
        let fbo = f.renderer.create_frame_buffer_object(&desc).unwrap();

        f.renderer.set_active_frame_buffer(Some(fbo), FrameBufferTarget::Draw);
        let offscreen = f.gl.bound_framebuffer(FrameBufferTarget::Draw);
        assert_ne!(offscreen, NULL_ID);

        // Creating another framebuffer keeps the active one bound
        let other = f.renderer.create_frame_buffer_object(&desc).unwrap();
        assert!(other.is_valid());
        assert_eq!(f.gl.bound_framebuffer(FrameBufferTarget::Draw), offscreen);

        f.renderer.set_active_frame_buffer(None, FrameBufferTarget::Draw);
        assert_eq!(f.gl.bound_framebuffer(FrameBufferTarget::Draw), NULL_ID);
    }

    #[test]
    fn test_render_base_mesh() {
        let mut f = fixture();
        let program = f.renderer.create_program(VERT, FRAG, "").unwrap();
        let mut mesh = f.renderer.create_base_mesh().unwrap();
        triangle(&mut mesh);
        mesh.upload().unwrap();

        let mvp = Mat4::new_scaling(2.0);
        let drawn = f.renderer.render_mesh(&mesh, program.as_ref(), &DrawState::new(mvp), &[]);
        assert!(drawn);

        let draws = f.gl.draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].count, 3);
        let uploaded = f.gl.uniform(draws[0].program, "MVP").unwrap();
        assert_eq!(uploaded[0], 2.0);

        mesh.clear().unwrap();
        assert!(!f.renderer.render_mesh(&mesh, program.as_ref(), &DrawState::default(), &[]));
        assert_eq!(f.gl.draw_calls().len(), 1);
    }

    #[test]
    fn test_render_lines_mode() {
        let mut f = fixture();
        let program = f.renderer.create_program(VERT, FRAG, "").unwrap();
        let mut mesh = f.renderer.create_base_mesh().unwrap();
        triangle(&mut mesh);
        mesh.upload().unwrap();

        let state = DrawState::default()
            .with_mode(MeshRenderMode::Lines)
            .with_depth_test(false);
        assert!(f.renderer.render_mesh(&mesh, program.as_ref(), &state, &[]));
        assert!(!f.gl.capability_enabled(Capability::DepthTest));
        assert_eq!(
            f.gl.draw_calls()[0].mode,
            crate::render::backends::gl::api::PrimitiveMode::Lines
        );
    }

    #[test]
    fn test_invalid_program_skips_draw() {
        let mut f = fixture();
        let mut mesh = f.renderer.create_base_mesh().unwrap();
        triangle(&mut mesh);
        mesh.upload().unwrap();

        assert!(!f.renderer.render_mesh(&mesh, &BrokenProgram, &DrawState::default(), &[]));
        assert!(f.gl.draw_calls().is_empty());
        assert_eq!(f.sink.count_at_least(LogSeverity::Warn), 1);
    }

    #[test]
    fn test_render_animated_mesh_uploads_pose() {
        let mut f = fixture();
        let skeleton = Skeleton::new(vec![
            Bone::root("root", Mat4::identity()),
            Bone::new("tip", 0, Mat4::identity()),
        ])
        .unwrap();
        let keys = BoneKeys::new(
            KeyframeTrack::constant(Vec3::new(0.0, 3.0, 0.0)),
            KeyframeTrack::constant(Quat::identity()),
        );
        let animation = AnimationData::new(skeleton, f.sink.clone())
            .with_clip(AnimationClip::new("raise", vec![Some(keys)]))
            .unwrap();

        let program = f.renderer.create_program(VERT, FRAG, "").unwrap();
        let mut mesh = f.renderer.create_animated_mesh(animation).unwrap();
        mesh.indices = vec![0, 1, 2];
        mesh.positions = vec![[0.0; 3]; 3];
        mesh.uvs = vec![[0.0; 2]; 3];
        mesh.normals = vec![[0.0, 0.0, 1.0]; 3];
        mesh.blend_indices = vec![[0, 1, 0, 0]; 3];
        mesh.blend_weights = vec![[128, 127, 0, 0]; 3];
        mesh.upload().unwrap();

        mesh.animation_mut().set_animation("raise").unwrap();
        assert!(mesh.animation_mut().animate(0.0));
        assert!(f.renderer.render_animated_mesh(&mesh, program.as_ref(), &DrawState::default(), &[]));

        let bones = f.gl.uniform(f.gl.current_program(), "Bones").unwrap();
        assert_eq!(bones.len(), 32);
        // Both bones inherit the root's lift
        assert_eq!(bones[13], 3.0);
        assert_eq!(bones[16 + 13], 3.0);

        // Blend buffers are dumped on upload
        assert_eq!(
            f.sink
                .entries()
                .iter()
                .filter(|e| e.message.starts_with("Buffer Blend"))
                .count(),
            2
        );
    }

    #[test]
    fn test_unsupported_debug_output_renders_without_monitor() {
        let gl = Rc::new(HeadlessGl::new());
        gl.set_debug_output_supported(false);
        let sink = Rc::new(RecordingSink::new());
        let api: Rc<dyn GlApi> = gl.clone();
        let mut renderer = GlRenderer::new(api, RendererConfig::default().with_debug_output(true), sink.clone()).unwrap();

        assert!(renderer.debug_message_monitor().is_none());
        assert!(!gl.capability_enabled(Capability::DebugOutput));
        assert_eq!(sink.entries().len(), 1);
        assert_eq!(sink.entries()[0].severity, LogSeverity::Info);

        let program = renderer.create_program(VERT, FRAG, "").unwrap();
        let mut mesh = renderer.create_base_mesh().unwrap();
        triangle(&mut mesh);
        mesh.upload().unwrap();

        renderer.begin_frame();
        assert!(renderer.render_mesh(&mesh, program.as_ref(), &DrawState::default(), &[]));
        renderer.end_frame();
        assert_eq!(gl.draw_calls().len(), 1);
        assert_eq!(sink.count_at_least(LogSeverity::Warn), 0);
    }

    #[test]
    fn test_end_frame_drains_debug_messages() {
        let mut f = fixture_with(RendererConfig::default().with_debug_output(true));
        assert!(f.gl.capability_enabled(Capability::DebugOutput));

        f.gl.push_debug_message(RawDebugMessage {
            source: 0x8246,
            kind: 0x824C,
            id: 1,
            severity: DEBUG_SEVERITY_HIGH,
            message: "invalid enum".to_owned(),
        });
        f.renderer.end_frame();

        assert_eq!(f.sink.count_at_least(LogSeverity::Error), 1);
        let monitor = f.renderer.debug_message_monitor().unwrap();
        assert!(monitor.is_debugging_enabled());
        assert!(monitor.messages().is_empty());
    }
}
