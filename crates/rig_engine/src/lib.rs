//! # Rig Engine
//!
//! A thin hardware-abstraction layer over OpenGL with a skeletal animation
//! evaluator on top.
//!
//! ## Features
//!
//! - **GPU Resources**: programs, buffer array objects, textures and
//!   framebuffers created from declarative descriptors, each owning its native
//!   handles and freeing them exactly once
//! - **Renderer Facade**: one place for resource creation and per-frame state
//! - **Skeletal Animation**: validated bone hierarchies, clamped keyframe
//!   sampling and hierarchical pose evaluation
//! - **Headless Backend**: an in-memory native layer for tests and tools
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use rig_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api: Rc<dyn GlApi> = Rc::new(HeadlessGl::new());
//!     let mut renderer = GlRenderer::with_default_sink(api, RendererConfig::default())?;
//!     let program = renderer
//!         .create_program("uniform mat4 MVP; void main() {}", "void main() {}", "")
//!         .ok_or("program creation failed")?;
//!
//!     let mut mesh = renderer.create_base_mesh().ok_or("mesh creation failed")?;
//!     mesh.indices = vec![0, 1, 2];
//!     mesh.positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
//!     mesh.upload()?;
//!
//!     renderer.begin_frame();
//!     renderer.render_mesh(&mesh, program.as_ref(), &DrawState::default(), &[]);
//!     renderer.end_frame();
//!     Ok(())
//! }
//! ```

pub mod animation;
pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        animation::{AnimationClip, AnimationData, AnimationError, Bone, BoneKeys, Keyframe, KeyframeTrack, Skeleton},
        assets::{AnimationLoader, AssetError, ImageData, ImageLoader},
        config::{Config, RendererConfig},
        foundation::{
            logging::{DiagnosticSink, LogCrateSink, LogSeverity, LogSource, RecordingSink, SharedSink},
            math::{Mat4, Quat, Vec2, Vec3, Vec4},
        },
        render::{
            AnimatedMesh, BaseMesh, BufferDescriptor, DrawState, FrameBufferTarget, GlApi, GlRenderer, GlowApi,
            GpuBufferArrayObject, GpuProgram, HeadlessGl, MeshRenderMode, PixelFormat, Renderer, ResourceError,
            Texture, TextureDescriptor,
        },
    };
}
