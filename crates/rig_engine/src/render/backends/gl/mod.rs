//! OpenGL backend
//!
//! - **api**: the object-safe native function table and its enums
//! - **glow_api** / **headless**: production and in-memory implementations
//! - **handles**: typed native handles and their single-owner wrapper
//! - resource wrappers: buffers, buffer array objects, programs, textures,
//!   framebuffers, render buffers and the debug message monitor
//! - **renderer**: the [`Renderer`](crate::render::Renderer) facade

pub mod api;
pub mod buffer_array_object;
pub mod buffer_object;
pub mod debug_monitor;
pub mod framebuffer;
pub mod glow_api;
pub mod handles;
pub mod headless;
pub mod program;
pub mod renderer;
pub mod texture;

#[cfg(test)]
mod renderer_tests;

pub use api::{GlApi, NativeId, NULL_ID};
pub use buffer_array_object::GlBufferArrayObject;
pub use buffer_object::GlBufferObject;
pub use debug_monitor::GlDebugMessageMonitor;
pub use framebuffer::{GlFrameBufferObject, GlRenderBufferObject};
pub use glow_api::GlowApi;
pub use headless::{DrawCall, GlCall, HeadlessGl, ObjectKind};
pub use program::GlProgram;
pub use renderer::GlRenderer;
pub use texture::GlTexture;
