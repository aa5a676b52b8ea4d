//! Backend implementations for the render module
//!
//! OpenGL is the only backend. Its native calls go through the
//! [`gl::GlApi`] function table, so the same resource code runs against a
//! live context or the in-memory [`gl::HeadlessGl`].

/// OpenGL rendering backend implementation
pub mod gl;
