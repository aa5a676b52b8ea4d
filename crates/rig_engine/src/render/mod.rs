//! # Rendering System
//!
//! A thin hardware-abstraction layer over OpenGL: lifecycle-managed GPU
//! resources created from declarative descriptors, plus a renderer facade
//! that owns all per-frame state changes.
//!
//! ## Architecture
//!
//! - **api**: backend-agnostic descriptors, resource capability traits and the
//!   [`Renderer`] facade contract
//! - **backends::gl**: the OpenGL implementation, built on an object-safe
//!   native function table with a production (`glow`) and a headless
//!   implementation
//! - **mesh**: CPU-side mesh buffers bound to a buffer array object
//!
//! ## Failure Model
//!
//! Native allocation failures never panic and never escape the factory
//! methods as errors. Internally creation paths return [`ResourceError`];
//! the renderer turns every error into a warning on its diagnostic sink and
//! hands the caller `None`.

pub mod api;
pub mod backends;
pub mod mesh;

pub use api::*;
pub use backends::gl::{GlApi, GlRenderer, GlowApi, HeadlessGl};
pub use mesh::{dump_buffer, AnimatedMesh, BaseMesh};

/// Errors raised while creating or updating GPU resources
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// A native object could not be allocated
    ///
    /// The native API returned the null identifier for the named object kind.
    #[error("Failed to allocate native {0}")]
    HandleCreation(&'static str),

    /// A shader stage failed to compile
    #[error("{stage} shader compilation failed: {log}")]
    ShaderCompilation {
        /// Stage name
        stage: &'static str,
        /// Compiler info log
        log: String,
    },

    /// The program failed to link
    #[error("Program link failed: {0}")]
    ProgramLink(String),

    /// The descriptor cannot describe a valid resource
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The framebuffer attachments do not form a complete framebuffer
    #[error("Framebuffer incomplete (status 0x{0:04X})")]
    IncompleteFramebuffer(u32),

    /// A batch creation was requested with no members
    #[error("Empty creation batch")]
    EmptyBatch,

    /// Uploaded data does not match the declared layout
    #[error("Size mismatch: expected {expected} bytes, got {actual} bytes")]
    SizeMismatch {
        /// Byte count implied by the declared layout
        expected: usize,
        /// Supplied byte count
        actual: usize,
    },

    /// An operation was attempted on an invalid handle
    #[error("Operation on invalid {0} handle")]
    InvalidHandle(&'static str),
}
