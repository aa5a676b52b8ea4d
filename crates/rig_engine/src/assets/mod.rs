//! Asset loading
//!
//! Decoders for the data the core consumes but never parses itself: image
//! files become texture descriptors, RON rig descriptions become validated
//! [`AnimationData`](crate::animation::AnimationData).

pub mod animation_loader;
pub mod image_loader;

pub use animation_loader::{AnimationLoader, BoneDescription, ClipDescription, RigDescription, TrackDescription};
pub use image_loader::{ImageData, ImageLoader};

use thiserror::Error;

use crate::animation::AnimationError;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The decoded rig failed validation
    #[error("Invalid animation data: {0}")]
    Animation(#[from] AnimationError),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
