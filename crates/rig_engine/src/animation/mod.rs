//! # Skeletal Animation
//!
//! Converts time-indexed keyframe tracks into one pose matrix per bone.
//!
//! - [`Skeleton`]: validated bone forest (checked once, at load time)
//! - [`KeyframeTrack`]: clamped, binary-searched sampling with lerp/slerp
//! - [`AnimationClip`]: per-bone position and rotation tracks
//! - [`PoseEvaluator`]: worklist traversal composing world transforms
//! - [`AnimationData`]: skeleton + clips + the cached pose the renderer reads

pub mod clip;
pub mod data;
pub mod evaluator;
pub mod skeleton;
pub mod track;

pub use clip::{AnimationClip, BoneKeys};
pub use data::{AnimationData, AnimationError};
pub use evaluator::{evaluate_pose, PoseEvaluator};
pub use skeleton::{Bone, Skeleton, SkeletonError};
pub use track::{Interpolate, Keyframe, KeyframeTrack, TrackError};
