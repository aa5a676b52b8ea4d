//! Per-mesh animation state

use std::fmt;
use std::rc::Rc;

use super::clip::AnimationClip;
use super::evaluator::PoseEvaluator;
use super::skeleton::{Skeleton, SkeletonError};
use super::track::TrackError;
use crate::foundation::logging::{default_sink, LogSeverity, LogSource, SharedSink};
use crate::foundation::math::Mat4;

/// Errors raised while assembling animation data
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    /// No clip with this name has been added
    #[error("Unknown animation clip '{0}'")]
    UnknownClip(String),

    /// A clip with this name already exists
    #[error("Animation clip '{0}' already exists")]
    DuplicateClip(String),

    /// The clip has keys for more bones than the skeleton holds
    #[error("Clip '{clip}' has keys for {tracks} bones, but the skeleton has {bones}")]
    TrackCountMismatch {
        /// Clip name
        clip: String,
        /// Number of per-bone key entries
        tracks: usize,
        /// Number of bones
        bones: usize,
    },

    /// The bone hierarchy is malformed
    #[error(transparent)]
    Skeleton(#[from] SkeletonError),

    /// A keyframe track is malformed
    #[error(transparent)]
    Track(#[from] TrackError),
}

/// Skeleton, clips and the cached pose of one animated mesh
///
/// The pose holds one matrix per bone, starts at identity and is only
/// rewritten by [`animate`](Self::animate).
pub struct AnimationData {
    skeleton: Skeleton,
    clips: Vec<AnimationClip>,
    current: Option<usize>,
    pose: Vec<Mat4>,
    evaluator: PoseEvaluator,
    sink: SharedSink,
}

impl AnimationData {
    /// Wrap a validated skeleton
    pub fn new(skeleton: Skeleton, sink: SharedSink) -> Self {
        let pose = vec![Mat4::identity(); skeleton.len()];
        Self {
            skeleton,
            clips: Vec::new(),
            current: None,
            pose,
            evaluator: PoseEvaluator::new(),
            sink,
        }
    }

    /// No bones, no clips
    pub fn empty() -> Self {
        Self::new(Skeleton::empty(), default_sink())
    }

    /// Register a clip
    pub fn add_clip(&mut self, clip: AnimationClip) -> Result<(), AnimationError> {
        if self.clip_index(&clip.name).is_some() {
            return Err(AnimationError::DuplicateClip(clip.name));
        }
        if clip.bone_keys.len() > self.skeleton.len() {
            return Err(AnimationError::TrackCountMismatch {
                clip: clip.name,
                tracks: clip.bone_keys.len(),
                bones: self.skeleton.len(),
            });
        }
        log::debug!("Added animation clip '{}' ({:.2}s)", clip.name, clip.duration);
        self.clips.push(clip);
        Ok(())
    }

    /// Builder form of [`add_clip`](Self::add_clip)
    pub fn with_clip(mut self, clip: AnimationClip) -> Result<Self, AnimationError> {
        self.add_clip(clip)?;
        Ok(self)
    }

    /// Select the clip called `name` for subsequent [`animate`](Self::animate) calls
    pub fn set_animation(&mut self, name: &str) -> Result<(), AnimationError> {
        let index = self
            .clip_index(name)
            .ok_or_else(|| AnimationError::UnknownClip(name.to_owned()))?;
        self.current = Some(index);
        Ok(())
    }

    /// Deselect the current clip; the pose keeps its last value
    pub fn clear_animation(&mut self) {
        self.current = None;
    }

    /// The selected clip
    pub fn current_animation(&self) -> Option<&AnimationClip> {
        self.current.and_then(|index| self.clips.get(index))
    }

    /// All registered clips
    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// The bone hierarchy
    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Recompute the pose for the selected clip at `time`
    ///
    /// Returns `false` and leaves the pose untouched when no clip is
    /// selected.
    pub fn animate(&mut self, time: f32) -> bool {
        let clips = &self.clips;
        let Some(clip) = self.current.and_then(|index| clips.get(index)) else {
            return false;
        };
        let visited = self.evaluator.evaluate(&self.skeleton, clip, time, &mut self.pose);
        if visited != self.skeleton.len() {
            let message = format!(
                "Pose evaluation visited {visited} of {} bones in clip '{}'",
                self.skeleton.len(),
                clip.name
            );
            self.sink.log(LogSource::Animation, LogSeverity::Error, &message);
            debug_assert_eq!(visited, self.skeleton.len(), "{message}");
        }
        true
    }

    /// Pose matrices, one per bone
    pub fn current_frame(&self) -> &[Mat4] {
        &self.pose
    }

    /// Diagnostic sink this data reports to
    pub fn sink(&self) -> SharedSink {
        Rc::clone(&self.sink)
    }

    fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|clip| clip.name == name)
    }
}

impl fmt::Debug for AnimationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationData")
            .field("bones", &self.skeleton.len())
            .field("clips", &self.clips.iter().map(|c| c.name.as_str()).collect::<Vec<_>>())
            .field("current", &self.current_animation().map(|c| c.name.as_str()))
            .finish_non_exhaustive()
    }
}
