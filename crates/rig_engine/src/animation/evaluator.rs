//! Hierarchical pose evaluation
//!
//! Bones are visited with an explicit worklist seeded by the roots, so every
//! bone is processed strictly after its parent regardless of how the bone
//! records are ordered. Each visit computes
//!
//! ```text
//! world[bone] = world[parent] * local(bone, time)
//! pose[bone]  = world[bone] * offset[bone]
//! ```
//!
//! World transforms are kept apart from the pose so a child never composes
//! against its parent's offset.

use super::clip::AnimationClip;
use super::skeleton::Skeleton;
use crate::foundation::math::Mat4;

/// Reusable scratch space for pose evaluation
#[derive(Debug, Default)]
pub struct PoseEvaluator {
    world: Vec<Mat4>,
    stack: Vec<usize>,
}

impl PoseEvaluator {
    /// Create an evaluator with empty scratch buffers
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute `pose` for `clip` at `time`
    ///
    /// `pose` is resized to the bone count. Returns the number of bones
    /// visited, which equals the bone count for any validated skeleton.
    pub fn evaluate(&mut self, skeleton: &Skeleton, clip: &AnimationClip, time: f32, pose: &mut Vec<Mat4>) -> usize {
        let count = skeleton.len();
        pose.resize(count, Mat4::identity());
        self.world.clear();
        self.world.resize(count, Mat4::identity());
        self.stack.clear();
        self.stack.extend(skeleton.roots().iter().rev());

        let mut visited = 0;
        while let Some(index) = self.stack.pop() {
            let bone = &skeleton.bones()[index];
            let parent_world = bone.parent_index().map_or_else(Mat4::identity, |parent| self.world[parent]);
            let world = parent_world * clip.local_transform(index, time);
            self.world[index] = world;
            pose[index] = world * bone.offset;
            visited += 1;

            self.stack.extend(skeleton.children(index).iter().rev());
        }
        visited
    }
}

/// One-shot evaluation returning a fresh pose array
pub fn evaluate_pose(skeleton: &Skeleton, clip: &AnimationClip, time: f32) -> Vec<Mat4> {
    let mut pose = Vec::with_capacity(skeleton.len());
    PoseEvaluator::new().evaluate(skeleton, clip, time, &mut pose);
    pose
}
