//! Named animation clips

use super::track::KeyframeTrack;
use crate::foundation::math::{rotation, translation, Mat4, Quat, Vec3};

/// Position and rotation channels for one bone
///
/// A missing channel contributes nothing: no translation, or no rotation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneKeys {
    /// Translation track
    pub positions: Option<KeyframeTrack<Vec3>>,
    /// Rotation track
    pub rotations: Option<KeyframeTrack<Quat>>,
}

impl BoneKeys {
    /// Keys with both channels present
    pub const fn new(positions: KeyframeTrack<Vec3>, rotations: KeyframeTrack<Quat>) -> Self {
        Self {
            positions: Some(positions),
            rotations: Some(rotations),
        }
    }

    /// `translation(position) * rotation(orientation)` at `time`
    pub fn local_transform(&self, time: f32) -> Mat4 {
        let position = self
            .positions
            .as_ref()
            .map_or_else(Vec3::zeros, |track| track.sample(time));
        let orientation = self
            .rotations
            .as_ref()
            .map_or_else(Quat::identity, |track| track.sample(time));
        translation(&position) * rotation(&orientation)
    }

    /// Time of the latest key across both channels
    pub fn end_time(&self) -> f32 {
        let positions = self.positions.as_ref().map_or(0.0, KeyframeTrack::end_time);
        let rotations = self.rotations.as_ref().map_or(0.0, KeyframeTrack::end_time);
        positions.max(rotations)
    }
}

/// One animation: per-bone keys indexed by bone index
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    /// Clip name, unique within an [`AnimationData`](super::AnimationData)
    pub name: String,
    /// Playback length in seconds
    pub duration: f32,
    /// Keys per bone; `None` leaves the bone at identity local transform
    pub bone_keys: Vec<Option<BoneKeys>>,
}

impl AnimationClip {
    /// Create a clip whose duration is the latest key time
    pub fn new(name: impl Into<String>, bone_keys: Vec<Option<BoneKeys>>) -> Self {
        let duration = bone_keys
            .iter()
            .flatten()
            .map(BoneKeys::end_time)
            .fold(0.0_f32, f32::max);
        Self {
            name: name.into(),
            duration,
            bone_keys,
        }
    }

    /// Override the playback length
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    /// Keys for `bone`, if the clip animates it
    pub fn keys(&self, bone: usize) -> Option<&BoneKeys> {
        self.bone_keys.get(bone).and_then(Option::as_ref)
    }

    /// Local transform of `bone` at `time`; identity when untracked
    pub fn local_transform(&self, bone: usize, time: f32) -> Mat4 {
        self.keys(bone).map_or_else(Mat4::identity, |keys| keys.local_transform(time))
    }

    /// Map an ever-increasing playback time into `[0, duration)`
    ///
    /// Sampling itself clamps; this is for callers that want looping.
    pub fn wrap_time(&self, time: f32) -> f32 {
        if self.duration > 0.0 && time.is_finite() {
            time.rem_euclid(self.duration)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::track::Keyframe;
    use approx::assert_relative_eq;

    fn slide() -> KeyframeTrack<Vec3> {
        KeyframeTrack::new(vec![
            Keyframe::new(0.0, Vec3::zeros()),
            Keyframe::new(2.0, Vec3::new(0.0, 4.0, 0.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_translation_applied_after_rotation() {
        let turn = Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_2);
        let keys = BoneKeys::new(KeyframeTrack::constant(Vec3::new(1.0, 0.0, 0.0)), KeyframeTrack::constant(turn));
        let local = keys.local_transform(0.0);

        // x axis rotates onto y, then the bone is translated along x
        let p = local.transform_point(&nalgebra::Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.coords, Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_missing_channels_are_identity() {
        let keys = BoneKeys {
            positions: Some(slide()),
            rotations: None,
        };
        assert_relative_eq!(keys.local_transform(1.0), translation(&Vec3::new(0.0, 2.0, 0.0)));

        let clip = AnimationClip::new("walk", vec![None, Some(keys)]);
        assert_relative_eq!(clip.local_transform(0, 1.0), Mat4::identity());
        assert_relative_eq!(clip.local_transform(7, 1.0), Mat4::identity());
    }

    #[test]
    fn test_duration_and_wrapping() {
        let clip = AnimationClip::new(
            "slide",
            vec![Some(BoneKeys {
                positions: Some(slide()),
                rotations: None,
            })],
        );
        assert_relative_eq!(clip.duration, 2.0);
        assert_relative_eq!(clip.wrap_time(5.0), 1.0);
        assert_relative_eq!(clip.wrap_time(-0.5), 1.5);

        let still = AnimationClip::new("still", Vec::new());
        assert_relative_eq!(still.wrap_time(3.0), 0.0);
    }
}
