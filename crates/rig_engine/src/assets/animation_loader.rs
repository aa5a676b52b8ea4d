//! RON rig descriptions
//!
//! A rig file lists bones (name, parent name, optional column-major offset
//! matrix) and clips whose tracks refer to bones by name:
//!
//! ```ron
//! (
//!     bones: [
//!         (name: "hips"),
//!         (name: "spine", parent: Some("hips")),
//!     ],
//!     clips: [
//!         (
//!             name: "bend",
//!             tracks: [
//!                 (bone: "spine", rotations: [(0.0, (0.0, 0.0, 0.0, 1.0)), (1.0, (0.0, 0.0, 0.383, 0.924))]),
//!             ],
//!         ),
//!     ],
//! )
//! ```
//!
//! Rotations are `(x, y, z, w)` and are normalized on load.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::animation::{
    AnimationClip, AnimationData, AnimationError, Bone, BoneKeys, Keyframe, KeyframeTrack, Skeleton,
};
use crate::assets::AssetError;
use crate::foundation::logging::SharedSink;
use crate::foundation::math::{quat_from_xyzw, Mat4, Vec3};

/// One bone of a rig file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoneDescription {
    /// Unique bone name
    pub name: String,
    /// Parent bone name; `None` for roots
    #[serde(default)]
    pub parent: Option<String>,
    /// Bind-pose inverse, column-major; identity when absent
    #[serde(default)]
    pub offset: Option<[f32; 16]>,
}

/// Keys for one bone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescription {
    /// Animated bone
    pub bone: String,
    /// `(time, (x, y, z))` translation keys
    #[serde(default)]
    pub positions: Vec<(f32, [f32; 3])>,
    /// `(time, (x, y, z, w))` rotation keys
    #[serde(default)]
    pub rotations: Vec<(f32, [f32; 4])>,
}

/// One clip of a rig file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescription {
    /// Clip name
    pub name: String,
    /// Playback length; the latest key time when absent
    #[serde(default)]
    pub duration: Option<f32>,
    /// Per-bone keys
    #[serde(default)]
    pub tracks: Vec<TrackDescription>,
}

/// A whole rig file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigDescription {
    /// Bone hierarchy
    pub bones: Vec<BoneDescription>,
    /// Animation clips
    #[serde(default)]
    pub clips: Vec<ClipDescription>,
}

fn track<T, U: Copy>(keys: &[(f32, U)], convert: impl Fn(U) -> T) -> Result<Option<KeyframeTrack<T>>, AnimationError>
where
    T: crate::animation::Interpolate,
{
    if keys.is_empty() {
        return Ok(None);
    }
    let keys = keys.iter().map(|&(time, value)| Keyframe::new(time, convert(value))).collect();
    Ok(Some(KeyframeTrack::new(keys)?))
}

impl RigDescription {
    /// Parse RON text
    pub fn from_ron(text: &str) -> Result<Self, AssetError> {
        ron::from_str(text).map_err(|e| AssetError::InvalidData(format!("Rig description: {e}")))
    }

    /// Resolve names, validate the hierarchy and every track
    pub fn build(&self, sink: SharedSink) -> Result<AnimationData, AssetError> {
        let mut indices = HashMap::with_capacity(self.bones.len());
        for (index, bone) in self.bones.iter().enumerate() {
            if indices.insert(bone.name.as_str(), index).is_some() {
                return Err(AssetError::InvalidData(format!("Duplicate bone '{}'", bone.name)));
            }
        }
        let lookup = |name: &str| {
            indices
                .get(name)
                .copied()
                .ok_or_else(|| AssetError::InvalidData(format!("Unknown bone '{name}'")))
        };

        let mut bones = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let parent = match &bone.parent {
                Some(name) => i32::try_from(lookup(name)?)
                    .map_err(|_| AssetError::InvalidData("Too many bones".to_owned()))?,
                None => -1,
            };
            let offset = bone.offset.map_or_else(Mat4::identity, |m| Mat4::from_column_slice(&m));
            bones.push(Bone::new(bone.name.clone(), parent, offset));
        }
        let skeleton = Skeleton::new(bones).map_err(AnimationError::from)?;
        let bone_count = skeleton.len();

        let mut data = AnimationData::new(skeleton, sink);
        for clip in &self.clips {
            let mut bone_keys: Vec<Option<BoneKeys>> = vec![None; bone_count];
            for description in &clip.tracks {
                let slot = &mut bone_keys[lookup(&description.bone)?];
                if slot.is_some() {
                    return Err(AssetError::InvalidData(format!(
                        "Clip '{}' animates bone '{}' twice",
                        clip.name, description.bone
                    )));
                }
                *slot = Some(BoneKeys {
                    positions: track(&description.positions, |[x, y, z]| Vec3::new(x, y, z))?,
                    rotations: track(&description.rotations, quat_from_xyzw)?,
                });
            }

            let mut built = AnimationClip::new(clip.name.clone(), bone_keys);
            if let Some(duration) = clip.duration {
                built = built.with_duration(duration);
            }
            data.add_clip(built)?;
        }

        log::debug!("Built rig with {} bones and {} clips", bone_count, self.clips.len());
        Ok(data)
    }
}

/// Loads rig files into [`AnimationData`]
#[derive(Debug, Clone, Copy, Default)]
pub struct AnimationLoader;

impl AnimationLoader {
    /// Read, parse and validate a `.ron` rig file
    pub fn load_file<P: AsRef<Path>>(path: P, sink: SharedSink) -> Result<AnimationData, AssetError> {
        let path = path.as_ref();
        if path.extension().and_then(|ext| ext.to_str()) != Some("ron") {
            return Err(AssetError::UnsupportedFormat(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let data = RigDescription::from_ron(&text)?.build(sink)?;
        log::info!("Loaded rig from {:?}", path);
        Ok(data)
    }
}
