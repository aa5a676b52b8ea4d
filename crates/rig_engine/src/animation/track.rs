//! Keyframe tracks and interpolation
//!
//! A track is a non-empty list of samples with strictly increasing, finite
//! times. Sampling outside the track's range clamps to the nearest boundary
//! sample; sampling inside blends the two bracketing samples with factor
//! `(t - t0) / (t1 - t0)`.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Quat, Vec3};

/// Values that can be blended between two keyframes
pub trait Interpolate: Copy {
    /// Blend from `self` (factor 0) to `next` (factor 1)
    fn interpolate(&self, next: &Self, factor: f32) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(&self, next: &Self, factor: f32) -> Self {
        self.lerp(next, factor)
    }
}

impl Interpolate for Quat {
    /// Shortest-path slerp; nlerp when the keys are too close for slerp to be
    /// well conditioned
    fn interpolate(&self, next: &Self, factor: f32) -> Self {
        self.try_slerp(next, factor, 1.0e-6)
            .unwrap_or_else(|| self.nlerp(next, factor))
    }
}

/// One sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe<T> {
    /// Sample time
    pub time: f32,
    /// Sampled value
    pub value: T,
}

impl<T> Keyframe<T> {
    /// Create a sample
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// Errors detected while building a track
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    /// No samples
    #[error("Keyframe track has no samples")]
    Empty,

    /// A sample time is NaN or infinite
    #[error("Keyframe {index} has a non-finite time")]
    NonFiniteTime {
        /// Offending sample
        index: usize,
    },

    /// A sample time does not exceed the previous one
    #[error("Keyframe {index} is not later than keyframe {}", index - 1)]
    NonMonotonicTime {
        /// Offending sample
        index: usize,
    },
}

/// Validated, time-ordered samples
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    keys: Vec<Keyframe<T>>,
}

impl<T: Interpolate> KeyframeTrack<T> {
    /// Validate and wrap `keys`
    pub fn new(keys: Vec<Keyframe<T>>) -> Result<Self, TrackError> {
        if keys.is_empty() {
            return Err(TrackError::Empty);
        }
        for (index, key) in keys.iter().enumerate() {
            if !key.time.is_finite() {
                return Err(TrackError::NonFiniteTime { index });
            }
            if index > 0 && key.time <= keys[index - 1].time {
                return Err(TrackError::NonMonotonicTime { index });
            }
        }
        Ok(Self { keys })
    }

    /// A single-sample track holding `value` at all times
    pub fn constant(value: T) -> Self {
        Self {
            keys: vec![Keyframe::new(0.0, value)],
        }
    }

    /// Samples in time order
    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    /// Time of the first sample
    pub fn start_time(&self) -> f32 {
        self.keys[0].time
    }

    /// Time of the last sample
    pub fn end_time(&self) -> f32 {
        self.keys[self.keys.len() - 1].time
    }

    /// Value at `time`, clamped to the boundary samples outside the track
    ///
    /// A NaN time yields the first sample.
    pub fn sample(&self, time: f32) -> T {
        let first = &self.keys[0];
        let last = &self.keys[self.keys.len() - 1];
        if time.is_nan() || time <= first.time {
            return first.value;
        }
        if time >= last.time {
            return last.value;
        }

        // first.time < time < last.time, so 1 <= next <= len - 1
        let next = self.keys.partition_point(|key| key.time <= time);
        let (from, to) = (&self.keys[next - 1], &self.keys[next]);
        let factor = (time - from.time) / (to.time - from.time);
        from.value.interpolate(&to.value, factor)
    }
}
