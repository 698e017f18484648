//! Per-track output gain model.
//!
//! Describes how a track's resolved state maps onto left/right gains. The
//! engine does the actual signal work; this is what a meter bridge or
//! mixer view reports.

use collabmix_core::ranges::{PAN_MAX, PAN_MIN, VOLUME_MAX, VOLUME_MIN};
use serde::{Deserialize, Serialize};

/// Resolved mixer channel for one track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixerChannel {
    /// Volume (0.0 to 1.0).
    pub volume: f32,
    /// Pan (-1.0 = full left, 0.0 = center, 1.0 = full right).
    pub pan: f32,
    /// Effective audible state after mute and solo resolution.
    pub audible: bool,
}

impl Default for MixerChannel {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            audible: true,
        }
    }
}

impl MixerChannel {
    /// Compute left/right gain from volume and pan (constant-power panning).
    pub fn stereo_gain(&self) -> (f32, f32) {
        if !self.audible {
            return (0.0, 0.0);
        }
        let volume = self.volume.clamp(VOLUME_MIN, VOLUME_MAX);
        let pan = self.pan.clamp(PAN_MIN, PAN_MAX);
        let angle = (pan + 1.0) * 0.25 * std::f32::consts::PI;
        (volume * angle.cos(), volume * angle.sin())
    }
}
