//! Tempo control.
//!
//! A track's playback speed is set with a BPM control and forwarded to the
//! engine as a ratio against the session's reference tempo.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MixConfig;
use crate::error::{MixError, Result};

/// Beats per minute of a track's tempo control.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bpm(f64);

impl Bpm {
    /// 120 BPM, the reference tempo of a default session.
    pub const REFERENCE: Self = Self(120.0);

    /// Build a BPM value from any positive, finite number.
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(MixError::non_finite("bpm", value));
        }
        if value <= 0.0 {
            return Err(MixError::InvalidParameter(format!(
                "bpm must be positive, got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Build a BPM value clamped into the configured control range.
    ///
    /// Non-finite input is rejected.
    pub fn clamped(value: f64, config: &MixConfig) -> Result<Self> {
        if !value.is_finite() {
            return Err(MixError::non_finite("bpm", value));
        }
        Ok(Self(value.clamp(config.min_bpm, config.max_bpm)))
    }

    /// Raw BPM value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Playback-rate multiplier relative to `reference`.
    #[inline]
    pub fn ratio_to(self, reference: Bpm) -> f64 {
        playback_ratio(self.0, reference.0)
    }
}

impl Default for Bpm {
    fn default() -> Self {
        Self::REFERENCE
    }
}

impl fmt::Display for Bpm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// `bpm / reference`. Callers guarantee a positive reference.
#[inline]
pub fn playback_ratio(bpm: f64, reference: f64) -> f64 {
    bpm / reference
}
