//! Session configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::ColorScheme;
use crate::error::{MixError, Result};
use crate::tempo::Bpm;

/// Defaults and ranges applied to every track in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Tempo at which playback runs at ratio 1.0.
    pub reference_bpm: f64,
    /// Lowest value of the BPM control.
    pub min_bpm: f64,
    /// Highest value of the BPM control.
    pub max_bpm: f64,
    /// BPM control value of a new track.
    pub default_bpm: f64,
    /// Volume of a new track (0.0 to 1.0).
    pub default_volume: f32,
    /// Pan of a new track (-1.0 to 1.0).
    pub default_pan: f32,
    /// New tracks are named `"{name_prefix} {n}"`.
    pub name_prefix: String,
    /// Color assignment for new tracks.
    pub colors: ColorScheme,
    /// Seed for color assignment. `None` seeds from the OS.
    pub color_seed: Option<u64>,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            reference_bpm: Bpm::REFERENCE.value(),
            min_bpm: 60.0,
            max_bpm: 180.0,
            default_bpm: Bpm::REFERENCE.value(),
            default_volume: 0.5,
            default_pan: 0.0,
            name_prefix: "Track".into(),
            colors: ColorScheme::default(),
            color_seed: None,
        }
    }
}

impl MixConfig {
    /// Reference tempo as a `Bpm`.
    pub fn reference(&self) -> Bpm {
        // validate() guarantees a positive, finite reference
        Bpm::new(self.reference_bpm).unwrap_or_default()
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if !(self.reference_bpm.is_finite() && self.reference_bpm > 0.0) {
            return Err(MixError::Config(format!(
                "reference_bpm must be positive, got {}",
                self.reference_bpm
            )));
        }
        if !(self.min_bpm.is_finite() && self.max_bpm.is_finite() && self.min_bpm > 0.0)
            || self.min_bpm > self.max_bpm
        {
            return Err(MixError::Config(format!(
                "invalid BPM range {}..={}",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.min_bpm..=self.max_bpm).contains(&self.default_bpm) {
            return Err(MixError::Config(format!(
                "default_bpm {} outside {}..={}",
                self.default_bpm, self.min_bpm, self.max_bpm
            )));
        }
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(MixError::Config(format!(
                "default_volume {} outside 0..=1",
                self.default_volume
            )));
        }
        if !(-1.0..=1.0).contains(&self.default_pan) {
            return Err(MixError::Config(format!(
                "default_pan {} outside -1..=1",
                self.default_pan
            )));
        }
        if let ColorScheme::Palette(colors) = &self.colors {
            if colors.is_empty() {
                return Err(MixError::Config("color palette is empty".into()));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let config: Self = serde_json::from_slice(data)
            .map_err(|e| MixError::Config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}
