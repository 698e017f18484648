//! Collab-Mix Core - Foundation types for the mixing surface
//!
//! This crate provides the types shared by every other crate:
//! - Error taxonomy (decode, capture, parameter errors)
//! - Track colors and color assignment schemes
//! - Tempo (BPM) to playback-rate conversion
//! - Session configuration

pub mod color;
pub mod config;
pub mod error;
pub mod tempo;

pub use color::{ColorScheme, TrackColor};
pub use config::MixConfig;
pub use error::{CaptureError, DecodeError, MixError, Result};
pub use tempo::Bpm;

/// Control ranges shared by the session and the engine boundary.
pub mod ranges {
    /// Lowest accepted track volume (normalized linear gain).
    pub const VOLUME_MIN: f32 = 0.0;

    /// Highest accepted track volume.
    pub const VOLUME_MAX: f32 = 1.0;

    /// Hard-left pan position.
    pub const PAN_MIN: f32 = -1.0;

    /// Hard-right pan position.
    pub const PAN_MAX: f32 = 1.0;
}
