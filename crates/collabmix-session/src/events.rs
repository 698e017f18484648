//! Outcomes of async track operations, reported to the caller.

use collabmix_audio::AudioHandle;
use collabmix_core::{CaptureError, DecodeError};

use crate::track::TrackId;

/// Something that finished in the background for one track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// Decode finished; the track now plays `handle`.
    AudioLoaded { track: TrackId, handle: AudioHandle },
    /// Decode failed; the previously loaded audio (if any) is kept.
    DecodeFailed { track: TrackId, error: DecodeError },
    /// The microphone stream was granted and capture is running.
    RecordingStarted { track: TrackId },
    /// The microphone stream was refused or unavailable. Recording stays off.
    CaptureDenied { track: TrackId, error: CaptureError },
    /// Finalizing a take failed. Nothing is loaded from it.
    CaptureFailed { track: TrackId, error: CaptureError },
    /// A take of `bytes` bytes was captured and handed to the decoder.
    RecordingCaptured { track: TrackId, bytes: usize },
}

impl TrackEvent {
    /// The track this event belongs to.
    pub fn track(&self) -> TrackId {
        match self {
            Self::AudioLoaded { track, .. }
            | Self::DecodeFailed { track, .. }
            | Self::RecordingStarted { track }
            | Self::CaptureDenied { track, .. }
            | Self::CaptureFailed { track, .. }
            | Self::RecordingCaptured { track, .. } => *track,
        }
    }

    /// Whether this event reports a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::DecodeFailed { .. } | Self::CaptureDenied { .. } | Self::CaptureFailed { .. }
        )
    }
}
