//! The per-track audio engine boundary.
//!
//! Decoding, playback clocks and waveform drawing all live behind
//! [`AudioEngine`]. The session owns one engine per track and only ever
//! talks to it through this trait.

use collabmix_core::DecodeError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::waveform::WaveformCanvas;

/// Future returned by [`AudioEngine::load`].
pub type DecodeFuture = Pin<Box<dyn Future<Output = Result<AudioHandle, DecodeError>> + Send>>;

/// Opaque reference to decoded audio owned by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle(u64);

impl AudioHandle {
    /// Wrap an engine-specific identifier.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The engine-specific identifier.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audio#{}", self.0)
    }
}

/// Audio capability bound to a single track.
///
/// Parameter setters take already-normalized values: gain in `0..=1`,
/// pan in `-1..=1`, rate as a positive multiplier. Converting to the
/// engine's native units (decibels, etc.) is the engine's job.
pub trait AudioEngine: Send {
    /// Start decoding `bytes`. The returned future resolves off the control path.
    fn load(&mut self, bytes: Vec<u8>) -> DecodeFuture;

    fn play(&mut self, handle: AudioHandle);
    fn pause(&mut self, handle: AudioHandle);
    fn stop(&mut self, handle: AudioHandle);

    fn set_volume(&mut self, gain: f32);
    fn set_pan(&mut self, pan: f32);
    fn set_playback_rate(&mut self, ratio: f64);
    fn set_muted(&mut self, muted: bool);

    /// Draw `handle`'s waveform into `canvas`. Visual only.
    fn render_waveform(&mut self, handle: AudioHandle, canvas: &mut WaveformCanvas);

    /// Release every resource held by this engine.
    ///
    /// Called exactly once per engine by its owner.
    fn dispose(&mut self);
}
