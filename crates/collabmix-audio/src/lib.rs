//! Collab-Mix Audio - Audio engine boundary
//!
//! Everything that actually touches sound sits behind the traits in this
//! crate. The session layer coordinates state; engines do the work.
//!
//! Architecture:
//! - `AudioEngine`: per-track decode/playback/waveform capability
//! - `MicrophoneCapture`: input capture for recordable tracks
//! - `EngineFactory`: builds both when the session creates a track
//! - `MixerChannel`: resolved stereo gain of a track
//! - `Waveform`: min/max peaks for display
//! - `MemoryEngine`: in-process reference backend

pub mod capture;
pub mod engine;
pub mod memory;
pub mod mixer;
pub mod waveform;

pub use capture::{CaptureStream, MicrophoneCapture, StreamFuture, TakeFuture};
pub use engine::{AudioEngine, AudioHandle, DecodeFuture};
pub use memory::{MemoryEngine, MemoryEngineFactory, MemoryMicrophone};
pub use mixer::MixerChannel;
pub use waveform::{Waveform, WaveformCanvas, WaveformSample};

/// Creates the external resources backing a new track.
///
/// `track` is the raw id of the track being created.
pub trait EngineFactory: Send {
    /// Engine for any track.
    fn create_engine(&mut self, track: u64) -> Box<dyn AudioEngine>;

    /// Microphone for a recordable track.
    fn create_microphone(&mut self, track: u64) -> Box<dyn MicrophoneCapture>;
}
