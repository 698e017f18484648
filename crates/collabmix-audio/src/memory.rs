//! In-process reference backend.
//!
//! `MemoryEngine` decodes raw little-endian `f32` mono PCM and keeps the
//! buffers in memory. It performs no audio output; transport and parameter
//! calls are recorded in an [`EngineState`] that can be inspected. Used by
//! the headless binary and anywhere a real device is unavailable.

use collabmix_core::{CaptureError, DecodeError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::capture::{CaptureStream, MicrophoneCapture, StreamFuture, TakeFuture};
use crate::engine::{AudioEngine, AudioHandle, DecodeFuture};
use crate::waveform::WaveformCanvas;
use crate::EngineFactory;

/// Bytes per encoded sample.
const SAMPLE_BYTES: usize = 4;

/// Encode mono samples as little-endian `f32` PCM.
pub fn encode_pcm(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian `f32` PCM.
pub fn decode_pcm(bytes: &[u8]) -> Result<Vec<f32>, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() % SAMPLE_BYTES != 0 {
        return Err(DecodeError::Malformed(format!(
            "{} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(SAMPLE_BYTES)
        .enumerate()
        .map(|(i, chunk)| {
            let s = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if s.is_finite() {
                Ok(s)
            } else {
                Err(DecodeError::Malformed(format!("sample {i} is not finite")))
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct BufferStore {
    next_id: u64,
    buffers: HashMap<u64, Arc<[f32]>>,
    closed: bool,
}

fn store_decoded(store: &Mutex<BufferStore>, bytes: &[u8]) -> Result<AudioHandle, DecodeError> {
    let samples = decode_pcm(bytes)?;
    let mut store = store.lock();
    if store.closed {
        return Err(DecodeError::Unsupported("engine has been disposed".into()));
    }
    store.next_id += 1;
    let id = store.next_id;
    debug!(handle = id, samples = samples.len(), "Decoded PCM buffer");
    store.buffers.insert(id, samples.into());
    Ok(AudioHandle::new(id))
}

/// Observable state of a [`MemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub volume: f32,
    pub pan: f32,
    pub playback_rate: f64,
    pub muted: bool,
    /// Handle currently playing, if any.
    pub playing: Option<AudioHandle>,
    pub disposed: bool,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pan: 0.0,
            playback_rate: 1.0,
            muted: false,
            playing: None,
            disposed: false,
        }
    }
}

/// Memory-backed [`AudioEngine`].
#[derive(Debug, Default)]
pub struct MemoryEngine {
    store: Arc<Mutex<BufferStore>>,
    state: EngineState,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Number of decoded buffers currently held.
    pub fn buffer_count(&self) -> usize {
        self.store.lock().buffers.len()
    }

    /// Copy of the decoded samples behind `handle`.
    pub fn samples(&self, handle: AudioHandle) -> Option<Arc<[f32]>> {
        self.store.lock().buffers.get(&handle.raw()).cloned()
    }
}

impl AudioEngine for MemoryEngine {
    fn load(&mut self, bytes: Vec<u8>) -> DecodeFuture {
        let store = Arc::clone(&self.store);
        Box::pin(async move { store_decoded(&store, &bytes) })
    }

    fn play(&mut self, handle: AudioHandle) {
        if self.store.lock().buffers.contains_key(&handle.raw()) {
            self.state.playing = Some(handle);
        }
    }

    fn pause(&mut self, handle: AudioHandle) {
        if self.state.playing == Some(handle) {
            self.state.playing = None;
        }
    }

    fn stop(&mut self, handle: AudioHandle) {
        self.pause(handle);
    }

    fn set_volume(&mut self, gain: f32) {
        self.state.volume = gain;
    }

    fn set_pan(&mut self, pan: f32) {
        self.state.pan = pan;
    }

    fn set_playback_rate(&mut self, ratio: f64) {
        self.state.playback_rate = ratio;
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.muted = muted;
    }

    fn render_waveform(&mut self, handle: AudioHandle, canvas: &mut WaveformCanvas) {
        match self.samples(handle) {
            Some(samples) => canvas.draw(&samples),
            None => canvas.clear(),
        }
    }

    fn dispose(&mut self) {
        if self.state.disposed {
            return;
        }
        let mut store = self.store.lock();
        store.closed = true;
        store.buffers.clear();
        self.state.playing = None;
        self.state.disposed = true;
        info!("Memory engine disposed");
    }
}

/// Memory-backed [`MicrophoneCapture`] that "records" a fixed take.
#[derive(Debug, Clone)]
pub struct MemoryMicrophone {
    take: Vec<f32>,
    allow: bool,
    next_stream: u64,
    active: Option<CaptureStream>,
}

impl MemoryMicrophone {
    /// A microphone whose every take is `take`.
    pub fn new(take: Vec<f32>) -> Self {
        Self {
            take,
            allow: true,
            next_stream: 0,
            active: None,
        }
    }

    /// A microphone whose permission request is always refused.
    pub fn denied() -> Self {
        Self {
            allow: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.active.is_some()
    }
}

impl MicrophoneCapture for MemoryMicrophone {
    fn request_stream(&mut self) -> StreamFuture {
        if !self.allow {
            return Box::pin(async {
                Err(CaptureError::PermissionDenied(
                    "microphone access refused".into(),
                ))
            });
        }
        self.next_stream += 1;
        let stream = CaptureStream::new(self.next_stream);
        Box::pin(async move { Ok(stream) })
    }

    fn start_capture(&mut self, stream: CaptureStream) {
        self.active = Some(stream);
    }

    fn stop_capture(&mut self) -> TakeFuture {
        let take = self.active.take().map(|_| encode_pcm(&self.take));
        Box::pin(async move {
            take.ok_or_else(|| CaptureError::Failed("no capture in progress".into()))
        })
    }
}

/// Builds a [`MemoryEngine`] per track and a [`MemoryMicrophone`] per
/// recordable track.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngineFactory {
    take: Vec<f32>,
}

impl MemoryEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples every memory microphone from this factory will record.
    pub fn with_take(take: Vec<f32>) -> Self {
        Self { take }
    }
}

impl EngineFactory for MemoryEngineFactory {
    fn create_engine(&mut self, track: u64) -> Box<dyn AudioEngine> {
        debug!(track, "Creating memory engine");
        Box::new(MemoryEngine::new())
    }

    fn create_microphone(&mut self, track: u64) -> Box<dyn MicrophoneCapture> {
        debug!(track, "Creating memory microphone");
        Box::new(MemoryMicrophone::new(self.take.clone()))
    }
}
