//! Per-track control state and its engine.
//!
//! A [`TrackController`] owns one track's volume, pan, tempo, mute flag,
//! loaded audio and recording state, and derives the effective audible
//! state from those plus the session's solo slot. Async work (decode,
//! microphone request, take finalize) is spawned as a [`Pending`] request
//! whose completion the session hands back through [`TrackController::apply`].

use collabmix_audio::{
    AudioEngine, AudioHandle, CaptureStream, MicrophoneCapture, MixerChannel, WaveformCanvas,
};
use collabmix_core::ranges::{PAN_MAX, PAN_MIN, VOLUME_MAX, VOLUME_MIN};
use collabmix_core::{Bpm, CaptureError, DecodeError, MixConfig, MixError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::events::TrackEvent;
use crate::pending::{
    current_runtime, CancelToken, Completion, CompletionSender, Outcome, Pending, Ticket,
};
use crate::solo::{SoloRequest, SoloSlot};
use crate::track::{TrackId, TrackKind};

/// User-facing control values of one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackControlState {
    /// Normalized gain, 0.0 to 1.0
    pub volume: f32,
    /// -1.0 (left) to 1.0 (right)
    pub pan: f32,
    /// Tempo control value
    pub bpm: Bpm,
    /// `bpm` relative to the session's reference tempo
    pub playback_rate: f64,
    /// User intent, independent of solo
    pub muted: bool,
    pub loaded_audio: Option<AudioHandle>,
    pub is_playing: bool,
    pub is_recording: bool,
}

impl TrackControlState {
    /// Initial state of a new track under `config`.
    pub fn from_config(config: &MixConfig) -> Self {
        let bpm = Bpm::clamped(config.default_bpm, config).unwrap_or_default();
        Self {
            volume: config.default_volume.clamp(VOLUME_MIN, VOLUME_MAX),
            pan: config.default_pan.clamp(PAN_MIN, PAN_MAX),
            bpm,
            playback_rate: bpm.ratio_to(config.reference()),
            muted: false,
            loaded_audio: None,
            is_playing: false,
            is_recording: false,
        }
    }
}

/// Where a recordable track is in its record cycle.
#[derive(Debug)]
enum RecordState {
    Idle,
    /// Waiting for the microphone stream.
    Requesting(Pending),
    Recording(CaptureStream),
    /// Waiting for the take's bytes.
    Finalizing(Pending),
}

struct Recorder {
    microphone: Box<dyn MicrophoneCapture>,
    state: RecordState,
}

/// Playback-only tracks carry no microphone at all.
enum Capability {
    Playback,
    Recordable(Recorder),
}

/// Controller for a single track.
pub struct TrackController {
    track: TrackId,
    state: TrackControlState,
    effective: bool,
    engine: Box<dyn AudioEngine>,
    capability: Capability,
    config: Arc<MixConfig>,
    pending_load: Option<Pending>,
    next_ticket: u64,
    completions: CompletionSender,
    disposed: bool,
}

impl TrackController {
    /// Build a controller and push its initial state to `engine`.
    ///
    /// A controller with a `microphone` is recordable.
    pub(crate) fn new(
        track: TrackId,
        engine: Box<dyn AudioEngine>,
        microphone: Option<Box<dyn MicrophoneCapture>>,
        config: Arc<MixConfig>,
        solo: SoloSlot,
        completions: CompletionSender,
    ) -> Self {
        let capability = match microphone {
            Some(microphone) => Capability::Recordable(Recorder {
                microphone,
                state: RecordState::Idle,
            }),
            None => Capability::Playback,
        };
        let mut controller = Self {
            track,
            state: TrackControlState::from_config(&config),
            effective: false,
            engine,
            capability,
            config,
            pending_load: None,
            next_ticket: 0,
            completions,
            disposed: false,
        };
        controller.engine.set_volume(controller.state.volume);
        controller.engine.set_pan(controller.state.pan);
        controller
            .engine
            .set_playback_rate(controller.state.playback_rate);
        controller.rederive(solo);
        controller
    }

    #[inline]
    pub fn id(&self) -> TrackId {
        self.track
    }

    #[inline]
    pub fn state(&self) -> &TrackControlState {
        &self.state
    }

    pub fn kind(&self) -> TrackKind {
        match self.capability {
            Capability::Playback => TrackKind::Playback,
            Capability::Recordable(_) => TrackKind::Recordable,
        }
    }

    /// Whether the engine is currently told to be audible.
    #[inline]
    pub fn is_effective(&self) -> bool {
        self.effective
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Whether a decode is in flight.
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Number of async requests still waiting on a completion.
    pub fn pending_count(&self) -> usize {
        let recording = match &self.capability {
            Capability::Recordable(Recorder {
                state: RecordState::Requesting(_) | RecordState::Finalizing(_),
                ..
            }) => 1,
            _ => 0,
        };
        usize::from(self.pending_load.is_some()) + recording
    }

    /// Resolved output of this track as a mixer channel.
    pub fn mixer_channel(&self) -> MixerChannel {
        MixerChannel {
            volume: self.state.volume,
            pan: self.state.pan,
            audible: self.effective,
        }
    }

    // ── Controls ────────────────────────────────────────────────

    /// Set the normalized gain. Out-of-range values are clamped.
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        if !volume.is_finite() {
            return Err(MixError::non_finite("volume", f64::from(volume)));
        }
        let volume = volume.clamp(VOLUME_MIN, VOLUME_MAX);
        self.state.volume = volume;
        self.engine.set_volume(volume);
        debug!(track = %self.track, volume, "Volume set");
        Ok(())
    }

    /// Set the pan position. Out-of-range values are clamped.
    pub fn set_pan(&mut self, pan: f32) -> Result<()> {
        if !pan.is_finite() {
            return Err(MixError::non_finite("pan", f64::from(pan)));
        }
        let pan = pan.clamp(PAN_MIN, PAN_MAX);
        self.state.pan = pan;
        self.engine.set_pan(pan);
        debug!(track = %self.track, pan, "Pan set");
        Ok(())
    }

    /// Set the tempo control and forward the resulting ratio.
    ///
    /// Returns the playback-rate ratio sent to the engine.
    pub fn set_playback_rate(&mut self, bpm: f64) -> Result<f64> {
        let bpm = Bpm::clamped(bpm, &self.config)?;
        let ratio = bpm.ratio_to(self.config.reference());
        self.state.bpm = bpm;
        self.state.playback_rate = ratio;
        self.engine.set_playback_rate(ratio);
        debug!(track = %self.track, bpm = bpm.value(), ratio, "Playback rate set");
        Ok(ratio)
    }

    /// Store the user mute flag and re-derive. Returns the effective state.
    pub fn set_muted(&mut self, muted: bool, solo: SoloSlot) -> bool {
        self.state.muted = muted;
        self.rederive(solo)
    }

    /// What pressing this track's solo button asks of the slot.
    pub fn solo_request(&self, solo: SoloSlot) -> SoloRequest {
        if solo.is(self.track) {
            SoloRequest::Release
        } else {
            SoloRequest::Claim(self.track)
        }
    }

    /// Recompute the effective audible state and push it to the engine.
    pub fn rederive(&mut self, solo: SoloSlot) -> bool {
        if self.disposed {
            return false;
        }
        let effective =
            self.state.loaded_audio.is_some() && !self.state.muted && solo.admits(self.track);
        self.effective = effective;
        self.engine.set_muted(!effective);
        effective
    }

    // ── Transport ───────────────────────────────────────────────

    /// Hand `bytes` to the engine for decoding.
    ///
    /// Supersedes any decode already in flight. The result arrives later as
    /// a [`TrackEvent::AudioLoaded`] or [`TrackEvent::DecodeFailed`].
    pub fn load_audio(&mut self, bytes: Vec<u8>) -> Result<Ticket> {
        if self.disposed {
            return Err(MixError::NotFound(format!("track {} is disposed", self.track)));
        }
        let ticket = self.issue_ticket();
        let len = bytes.len();
        let decode = self.engine.load(bytes);
        let pending = Pending::spawn(
            self.track,
            ticket,
            decode,
            Outcome::Decoded,
            Outcome::decode_lost,
            &self.completions,
        )?;
        if let Some(previous) = self.pending_load.replace(pending) {
            debug!(
                track = %self.track,
                superseded = previous.ticket().raw(),
                "Superseding in-flight decode"
            );
        }
        info!(track = %self.track, ticket = ticket.raw(), bytes = len, "Loading audio");
        Ok(ticket)
    }

    /// Start playback. Returns whether the track is now playing.
    ///
    /// A no-op while nothing is loaded or a decode is in flight.
    pub fn play(&mut self) -> bool {
        let Some(handle) = self.playable() else {
            debug!(track = %self.track, "Play ignored, no audio loaded");
            return false;
        };
        if self.state.is_playing {
            return true;
        }
        if self.is_loading() {
            debug!(track = %self.track, "Play ignored, audio still loading");
            return false;
        }
        self.engine.play(handle);
        self.state.is_playing = true;
        debug!(track = %self.track, %handle, "Playing");
        true
    }

    /// Pause playback. Returns whether anything was paused.
    pub fn pause(&mut self) -> bool {
        let Some(handle) = self.playable() else {
            return false;
        };
        if !self.state.is_playing {
            return false;
        }
        self.engine.pause(handle);
        self.state.is_playing = false;
        debug!(track = %self.track, %handle, "Paused");
        true
    }

    /// Play if paused, pause if playing. Returns whether the track is playing.
    pub fn toggle_playback(&mut self) -> bool {
        if self.state.is_playing {
            self.pause();
        } else {
            self.play();
        }
        self.state.is_playing
    }

    /// Draw the loaded audio into `canvas`. Returns whether anything was drawn.
    pub fn render_waveform(&mut self, canvas: &mut WaveformCanvas) -> bool {
        match self.playable() {
            Some(handle) => {
                self.engine.render_waveform(handle, canvas);
                true
            }
            None => false,
        }
    }

    fn playable(&self) -> Option<AudioHandle> {
        if self.disposed {
            None
        } else {
            self.state.loaded_audio
        }
    }

    // ── Recording ───────────────────────────────────────────────

    /// Ask the microphone for a stream.
    ///
    /// Returns `Ok(false)` when a recording is already requested, running or
    /// finalizing. Fails with `NotRecordable` on a playback-only track.
    pub fn start_recording(&mut self) -> Result<bool> {
        let track = self.track;
        let ticket = Ticket::new(self.next_ticket + 1);
        let Capability::Recordable(recorder) = &mut self.capability else {
            return Err(MixError::NotRecordable(format!("track {track}")));
        };
        if self.disposed {
            return Ok(false);
        }
        if !matches!(recorder.state, RecordState::Idle) {
            debug!(track = %track, "Start recording ignored, already recording");
            return Ok(false);
        }
        let request = recorder.microphone.request_stream();
        let pending = Pending::spawn(
            track,
            ticket,
            request,
            Outcome::StreamGranted,
            Outcome::stream_lost,
            &self.completions,
        )?;
        recorder.state = RecordState::Requesting(pending);
        self.next_ticket = ticket.raw();
        info!(track = %track, ticket = ticket.raw(), "Requesting microphone");
        Ok(true)
    }

    /// Stop recording and finalize the take.
    ///
    /// While the stream request is still pending this cancels it. Returns
    /// `Ok(false)` when nothing was recording.
    pub fn stop_recording(&mut self) -> Result<bool> {
        let track = self.track;
        let ticket = Ticket::new(self.next_ticket + 1);
        let Capability::Recordable(recorder) = &mut self.capability else {
            return Err(MixError::NotRecordable(format!("track {track}")));
        };
        match std::mem::replace(&mut recorder.state, RecordState::Idle) {
            RecordState::Idle => {
                debug!(track = %track, "Stop recording ignored, not recording");
                Ok(false)
            }
            RecordState::Requesting(request) => {
                drop(request);
                info!(track = %track, "Microphone request cancelled");
                Ok(true)
            }
            RecordState::Recording(stream) => {
                // Without a runtime the take could not be finalized; keep capturing
                let runtime = match current_runtime() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        recorder.state = RecordState::Recording(stream);
                        return Err(e);
                    }
                };
                self.state.is_recording = false;
                let take = recorder.microphone.stop_capture();
                let pending = Pending::spawn_on(
                    &runtime,
                    track,
                    ticket,
                    take,
                    Outcome::TakeFinished,
                    Outcome::take_lost,
                    &self.completions,
                );
                recorder.state = RecordState::Finalizing(pending);
                self.next_ticket = ticket.raw();
                info!(track = %track, %stream, "Recording stopped, finalizing take");
                Ok(true)
            }
            finalizing @ RecordState::Finalizing(_) => {
                recorder.state = finalizing;
                debug!(track = %track, "Stop recording ignored, take already finalizing");
                Ok(false)
            }
        }
    }

    // ── Completions ─────────────────────────────────────────────

    /// Apply a finished async request on the control path.
    ///
    /// Completions that were cancelled, superseded or arrive after disposal
    /// are dropped and yield `None`.
    pub(crate) fn apply(&mut self, completion: Completion, solo: SoloSlot) -> Option<TrackEvent> {
        let Completion {
            ticket,
            token,
            outcome,
            ..
        } = completion;
        if self.disposed {
            debug!(track = %self.track, ticket = ticket.raw(), "Completion after disposal dropped");
            return None;
        }
        match outcome {
            Outcome::Decoded(result) => self.apply_decoded(ticket, &token, result, solo),
            Outcome::StreamGranted(result) => self.apply_stream(ticket, &token, result),
            Outcome::TakeFinished(result) => self.apply_take(ticket, &token, result),
        }
    }

    fn apply_decoded(
        &mut self,
        ticket: Ticket,
        token: &CancelToken,
        result: std::result::Result<AudioHandle, DecodeError>,
        solo: SoloSlot,
    ) -> Option<TrackEvent> {
        match &self.pending_load {
            Some(pending) if pending.accepts(ticket, token) => {}
            _ => {
                debug!(track = %self.track, ticket = ticket.raw(), "Stale decode dropped");
                return None;
            }
        }
        self.pending_load = None;

        match result {
            Ok(handle) => {
                if let Some(previous) = self.state.loaded_audio.replace(handle) {
                    if self.state.is_playing {
                        self.engine.stop(previous);
                        self.state.is_playing = false;
                    }
                }
                self.rederive(solo);
                info!(track = %self.track, %handle, "Audio loaded");
                Some(TrackEvent::AudioLoaded {
                    track: self.track,
                    handle,
                })
            }
            Err(error) => {
                warn!(track = %self.track, %error, "Decode failed");
                Some(TrackEvent::DecodeFailed {
                    track: self.track,
                    error,
                })
            }
        }
    }

    fn apply_stream(
        &mut self,
        ticket: Ticket,
        token: &CancelToken,
        result: std::result::Result<CaptureStream, CaptureError>,
    ) -> Option<TrackEvent> {
        let track = self.track;
        let Capability::Recordable(recorder) = &mut self.capability else {
            return None;
        };
        match &recorder.state {
            RecordState::Requesting(pending) if pending.accepts(ticket, token) => {}
            _ => {
                debug!(track = %track, ticket = ticket.raw(), "Stale stream grant dropped");
                return None;
            }
        }

        match result {
            Ok(stream) => {
                recorder.microphone.start_capture(stream);
                recorder.state = RecordState::Recording(stream);
                self.state.is_recording = true;
                info!(track = %track, %stream, "Recording started");
                Some(TrackEvent::RecordingStarted { track })
            }
            Err(error) => {
                recorder.state = RecordState::Idle;
                warn!(track = %track, %error, "Microphone unavailable");
                Some(TrackEvent::CaptureDenied { track, error })
            }
        }
    }

    fn apply_take(
        &mut self,
        ticket: Ticket,
        token: &CancelToken,
        result: std::result::Result<Vec<u8>, CaptureError>,
    ) -> Option<TrackEvent> {
        let track = self.track;
        let Capability::Recordable(recorder) = &mut self.capability else {
            return None;
        };
        match &recorder.state {
            RecordState::Finalizing(pending) if pending.accepts(ticket, token) => {}
            _ => {
                debug!(track = %track, ticket = ticket.raw(), "Stale take dropped");
                return None;
            }
        }
        recorder.state = RecordState::Idle;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(track = %track, %error, "Take could not be finalized");
                return Some(TrackEvent::CaptureFailed { track, error });
            }
        };
        let len = bytes.len();
        match self.load_audio(bytes) {
            Ok(_) => {
                info!(track = %track, bytes = len, "Take captured");
                Some(TrackEvent::RecordingCaptured { track, bytes: len })
            }
            Err(e) => {
                let error = CaptureError::Failed(e.to_string());
                warn!(track = %track, %error, "Take could not be decoded");
                Some(TrackEvent::CaptureFailed { track, error })
            }
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket::new(self.next_ticket)
    }

    // ── Teardown ────────────────────────────────────────────────

    /// Cancel in-flight work, stop playback and release the engine.
    ///
    /// The engine's `dispose` runs exactly once; later calls do nothing.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.pending_load = None;

        if let Capability::Recordable(recorder) = &mut self.capability {
            if let RecordState::Recording(_) = recorder.state {
                // The take is discarded, the future is never polled.
                drop(recorder.microphone.stop_capture());
            }
            recorder.state = RecordState::Idle;
        }
        if let (Some(handle), true) = (self.state.loaded_audio, self.state.is_playing) {
            self.engine.stop(handle);
        }
        self.state.is_playing = false;
        self.state.is_recording = false;
        self.effective = false;
        self.engine.dispose();
        info!(track = %self.track, "Track controller disposed");
    }
}

impl Drop for TrackController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for TrackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackController")
            .field("track", &self.track)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("effective", &self.effective)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
