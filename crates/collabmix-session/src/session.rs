//! The mix session: track collection lifecycle and solo arbitration.

use collabmix_audio::{EngineFactory, WaveformCanvas};
use collabmix_core::{MixConfig, MixError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};
use uuid::Uuid;

use crate::controller::TrackController;
use crate::events::TrackEvent;
use crate::pending::{Completion, CompletionSender, Ticket};
use crate::serialization::{SessionFile, SessionState, TrackState};
use crate::solo::{SoloRequest, SoloSlot};
use crate::track::{Track, TrackId, TrackKind};

/// Resolved output of one track at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSnapshot {
    pub id: TrackId,
    pub name: String,
    /// Whether the engine is told to be audible
    pub effective: bool,
    /// Left and right gain after volume, pan and mute/solo
    pub stereo_gain: (f32, f32),
}

struct TrackEntry {
    track: Track,
    controller: TrackController,
}

/// Owner of every track, its controller and the solo slot.
///
/// All mutation happens through `&mut self` on one control path. Async
/// completions are queued internally and applied by
/// [`poll_completions`](Self::poll_completions) or
/// [`next_event`](Self::next_event).
pub struct MixSession {
    id: Uuid,
    config: Arc<MixConfig>,
    factory: Box<dyn EngineFactory>,
    /// Tracks in creation order
    entries: Vec<TrackEntry>,
    solo: SoloSlot,
    /// Last id handed out
    last_id: u64,
    rng: StdRng,
    completions_tx: CompletionSender,
    completions_rx: UnboundedReceiver<Completion>,
}

impl MixSession {
    /// Create an empty session. Fails if `config` is inconsistent.
    pub fn new(config: MixConfig, factory: impl EngineFactory + 'static) -> Result<Self> {
        Self::with_id(Uuid::new_v4(), config, Box::new(factory))
    }

    fn with_id(id: Uuid, config: MixConfig, factory: Box<dyn EngineFactory>) -> Result<Self> {
        config.validate()?;
        let rng = match config.color_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        info!(session = %id, "Mix session created");
        Ok(Self {
            id,
            config: Arc::new(config),
            factory,
            entries: Vec::new(),
            solo: SoloSlot::EMPTY,
            last_id: 0,
            rng,
            completions_tx,
            completions_rx,
        })
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    // ── Track lifecycle ─────────────────────────────────────────

    /// Add a playback-only track with default name and a palette color.
    pub fn add_track(&mut self) -> TrackId {
        self.add(TrackKind::Playback)
    }

    /// Add a track that can also record from the microphone.
    pub fn add_recordable_track(&mut self) -> TrackId {
        self.add(TrackKind::Recordable)
    }

    fn add(&mut self, kind: TrackKind) -> TrackId {
        self.last_id += 1;
        let id = TrackId::new(self.last_id);
        let name = format!("{} {}", self.config.name_prefix, self.entries.len() + 1);
        let color = self.config.colors.pick(&mut self.rng);
        let track = Track::new(id, name, color, kind);
        self.insert(track);
        id
    }

    fn insert(&mut self, track: Track) {
        let engine = self.factory.create_engine(track.id.raw());
        let microphone = track
            .is_recordable()
            .then(|| self.factory.create_microphone(track.id.raw()));
        let controller = TrackController::new(
            track.id,
            engine,
            microphone,
            Arc::clone(&self.config),
            self.solo,
            self.completions_tx.clone(),
        );
        info!(track = %track.id, name = %track.name, color = %track.color, kind = ?track.kind, "Track added");
        self.entries.push(TrackEntry { track, controller });
    }

    /// Remove a track and release its engine.
    ///
    /// Returns whether a track was removed. Unknown ids are a no-op.
    pub fn remove_track(&mut self, id: TrackId) -> bool {
        let Some(index) = self.position(id) else {
            debug!(track = %id, "Remove ignored, no such track");
            return false;
        };
        let mut entry = self.entries.remove(index);
        entry.controller.dispose();
        info!(track = %id, name = %entry.track.name, "Track removed");

        if self.solo.is(id) {
            self.solo.clear();
            self.broadcast_solo();
        }
        true
    }

    /// Change a track's display name. The solo slot is unaffected.
    pub fn rename_track(&mut self, id: TrackId, name: impl Into<String>) -> bool {
        let Some(entry) = self.entry_mut(id) else {
            debug!(track = %id, "Rename ignored, no such track");
            return false;
        };
        let name = name.into();
        info!(track = %id, from = %entry.track.name, to = %name, "Track renamed");
        entry.track.name = name;
        true
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.entry(id).map(|e| &e.track)
    }

    pub fn controller(&self, id: TrackId) -> Option<&TrackController> {
        self.entry(id).map(|e| &e.controller)
    }

    /// Live tracks in creation order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.entries.iter().map(|e| &e.track)
    }

    pub fn live_ids(&self) -> Vec<TrackId> {
        self.entries.iter().map(|e| e.track.id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Solo ────────────────────────────────────────────────────

    #[inline]
    pub fn solo(&self) -> SoloSlot {
        self.solo
    }

    /// Solo `id`, replacing any current holder. Unknown ids are a no-op.
    pub fn request_solo(&mut self, id: TrackId) -> bool {
        if self.position(id).is_none() {
            debug!(track = %id, "Solo ignored, no such track");
            return false;
        }
        if self.solo.claim(id) {
            info!(track = %id, "Solo claimed");
            self.broadcast_solo();
        }
        true
    }

    /// Solo the first live track currently named `name`.
    ///
    /// Returns the soloed track, or `None` when no track has that name.
    pub fn request_solo_by_name(&mut self, name: &str) -> Option<TrackId> {
        let Some(id) = self
            .entries
            .iter()
            .find(|e| e.track.name == name)
            .map(|e| e.track.id)
        else {
            debug!(name, "Solo ignored, no track with that name");
            return None;
        };
        self.request_solo(id);
        Some(id)
    }

    pub fn clear_solo(&mut self) {
        if self.solo.clear() {
            info!("Solo cleared");
            self.broadcast_solo();
        }
    }

    /// Press `id`'s solo button: claim the slot, or release it if `id`
    /// already holds it.
    pub fn toggle_solo(&mut self, id: TrackId) {
        let Some(entry) = self.entry(id) else {
            debug!(track = %id, "Solo toggle ignored, no such track");
            return;
        };
        match entry.controller.solo_request(self.solo) {
            SoloRequest::Claim(track) => {
                self.request_solo(track);
            }
            SoloRequest::Release => self.clear_solo(),
        }
    }

    /// Tell every live controller to re-derive against the current slot.
    fn broadcast_solo(&mut self) {
        let solo = self.solo;
        for entry in &mut self.entries {
            entry.controller.rederive(solo);
        }
        debug!(soloed = ?solo.get(), tracks = self.entries.len(), "Solo broadcast");
    }

    // ── Per-track controls ──────────────────────────────────────
    //
    // Operations addressed to a removed id are ignored.

    pub fn set_volume(&mut self, id: TrackId, volume: f32) -> Result<()> {
        match self.controller_mut(id) {
            Some(controller) => controller.set_volume(volume),
            None => Ok(()),
        }
    }

    pub fn set_pan(&mut self, id: TrackId, pan: f32) -> Result<()> {
        match self.controller_mut(id) {
            Some(controller) => controller.set_pan(pan),
            None => Ok(()),
        }
    }

    /// Returns the ratio sent to the engine, or `None` for an unknown id.
    pub fn set_playback_rate(&mut self, id: TrackId, bpm: f64) -> Result<Option<f64>> {
        match self.controller_mut(id) {
            Some(controller) => controller.set_playback_rate(bpm).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the track's effective state, or `None` for an unknown id.
    pub fn set_muted(&mut self, id: TrackId, muted: bool) -> Option<bool> {
        let solo = self.solo;
        self.controller_mut(id)
            .map(|controller| controller.set_muted(muted, solo))
    }

    pub fn is_effective(&self, id: TrackId) -> Option<bool> {
        self.controller(id).map(TrackController::is_effective)
    }

    pub fn load_audio(&mut self, id: TrackId, bytes: Vec<u8>) -> Result<Option<Ticket>> {
        match self.controller_mut(id) {
            Some(controller) => controller.load_audio(bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn play(&mut self, id: TrackId) -> bool {
        self.controller_mut(id).is_some_and(TrackController::play)
    }

    pub fn pause(&mut self, id: TrackId) -> bool {
        self.controller_mut(id).is_some_and(TrackController::pause)
    }

    pub fn toggle_playback(&mut self, id: TrackId) -> bool {
        self.controller_mut(id)
            .is_some_and(TrackController::toggle_playback)
    }

    pub fn start_recording(&mut self, id: TrackId) -> Result<bool> {
        match self.controller_mut(id) {
            Some(controller) => controller.start_recording(),
            None => Ok(false),
        }
    }

    pub fn stop_recording(&mut self, id: TrackId) -> Result<bool> {
        match self.controller_mut(id) {
            Some(controller) => controller.stop_recording(),
            None => Ok(false),
        }
    }

    pub fn render_waveform(&mut self, id: TrackId, canvas: &mut WaveformCanvas) -> bool {
        self.controller_mut(id)
            .is_some_and(|controller| controller.render_waveform(canvas))
    }

    /// Resolved output of every live track, in creation order.
    pub fn mix_snapshot(&self) -> Vec<ChannelSnapshot> {
        self.entries
            .iter()
            .map(|e| ChannelSnapshot {
                id: e.track.id,
                name: e.track.name.clone(),
                effective: e.controller.is_effective(),
                stereo_gain: e.controller.mixer_channel().stereo_gain(),
            })
            .collect()
    }

    // ── Completions ─────────────────────────────────────────────

    /// Number of async requests across all tracks still awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.controller.pending_count())
            .sum()
    }

    /// Apply every completion that has already arrived.
    pub fn poll_completions(&mut self) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            events.extend(self.dispatch(completion));
        }
        events
    }

    /// Wait for the next completion that produces an event.
    ///
    /// Returns `None` once no request is left in flight.
    pub async fn next_event(&mut self) -> Option<TrackEvent> {
        loop {
            while let Ok(completion) = self.completions_rx.try_recv() {
                if let Some(event) = self.dispatch(completion) {
                    return Some(event);
                }
            }
            if self.pending_count() == 0 {
                return None;
            }
            let completion = self.completions_rx.recv().await?;
            if let Some(event) = self.dispatch(completion) {
                return Some(event);
            }
        }
    }

    /// Drain completions until nothing is in flight.
    pub async fn settle(&mut self) -> Vec<TrackEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await {
            events.push(event);
        }
        events
    }

    fn dispatch(&mut self, completion: Completion) -> Option<TrackEvent> {
        let solo = self.solo;
        let track = completion.track;
        match self.controller_mut(track) {
            Some(controller) => controller.apply(completion, solo),
            None => {
                debug!(track = %track, ticket = completion.ticket.raw(), "Completion for removed track dropped");
                None
            }
        }
    }

    // ── Persistence ─────────────────────────────────────────────

    /// Capture track identities, controls and the solo slot.
    ///
    /// Loaded audio is not part of the snapshot.
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            tracks: self
                .entries
                .iter()
                .map(|e| {
                    let state = e.controller.state();
                    TrackState {
                        track: e.track.clone(),
                        volume: state.volume,
                        pan: state.pan,
                        bpm: state.bpm.value(),
                        muted: state.muted,
                    }
                })
                .collect(),
            solo: self.solo,
            last_id: self.last_id,
        }
    }

    /// Snapshot wrapped in a versioned session file.
    pub fn to_file(&self) -> SessionFile {
        SessionFile::new(self.id, self.snapshot())
    }

    /// Rebuild a session from a saved file.
    ///
    /// Track ids are kept; new tracks get ids above every saved one.
    pub fn restore(
        file: &SessionFile,
        config: MixConfig,
        factory: impl EngineFactory + 'static,
    ) -> Result<Self> {
        let state = &file.session;
        let mut session = Self::with_id(file.session_id, config, Box::new(factory))?;

        for saved in &state.tracks {
            if session.position(saved.track.id).is_some() {
                return Err(MixError::Serialization(format!(
                    "duplicate track id {} in session file",
                    saved.track.id
                )));
            }
            session.insert(saved.track.clone());
            if let Some(controller) = session.controller_mut(saved.track.id) {
                controller.set_volume(saved.volume)?;
                controller.set_pan(saved.pan)?;
                controller.set_playback_rate(saved.bpm)?;
                controller.set_muted(saved.muted, SoloSlot::EMPTY);
            }
        }

        let highest = state.tracks.iter().map(|t| t.track.id.raw()).max();
        session.last_id = highest.unwrap_or(0).max(state.last_id);

        if let Some(soloed) = state.solo.get() {
            if !session.request_solo(soloed) {
                debug!(track = %soloed, "Saved solo refers to a missing track, dropped");
            }
        }
        info!(session = %session.id, tracks = session.len(), "Mix session restored");
        Ok(session)
    }

    // ── Lookup ──────────────────────────────────────────────────

    fn position(&self, id: TrackId) -> Option<usize> {
        self.entries.iter().position(|e| e.track.id == id)
    }

    fn entry(&self, id: TrackId) -> Option<&TrackEntry> {
        self.entries.iter().find(|e| e.track.id == id)
    }

    fn entry_mut(&mut self, id: TrackId) -> Option<&mut TrackEntry> {
        self.entries.iter_mut().find(|e| e.track.id == id)
    }

    fn controller_mut(&mut self, id: TrackId) -> Option<&mut TrackController> {
        let controller = self.entry_mut(id).map(|e| &mut e.controller);
        if controller.is_none() {
            debug!(track = %id, "Operation ignored, no such track");
        }
        controller
    }
}

impl Drop for MixSession {
    fn drop(&mut self) {
        for entry in &mut self.entries {
            entry.controller.dispose();
        }
        debug!(session = %self.id, "Mix session dropped");
    }
}

impl std::fmt::Debug for MixSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixSession")
            .field("id", &self.id)
            .field("tracks", &self.live_ids())
            .field("solo", &self.solo)
            .field("last_id", &self.last_id)
            .finish_non_exhaustive()
    }
}
