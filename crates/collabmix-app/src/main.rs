//! Collab-Mix - headless multi-track mixer
//!
//! Builds or restores a session, loads a tone into every track, solos the
//! first one and logs the resolved mix.

use anyhow::{Context, Result};
use collabmix_audio::memory::encode_pcm;
use collabmix_audio::{MemoryEngineFactory, WaveformCanvas};
use collabmix_core::MixConfig;
use collabmix_session::{MixSession, SessionFile, TrackId};
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable naming a JSON `MixConfig` file.
const CONFIG_ENV: &str = "COLLABMIX_CONFIG";

const SAMPLE_RATE: u32 = 8_000;
const WAVEFORM_COLUMNS: usize = 48;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Collab-Mix starting...");

    let config = load_config()?;
    let session_path = std::env::args().nth(1).map(PathBuf::from);
    // Memory microphones record a short 660 Hz tone
    let factory = MemoryEngineFactory::with_take(tone(660.0, 0.25));

    let mut session = match session_path.as_deref() {
        Some(path) if path.exists() => {
            let file = SessionFile::load_from_file(path)
                .with_context(|| format!("Failed to read session {}", path.display()))?;
            MixSession::restore(&file, config, factory)?
        }
        _ => demo_session(config, factory)?,
    };

    load_tones(&mut session).await?;
    record_demo_take(&mut session).await?;

    let first = session.live_ids().first().copied();
    if let (Some(first), false) = (first, session.solo().is_active()) {
        session.toggle_solo(first);
    }
    for id in session.live_ids() {
        session.play(id);
    }

    report_mix(&mut session);

    if let Some(path) = session_path {
        save(&session, &path)?;
    }

    info!("Collab-Mix finished");
    Ok(())
}

fn load_config() -> Result<MixConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "Loading config");
            MixConfig::load_from_file(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => Ok(MixConfig::default()),
    }
}

fn demo_session(config: MixConfig, factory: MemoryEngineFactory) -> Result<MixSession> {
    let mut session = MixSession::new(config, factory)?;

    let drums = session.add_track();
    session.rename_track(drums, "Drums");
    session.set_pan(drums, -0.4)?;
    session.set_volume(drums, 0.7)?;

    let vocals = session.add_recordable_track();
    session.rename_track(vocals, "Vocals");
    session.set_pan(vocals, 0.3)?;
    session.set_playback_rate(vocals, 90.0)?;

    Ok(session)
}

/// Load a sine tone into every track, each a harmonic of 220 Hz.
async fn load_tones(session: &mut MixSession) -> Result<()> {
    for (i, id) in session.live_ids().into_iter().enumerate() {
        let frequency = 220.0 * (i + 1) as f32;
        session.load_audio(id, encode_pcm(&tone(frequency, 0.5)))?;
    }
    log_events(session).await;
    Ok(())
}

/// Record one take on the first recordable track, if there is one.
async fn record_demo_take(session: &mut MixSession) -> Result<()> {
    let Some(id) = session
        .tracks()
        .find(|t| t.is_recordable())
        .map(|t| t.id)
    else {
        return Ok(());
    };
    if session.start_recording(id)? {
        log_events(session).await;
        session.stop_recording(id)?;
        log_events(session).await;
    }
    Ok(())
}

async fn log_events(session: &mut MixSession) {
    for event in session.settle().await {
        if event.is_failure() {
            warn!(track = %event.track(), ?event, "Track operation failed");
        } else {
            info!(track = %event.track(), ?event, "Track event");
        }
    }
}

fn report_mix(session: &mut MixSession) {
    let soloed = session.solo().get();
    for channel in session.mix_snapshot() {
        let (left, right) = channel.stereo_gain;
        info!(
            track = %channel.id,
            name = %channel.name,
            soloed = soloed == Some(channel.id),
            effective = channel.effective,
            left,
            right,
            "Channel"
        );
        log_waveform(session, channel.id);
    }
}

fn log_waveform(session: &mut MixSession, id: TrackId) {
    let mut canvas = WaveformCanvas::new(WAVEFORM_COLUMNS);
    if !session.render_waveform(id, &mut canvas) {
        return;
    }
    let peak = canvas
        .peaks()
        .iter()
        .map(|s| s.peak())
        .fold(0.0_f32, f32::max);
    info!(track = %id, columns = canvas.width(), peak, "Waveform");
}

fn save(session: &MixSession, path: &Path) -> Result<()> {
    session
        .to_file()
        .save_to_file(path)
        .with_context(|| format!("Failed to save session {}", path.display()))?;
    info!(path = %path.display(), "Session saved");
    Ok(())
}

/// Mono sine tone at `frequency` Hz lasting `seconds`.
fn tone(frequency: f32, seconds: f32) -> Vec<f32> {
    let len = (SAMPLE_RATE as f32 * seconds) as usize;
    (0..len)
        .map(|n| 0.5 * (TAU * frequency * n as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}
