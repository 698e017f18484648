//! Integration tests for track lifecycle and per-track controls.

use collabmix_audio::WaveformCanvas;
use collabmix_core::{ColorScheme, MixConfig, MixError, TrackColor};
use collabmix_session::{MixSession, TrackEvent, TrackId, TrackKind};

use crate::fakes::Rig;

fn config() -> MixConfig {
    MixConfig {
        color_seed: Some(42),
        ..MixConfig::default()
    }
}

fn session(rig: &Rig) -> MixSession {
    MixSession::new(config(), rig.clone()).unwrap()
}

// ── Creation ────────────────────────────────────────────────────

#[test]
fn new_track_pushes_initial_state_to_engine() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let id = session.add_track();

    let log = rig.engine(id);
    assert_eq!(log.volume, Some(0.5));
    assert_eq!(log.pan, Some(0.0));
    assert_eq!(log.rate, Some(1.0));
    // Nothing loaded yet, so the engine starts muted
    assert_eq!(log.muted, Some(true));
    assert_eq!(session.is_effective(id), Some(false));
}

#[test]
fn tracks_are_listed_in_creation_order() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    let b = session.add_recordable_track();
    let c = session.add_track();

    let kinds: Vec<_> = session.tracks().map(|t| (t.id, t.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            (a, TrackKind::Playback),
            (b, TrackKind::Recordable),
            (c, TrackKind::Playback)
        ]
    );
    assert_eq!(rig.engines_created(), 3);
}

#[test]
fn colors_come_from_configured_palette() {
    let rig = Rig::immediate();
    let palette = vec![TrackColor::CORAL, TrackColor::TEAL];
    let config = MixConfig {
        colors: ColorScheme::Palette(palette.clone()),
        color_seed: Some(1),
        ..MixConfig::default()
    };
    let mut session = MixSession::new(config, rig).unwrap();
    for _ in 0..16 {
        let id = session.add_track();
        assert!(palette.contains(&session.track(id).unwrap().color));
    }
}

#[test]
fn seeded_colors_are_reproducible() {
    let pick = || {
        let mut session = session(&Rig::immediate());
        (0..6)
            .map(|_| {
                let id = session.add_track();
                session.track(id).unwrap().color
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(pick(), pick());
}

#[test]
fn invalid_config_is_rejected() {
    let config = MixConfig {
        min_bpm: 200.0,
        max_bpm: 100.0,
        ..MixConfig::default()
    };
    let result = MixSession::new(config, Rig::immediate());
    assert!(matches!(result, Err(MixError::Config(_))));
}

// ── Removal ─────────────────────────────────────────────────────

#[test]
fn remove_disposes_engine_exactly_once() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    let b = session.add_track();

    assert!(session.remove_track(a));
    assert!(!session.remove_track(a));
    assert_eq!(rig.engine(a).disposals, 1);
    assert_eq!(rig.engine(b).disposals, 0);

    drop(session);
    assert_eq!(rig.engine(a).disposals, 1);
    assert_eq!(rig.engine(b).disposals, 1);
}

#[test]
fn remove_unknown_id_leaves_session_unchanged() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    let b = session.add_track();
    session.toggle_solo(b);

    assert!(!session.remove_track(TrackId::new(77)));
    assert_eq!(session.live_ids(), vec![a, b]);
    assert!(session.solo().is(b));
}

#[test]
fn ids_are_never_reused() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    session.remove_track(a);
    let b = session.add_track();
    assert_ne!(a, b);
    assert!(session.track(a).is_none());
}

#[test]
fn operations_on_removed_track_are_ignored() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    session.remove_track(a);

    assert!(session.set_volume(a, 0.9).is_ok());
    assert!(!session.rename_track(a, "Ghost"));
    assert_eq!(session.load_audio(a, vec![1, 2, 3, 4]).unwrap(), None);
    assert!(!session.play(a));
    assert_eq!(rig.engine(a).volume, Some(0.5));
}

// ── Controls ────────────────────────────────────────────────────

#[test]
fn controls_forward_to_engine() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    session.set_volume(a, 0.8).unwrap();
    session.set_pan(a, -0.6).unwrap();
    assert_eq!(session.set_playback_rate(a, 60.0).unwrap(), Some(0.5));

    let log = rig.engine(a);
    assert_eq!(log.volume, Some(0.8));
    assert_eq!(log.pan, Some(-0.6));
    assert_eq!(log.rate, Some(0.5));
}

#[test]
fn out_of_range_controls_are_clamped() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    session.set_volume(a, 4.0).unwrap();
    session.set_pan(a, 2.0).unwrap();
    assert_eq!(session.set_playback_rate(a, 10.0).unwrap(), Some(0.5));

    let log = rig.engine(a);
    assert_eq!(log.volume, Some(1.0));
    assert_eq!(log.pan, Some(1.0));
}

#[test]
fn non_finite_controls_are_rejected() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    assert!(matches!(
        session.set_volume(a, f32::NAN),
        Err(MixError::InvalidParameter(_))
    ));
    assert!(session.set_playback_rate(a, f64::INFINITY).is_err());
    assert_eq!(rig.engine(a).volume, Some(0.5));
    assert_eq!(rig.engine(a).rate, Some(1.0));
}

#[tokio::test]
async fn load_then_play_pause() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    assert!(!session.play(a));
    session.load_audio(a, vec![0; 8]).unwrap();
    let events = session.settle().await;
    let [TrackEvent::AudioLoaded { handle, .. }] = events.as_slice() else {
        panic!("expected AudioLoaded, got {events:?}");
    };

    assert!(session.play(a));
    assert_eq!(rig.engine(a).playing, Some(*handle));
    assert_eq!(rig.engine(a).muted, Some(false));
    assert!(session.pause(a));
    assert_eq!(rig.engine(a).playing, None);
    assert!(session.toggle_playback(a));

    let mut canvas = WaveformCanvas::new(2);
    assert!(session.render_waveform(a, &mut canvas));
    assert_eq!(rig.engine(a).renders, 1);
}

#[tokio::test]
async fn new_audio_stops_previous_playback() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    session.load_audio(a, vec![0; 4]).unwrap();
    session.settle().await;
    let first = session.controller(a).unwrap().state().loaded_audio.unwrap();
    session.play(a);

    session.load_audio(a, vec![0; 4]).unwrap();
    session.settle().await;
    let state = session.controller(a).unwrap().state();
    assert_ne!(state.loaded_audio, Some(first));
    assert!(!state.is_playing);
    assert_eq!(rig.engine(a).stopped, vec![first]);
}

#[tokio::test]
async fn empty_audio_reports_decode_failure() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();

    session.load_audio(a, Vec::new()).unwrap();
    let events = session.settle().await;
    assert_eq!(events.len(), 1);
    assert!(events[0].is_failure());
    assert_eq!(session.controller(a).unwrap().state().loaded_audio, None);
    assert_eq!(session.is_effective(a), Some(false));
}

#[tokio::test]
async fn mix_snapshot_reflects_pan_and_mute() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let a = session.add_track();
    let b = session.add_track();
    session.load_audio(a, vec![0; 4]).unwrap();
    session.load_audio(b, vec![0; 4]).unwrap();
    session.settle().await;

    session.set_pan(a, -1.0).unwrap();
    session.set_muted(b, true);

    let mix = session.mix_snapshot();
    assert_eq!(mix.len(), 2);
    let (left, right) = mix[0].stereo_gain;
    assert!(left > 0.0);
    assert!(right.abs() < 1e-6);
    assert!(!mix[1].effective);
    assert_eq!(mix[1].stereo_gain, (0.0, 0.0));
}

#[tokio::test]
async fn play_is_ignored_while_reloading() {
    let rig = Rig::gated();
    let mut session = session(&rig);
    let a = session.add_track();

    session.load_audio(a, vec![0; 4]).unwrap();
    let first = rig.release_load(a).unwrap();
    session.settle().await;

    session.load_audio(a, vec![0; 4]).unwrap();
    assert!(session.controller(a).unwrap().is_loading());
    assert!(!session.play(a));
    assert!(!session.controller(a).unwrap().state().is_playing);
    assert_eq!(rig.engine(a).playing, None);

    let second = rig.release_load(a).unwrap();
    session.settle().await;
    assert_ne!(first, second);
    assert!(session.play(a));
    assert_eq!(rig.engine(a).playing, Some(second));
}
