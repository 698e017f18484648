//! Integration tests for the recordable track variant.

use collabmix_core::{CaptureError, MixConfig, MixError};
use collabmix_session::{MixSession, TrackEvent};

use crate::fakes::Rig;

fn session(rig: &Rig) -> MixSession {
    MixSession::new(MixConfig::default(), rig.clone()).unwrap()
}

#[tokio::test]
async fn record_cycle_loads_the_take() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();

    assert!(session.start_recording(mic).unwrap());
    let events = session.settle().await;
    assert_eq!(events, vec![TrackEvent::RecordingStarted { track: mic }]);
    assert!(session.controller(mic).unwrap().state().is_recording);
    assert!(rig.microphone(mic).capturing.is_some());

    assert!(session.stop_recording(mic).unwrap());
    let events = session.settle().await;
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0],
        TrackEvent::RecordingCaptured {
            track: mic,
            bytes: 16
        }
    );
    assert!(matches!(events[1], TrackEvent::AudioLoaded { track, .. } if track == mic));

    let state = session.controller(mic).unwrap().state();
    assert!(!state.is_recording);
    assert!(state.loaded_audio.is_some());
    assert_eq!(session.is_effective(mic), Some(true));
}

#[tokio::test]
async fn start_while_recording_is_noop() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();

    assert!(session.start_recording(mic).unwrap());
    // Still requesting
    assert!(!session.start_recording(mic).unwrap());
    session.settle().await;
    // Now capturing
    assert!(!session.start_recording(mic).unwrap());
    assert_eq!(rig.microphone(mic).requests, 1);
}

#[tokio::test]
async fn stop_while_idle_is_noop() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();

    assert!(!session.stop_recording(mic).unwrap());
    assert_eq!(rig.microphone(mic).stops, 0);
    assert!(session.settle().await.is_empty());
}

#[tokio::test]
async fn permission_denied_is_reported_once() {
    let rig = Rig::denying();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();
    let other = session.add_track();

    session.start_recording(mic).unwrap();
    let events = session.settle().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        TrackEvent::CaptureDenied {
            error: CaptureError::PermissionDenied(_),
            ..
        }
    ));
    assert!(!session.controller(mic).unwrap().state().is_recording);
    // The session and other tracks are untouched
    assert_eq!(session.live_ids(), vec![mic, other]);
}

#[test]
fn playback_track_cannot_record() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let plain = session.add_track();

    assert!(matches!(
        session.start_recording(plain),
        Err(MixError::NotRecordable(_))
    ));
    assert!(rig.microphone(plain).requests == 0);
}

#[tokio::test]
async fn stop_during_stream_request_cancels_it() {
    let rig = Rig::gated();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();

    session.start_recording(mic).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(session.pending_count(), 1);

    assert!(session.stop_recording(mic).unwrap());
    assert_eq!(session.pending_count(), 0);

    // A late grant finds nobody waiting
    rig.release_stream(mic);
    tokio::task::yield_now().await;
    assert!(session.poll_completions().is_empty());
    assert!(!session.controller(mic).unwrap().state().is_recording);
    assert_eq!(rig.microphone(mic).capturing, None);
}

#[tokio::test]
async fn removing_track_while_recording_stops_capture() {
    let rig = Rig::immediate();
    let mut session = session(&rig);
    let mic = session.add_recordable_track();

    session.start_recording(mic).unwrap();
    session.settle().await;
    assert!(rig.microphone(mic).capturing.is_some());

    session.remove_track(mic);
    assert_eq!(rig.microphone(mic).capturing, None);
    assert_eq!(rig.engine(mic).disposals, 1);
    assert!(session.settle().await.is_empty());
}
