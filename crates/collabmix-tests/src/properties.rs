//! Property tests over arbitrary operation sequences.

use collabmix_core::MixConfig;
use collabmix_session::{MixSession, TrackId};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

use crate::fakes::Rig;

#[derive(Debug, Clone)]
enum Op {
    Add,
    AddRecordable,
    /// Index into the ids created so far, live or not
    Remove(usize),
    ToggleSolo(usize),
    Mute(usize, bool),
    Rename(usize, u8),
    SoloByName(u8),
    Load(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::Add),
        1 => Just(Op::AddRecordable),
        2 => (0..16usize).prop_map(Op::Remove),
        3 => (0..16usize).prop_map(Op::ToggleSolo),
        2 => (0..16usize, any::<bool>()).prop_map(|(i, m)| Op::Mute(i, m)),
        1 => (0..16usize, 0..4u8).prop_map(|(i, n)| Op::Rename(i, n)),
        1 => (0..4u8).prop_map(Op::SoloByName),
        2 => (0..16usize).prop_map(Op::Load),
    ]
}

/// Expected per-track facts the session must agree with.
#[derive(Default)]
struct Model {
    created: Vec<TrackId>,
    removed: BTreeSet<TrackId>,
    muted: BTreeMap<TrackId, bool>,
    loaded: BTreeSet<TrackId>,
}

impl Model {
    fn pick(&self, i: usize) -> Option<TrackId> {
        if self.created.is_empty() {
            None
        } else {
            Some(self.created[i % self.created.len()])
        }
    }

    fn live(&self) -> Vec<TrackId> {
        self.created
            .iter()
            .copied()
            .filter(|id| !self.removed.contains(id))
            .collect()
    }
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let rig = Rig::immediate();
    let mut session = MixSession::new(MixConfig::default(), rig.clone())
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let mut model = Model::default();

    for op in ops {
        match op {
            Op::Add => model.created.push(session.add_track()),
            Op::AddRecordable => model.created.push(session.add_recordable_track()),
            Op::Remove(i) => {
                if let Some(id) = model.pick(i) {
                    let was_live = !model.removed.contains(&id);
                    prop_assert_eq!(session.remove_track(id), was_live);
                    model.removed.insert(id);
                }
            }
            Op::ToggleSolo(i) => {
                if let Some(id) = model.pick(i) {
                    session.toggle_solo(id);
                }
            }
            Op::Mute(i, muted) => {
                if let Some(id) = model.pick(i) {
                    if session.set_muted(id, muted).is_some() {
                        model.muted.insert(id, muted);
                    }
                }
            }
            Op::Rename(i, n) => {
                if let Some(id) = model.pick(i) {
                    session.rename_track(id, format!("Name {n}"));
                }
            }
            Op::SoloByName(n) => {
                let name = format!("Name {n}");
                let expected = session.tracks().find(|t| t.name == name).map(|t| t.id);
                prop_assert_eq!(session.request_solo_by_name(&name), expected);
            }
            Op::Load(i) => {
                if let Some(id) = model.pick(i) {
                    if session
                        .load_audio(id, vec![0; 4])
                        .map_err(|e| TestCaseError::fail(e.to_string()))?
                        .is_some()
                    {
                        model.loaded.insert(id);
                    }
                    session.settle().await;
                }
            }
        }
        check(&session, &model, &rig)?;
    }
    Ok(())
}

fn check(session: &MixSession, model: &Model, rig: &Rig) -> Result<(), TestCaseError> {
    // Live ids are exactly those added minus those removed, in order
    let live = model.live();
    prop_assert_eq!(session.live_ids(), live.clone());

    // At most one soloed track, and it is alive
    let soloed = session.solo().get();
    if let Some(id) = soloed {
        prop_assert!(live.contains(&id));
    }
    let holders = live.iter().filter(|&&id| session.solo().is(id)).count();
    prop_assert!(holders <= 1);

    // Effective state matches the derivation rule, and the engine agrees
    for &id in &live {
        let muted = model.muted.get(&id).copied().unwrap_or(false);
        let expected = model.loaded.contains(&id) && !muted && soloed.map_or(true, |s| s == id);
        prop_assert_eq!(session.is_effective(id), Some(expected));
        prop_assert_eq!(rig.engine(id).muted, Some(!expected));
    }

    // Every removed engine was disposed exactly once
    for id in &model.removed {
        prop_assert_eq!(rig.engine(*id).disposals, 1);
    }
    Ok(())
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn session_invariants_hold(ops in prop::collection::vec(op(), 0..40)) {
        runtime().block_on(run(ops))?;
    }

    #[test]
    fn playback_ratio_tracks_clamped_bpm(bpm in -1000.0f64..1000.0) {
        let rig = Rig::immediate();
        let mut session = MixSession::new(MixConfig::default(), rig.clone()).unwrap();
        let id = session.add_track();
        let ratio = session.set_playback_rate(id, bpm).unwrap();
        let expected = bpm.clamp(60.0, 180.0) / 120.0;
        prop_assert_eq!(ratio, Some(expected));
        prop_assert_eq!(rig.engine(id).rate, Some(expected));
    }

    #[test]
    fn volume_and_pan_stay_in_range(volume in -10.0f32..10.0, pan in -10.0f32..10.0) {
        let rig = Rig::immediate();
        let mut session = MixSession::new(MixConfig::default(), rig.clone()).unwrap();
        let id = session.add_track();
        session.set_volume(id, volume).unwrap();
        session.set_pan(id, pan).unwrap();
        let state = *session.controller(id).unwrap().state();
        prop_assert!((0.0..=1.0).contains(&state.volume));
        prop_assert!((-1.0..=1.0).contains(&state.pan));
    }
}
