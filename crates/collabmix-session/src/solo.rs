//! The session-wide solo slot.

use serde::{Deserialize, Serialize};

use crate::track::TrackId;

/// At most one soloed track, keyed by id.
///
/// Renaming a track never detaches it from the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoloSlot(Option<TrackId>);

impl SoloSlot {
    pub const EMPTY: Self = Self(None);

    /// The soloed track, if any.
    #[inline]
    pub fn get(self) -> Option<TrackId> {
        self.0
    }

    #[inline]
    pub fn is_active(self) -> bool {
        self.0.is_some()
    }

    #[inline]
    pub fn is(self, track: TrackId) -> bool {
        self.0 == Some(track)
    }

    /// Whether solo lets `track` through: no solo, or `track` is the soloed one.
    #[inline]
    pub fn admits(self, track: TrackId) -> bool {
        self.0.map_or(true, |soloed| soloed == track)
    }

    /// Point the slot at `track`, replacing any previous holder.
    /// Returns whether the slot changed.
    pub fn claim(&mut self, track: TrackId) -> bool {
        self.0.replace(track) != Some(track)
    }

    /// Empty the slot. Returns whether it was occupied.
    pub fn clear(&mut self) -> bool {
        self.0.take().is_some()
    }
}

/// What a track asks of the slot when its solo button is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoloRequest {
    /// Take the slot for this track.
    Claim(TrackId),
    /// This track holds the slot; give it up.
    Release,
}
