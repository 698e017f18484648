//! Track identity.

use collabmix_core::TrackColor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable track identifier. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which capabilities a track was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    /// Loads and plays audio.
    #[default]
    Playback,
    /// Also records from the microphone.
    Recordable,
}

/// Session-owned identity of a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// User-editable display name
    pub name: String,
    /// Assigned at creation, never changed
    pub color: TrackColor,
    /// Track capabilities
    pub kind: TrackKind,
}

impl Track {
    pub fn new(id: TrackId, name: impl Into<String>, color: TrackColor, kind: TrackKind) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            kind,
        }
    }

    pub fn is_recordable(&self) -> bool {
        self.kind == TrackKind::Recordable
    }
}
