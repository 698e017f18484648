//! Session serialization with versioning and migration.
//!
//! Uses JSON with a schema version field for forward-compatible persistence.
//! Only mix state is saved; audio must be loaded again after a restore.

use collabmix_core::{MixError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::solo::SoloSlot;
use crate::track::Track;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Saved identity and controls of one track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    #[serde(flatten)]
    pub track: Track,
    pub volume: f32,
    pub pan: f32,
    pub bpm: f64,
    #[serde(default)]
    pub muted: bool,
}

/// Saved mix state of a whole session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Tracks in creation order
    pub tracks: Vec<TrackState>,
    #[serde(default)]
    pub solo: SoloSlot,
    /// Highest id ever handed out, including removed tracks
    #[serde(default)]
    pub last_id: u64,
}

/// Versioned session file wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFile {
    /// Schema version for migration.
    pub version: u32,
    pub session_id: Uuid,
    pub session: SessionState,
    /// Application version that wrote this file.
    pub app_version: String,
}

impl SessionFile {
    pub fn new(session_id: Uuid, session: SessionState) -> Self {
        Self {
            version: CURRENT_VERSION,
            session_id,
            session,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| MixError::Serialization(format!("Failed to serialize session: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| MixError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
        let version = u32::try_from(version).unwrap_or(u32::MAX);

        if version > CURRENT_VERSION {
            return Err(MixError::Serialization(format!(
                "Session file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| MixError::Serialization(format!("Failed to parse session: {}", e)))
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        let data = self.to_json()?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                if data.get("version").is_none() {
                    // v0 files are a bare SessionState with no wrapper or id
                    data = serde_json::json!({
                        "version": 1,
                        "session_id": Uuid::new_v4(),
                        "session": data,
                        "app_version": "0.0.0",
                    });
                } else if let Some(wrapper) = data.as_object_mut() {
                    wrapper.insert("version".into(), serde_json::json!(1));
                    wrapper
                        .entry("session_id")
                        .or_insert_with(|| serde_json::json!(Uuid::new_v4()));
                }
                version = 1;
            }
            _ => {
                return Err(MixError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}
