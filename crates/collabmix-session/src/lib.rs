//! Collab-Mix Session - Multi-track mix state
//!
//! Coordinates any number of independently controlled tracks:
//! - `MixSession` owns the track collection and the solo slot
//! - `TrackController` holds one track's controls and derives whether it is audible
//! - Async decode and capture completions are applied on the control path,
//!   with cancellation when a track goes away
//! - Sessions save to a versioned JSON file

pub mod controller;
pub mod events;
pub mod pending;
pub mod serialization;
pub mod session;
pub mod solo;
pub mod track;

pub use controller::{TrackControlState, TrackController};
pub use events::TrackEvent;
pub use pending::{CancelToken, Ticket};
pub use serialization::{SessionFile, SessionState, TrackState, CURRENT_VERSION};
pub use session::{ChannelSnapshot, MixSession};
pub use solo::{SoloRequest, SoloSlot};
pub use track::{Track, TrackId, TrackKind};
