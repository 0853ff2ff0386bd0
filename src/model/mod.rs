//! Data model: value types and the playback state machine.
//!
//! - `types`: track/song value types and the observable snapshot
//! - `state`: the state machine that owns and mutates the snapshot

mod state;
mod types;

pub use state::PlaybackState;
pub use types::{CatalogSong, PlaybackSnapshot, TrackInfo};
