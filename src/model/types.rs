//! Core value types shared across the crate.

/// Track metadata as reported by the external player, before any catalog
/// lookup. Compared structurally for dedup: the player bridge can deliver the
/// same track many times in a burst and equal values must be ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
    pub external_id: Option<String>,
    pub duration_seconds: Option<f64>,
}

impl TrackInfo {
    pub fn new(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artist: artist.into(),
            album: None,
            external_id: None,
            duration_seconds: None,
        }
    }
}

/// Canonical song record returned by the catalog search collaborator,
/// distinct from the raw player-reported strings. Immutable once obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSong {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub album_title: Option<String>,
}

/// The full observable playback state.
///
/// Invariant: `resolved_song` is only ever set while `raw_track` is set and
/// the resolution was performed for that exact track. Stopping playback
/// clears both, so a stopped player never shows a stale song.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub raw_track: Option<TrackInfo>,
    pub resolved_song: Option<CatalogSong>,
    pub position_seconds: f64,
}
