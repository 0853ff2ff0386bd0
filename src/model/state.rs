//! Playback state machine.
//!
//! Owns the current [`PlaybackSnapshot`] and is the only place it mutates.
//! The monitor task drives all transitions from a single consumer loop, so
//! playing-flag updates and resolution completions are linearized rather than
//! raced. Observers get a `watch` receiver that always holds the latest
//! snapshot.

use tokio::sync::watch;

use super::types::{CatalogSong, PlaybackSnapshot, TrackInfo};

pub struct PlaybackState {
    snapshot: PlaybackSnapshot,
    tx: watch::Sender<PlaybackSnapshot>,
}

impl PlaybackState {
    pub fn new() -> (Self, watch::Receiver<PlaybackSnapshot>) {
        let (tx, rx) = watch::channel(PlaybackSnapshot::default());
        let state = Self {
            snapshot: PlaybackSnapshot::default(),
            tx,
        };
        (state, rx)
    }

    pub fn snapshot(&self) -> &PlaybackSnapshot {
        &self.snapshot
    }

    /// Flip the playing flag. Stopping clears both the raw track and the
    /// resolved song so a stopped player never shows stale song data; this is
    /// a deliberate policy, not a side effect of debouncing. Starting playback
    /// does not by itself produce a song: track data arrives via the resolver.
    ///
    /// Returns true if the snapshot changed.
    pub fn on_playing_changed(&mut self, is_playing: bool) -> bool {
        if self.snapshot.is_playing == is_playing {
            return false;
        }
        self.snapshot.is_playing = is_playing;
        if !is_playing {
            self.snapshot.raw_track = None;
            self.snapshot.resolved_song = None;
            self.snapshot.position_seconds = 0.0;
        }
        self.publish();
        true
    }

    /// Replace the raw track. A structurally equal track is a no-op. A new
    /// track invalidates whatever song was resolved for the previous one.
    pub fn on_track_changed(&mut self, track: TrackInfo) -> bool {
        if self.snapshot.raw_track.as_ref() == Some(&track) {
            return false;
        }
        self.snapshot.raw_track = Some(track);
        self.snapshot.resolved_song = None;
        self.publish();
        true
    }

    pub fn on_position_changed(&mut self, position_seconds: f64) -> bool {
        if self.snapshot.position_seconds == position_seconds {
            return false;
        }
        self.snapshot.position_seconds = position_seconds;
        self.publish();
        true
    }

    /// Apply a resolution result. Ignored if playback already stopped or the
    /// snapshot's raw track no longer matches the track the resolution was
    /// performed for (state moved on while the lookup was in flight).
    pub fn on_resolved_song(
        &mut self,
        song: Option<CatalogSong>,
        for_track: &TrackInfo,
    ) -> bool {
        if !self.snapshot.is_playing {
            tracing::debug!(
                track = %for_track.name,
                "dropping resolution result, playback already stopped"
            );
            return false;
        }
        if self.snapshot.raw_track.as_ref() != Some(for_track) {
            tracing::debug!(
                track = %for_track.name,
                "dropping resolution result, track no longer current"
            );
            return false;
        }
        if self.snapshot.resolved_song == song {
            return false;
        }
        self.snapshot.resolved_song = song;
        self.publish();
        true
    }

    fn publish(&self) {
        // Send only fails when every receiver is gone, which is fine.
        let _ = self.tx.send(self.snapshot.clone());
    }
}
