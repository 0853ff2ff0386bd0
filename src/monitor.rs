//! Player event monitor: dedup, debounce, and catalog resolution.
//!
//! A single consumer task owns the playback state machine and the resolver
//! bookkeeping. Raw player events, debounce expirations, and resolution
//! completions all funnel through one `select!` loop, so every state
//! transition is linearized.
//!
//! Stale resolutions are handled with a generation counter rather than task
//! cancellation: each lookup carries the generation of the event that
//! triggered it, and completions for superseded generations are dropped on
//! arrival. The lookup itself is never forcibly aborted.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::catalog::CatalogSearch;
use crate::error::ClassifiedError;
use crate::model::{CatalogSong, PlaybackSnapshot, PlaybackState, TrackInfo};
use crate::notify::{Notification, NotificationBus};
use crate::retry::{RetryExecutor, RetryPolicy};

/// Raw state push from the external player bridge. The bridge gives no
/// ordering or dedup guarantees; bursts of duplicates are expected.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    pub track: Option<TrackInfo>,
    pub is_playing: bool,
    pub position_seconds: f64,
}

const EVENT_CHANNEL_CAPACITY: usize = 64;

struct PendingResolution {
    generation: u64,
    track: TrackInfo,
    deadline: Instant,
}

struct ResolutionOutcome {
    generation: u64,
    track: TrackInfo,
    result: Result<Option<CatalogSong>, ClassifiedError>,
}

pub struct PlayerMonitor {
    events: mpsc::Receiver<PlayerEvent>,
    state: PlaybackState,
    catalog: Arc<dyn CatalogSearch>,
    executor: RetryExecutor,
    policy: RetryPolicy,
    bus: NotificationBus,
    debounce_window: Duration,
    /// Generation of the newest distinct track event. Bumped on every track
    /// change and on stop; resolution results carrying an older generation
    /// are discarded.
    generation: u64,
    /// Last distinct track seen, used to swallow notification chatter.
    tracked: Option<TrackInfo>,
    pending: Option<PendingResolution>,
    outcome_tx: mpsc::Sender<ResolutionOutcome>,
    outcome_rx: mpsc::Receiver<ResolutionOutcome>,
}

impl PlayerMonitor {
    /// Spawn the monitor task. Returns the sender the player bridge pushes
    /// events into, the snapshot watch, and the task handle. The task ends
    /// when the event sender is dropped.
    pub fn spawn(
        catalog: Arc<dyn CatalogSearch>,
        executor: RetryExecutor,
        policy: RetryPolicy,
        bus: NotificationBus,
        debounce_window: Duration,
    ) -> (
        mpsc::Sender<PlayerEvent>,
        watch::Receiver<PlaybackSnapshot>,
        JoinHandle<()>,
    ) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (outcome_tx, outcome_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state, snapshots) = PlaybackState::new();

        let monitor = Self {
            events: event_rx,
            state,
            catalog,
            executor,
            policy,
            bus,
            debounce_window,
            generation: 0,
            tracked: None,
            pending: None,
            outcome_tx,
            outcome_rx,
        };

        let task = tokio::spawn(monitor.run());
        (event_tx, snapshots, task)
    }

    async fn run(mut self) {
        tracing::info!("player monitor started");
        loop {
            let deadline = self.pending.as_ref().map(|p| p.deadline);
            tokio::select! {
                maybe_event = self.events.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(event),
                        None => break,
                    }
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    self.handle_outcome(outcome);
                }
                _ = tokio::time::sleep_until(
                    deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600))
                ), if deadline.is_some() => {
                    self.begin_resolution();
                }
            }
        }
        tracing::info!("player monitor shutting down");
    }

    fn handle_event(&mut self, event: PlayerEvent) {
        let mut changed = false;

        if event.is_playing != self.state.snapshot().is_playing {
            changed |= self.state.on_playing_changed(event.is_playing);
            if !event.is_playing {
                // Stop cancels the debounce timer and invalidates any lookup
                // still in flight.
                self.pending = None;
                self.tracked = None;
                self.generation += 1;
                tracing::debug!("playback stopped, cleared track state");
            }
        }

        if event.is_playing {
            changed |= self.state.on_position_changed(event.position_seconds);

            if let Some(track) = event.track {
                if self.tracked.as_ref() == Some(&track) {
                    // Notification chatter for the track we already have.
                } else {
                    tracing::info!(
                        track = %track.name,
                        artist = %track.artist,
                        "track changed"
                    );
                    self.tracked = Some(track.clone());
                    self.generation += 1;
                    self.pending = Some(PendingResolution {
                        generation: self.generation,
                        track: track.clone(),
                        deadline: Instant::now() + self.debounce_window,
                    });
                    changed |= self.state.on_track_changed(track);
                }
            }
        }

        if changed {
            self.publish_snapshot();
        }
    }

    /// Quiet period elapsed: kick off the catalog lookup for the pending track.
    fn begin_resolution(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let query = format!("{} {}", pending.track.name, pending.track.artist);
        tracing::debug!(
            query = %query,
            generation = pending.generation,
            "starting catalog resolution"
        );

        let catalog = self.catalog.clone();
        let executor = self.executor.clone();
        let policy = self.policy.clone();
        let outcome_tx = self.outcome_tx.clone();
        let PendingResolution {
            generation, track, ..
        } = pending;

        tokio::spawn(async move {
            let operation = {
                let catalog = catalog.clone();
                let query = query.clone();
                move || {
                    let catalog = catalog.clone();
                    let query = query.clone();
                    async move { catalog.search(&query).await }
                }
            };
            let result = executor.execute(&policy, "catalog_search", operation).await;
            let _ = outcome_tx
                .send(ResolutionOutcome {
                    generation,
                    track,
                    result,
                })
                .await;
        });
    }

    fn handle_outcome(&mut self, outcome: ResolutionOutcome) {
        if outcome.generation != self.generation {
            tracing::debug!(
                track = %outcome.track.name,
                generation = outcome.generation,
                current = self.generation,
                "discarding stale resolution result"
            );
            return;
        }

        let changed = match outcome.result {
            Ok(song) => {
                match &song {
                    Some(song) => tracing::info!(
                        track = %outcome.track.name,
                        song_id = %song.id,
                        "track resolved to catalog song"
                    ),
                    None => tracing::info!(
                        track = %outcome.track.name,
                        "no catalog match for track"
                    ),
                }
                self.state.on_resolved_song(song, &outcome.track)
            }
            Err(err) => {
                // Retries already exhausted inside the executor. Keep the raw
                // track so the UI can still show name/artist.
                tracing::warn!(
                    track = %outcome.track.name,
                    error = %err,
                    "catalog resolution failed"
                );
                self.state.on_resolved_song(None, &outcome.track)
            }
        };

        if changed {
            self.publish_snapshot();
        }
    }

    fn publish_snapshot(&self) {
        self.bus
            .publish(Notification::PlaybackChanged(self.state.snapshot().clone()));
    }
}
