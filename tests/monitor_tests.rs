//! Integration tests for the player monitor: dedup, debounce, stale-result
//! discard, and the stop-clears-state policy. All timing runs on tokio's
//! paused clock so the tests are deterministic.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Mutex};

use nowbar_core::{
    CatalogSearch, CatalogSong, ErrorAnalytics, NoJitter, NotificationBus, PlaybackSnapshot,
    PlayerError, PlayerEvent, PlayerMonitor, RetryExecutor, RetryPolicy, TrackInfo,
};

const DEBOUNCE: Duration = Duration::from_millis(300);

struct MockCatalog {
    queries: Arc<Mutex<Vec<String>>>,
    responses: HashMap<String, CatalogSong>,
    delay: Duration,
    fail_with: Option<fn() -> PlayerError>,
}

impl MockCatalog {
    fn new(delay: Duration) -> Self {
        Self {
            queries: Arc::new(Mutex::new(Vec::new())),
            responses: HashMap::new(),
            delay,
            fail_with: None,
        }
    }

    fn respond(mut self, query: &str, song_id: &str) -> Self {
        self.responses.insert(
            query.to_string(),
            CatalogSong {
                id: song_id.to_string(),
                title: query.to_string(),
                artist_name: "Artist".to_string(),
                album_title: None,
            },
        );
        self
    }

    fn failing(mut self, make_error: fn() -> PlayerError) -> Self {
        self.fail_with = Some(make_error);
        self
    }

    async fn recorded_queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl CatalogSearch for MockCatalog {
    async fn search(&self, query: &str) -> Result<Option<CatalogSong>, PlayerError> {
        self.queries.lock().await.push(query.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(make_error) = self.fail_with {
            return Err(make_error());
        }
        Ok(self.responses.get(query).cloned())
    }
}

fn spawn_monitor(
    catalog: Arc<MockCatalog>,
) -> (
    mpsc::Sender<PlayerEvent>,
    watch::Receiver<PlaybackSnapshot>,
    ErrorAnalytics,
) {
    let analytics = ErrorAnalytics::default();
    let executor = RetryExecutor::with_jitter(analytics.clone(), Arc::new(NoJitter));
    let bus = NotificationBus::new(64);
    let (events, snapshots, _task) = PlayerMonitor::spawn(
        catalog,
        executor,
        RetryPolicy::network(),
        bus,
        DEBOUNCE,
    );
    (events, snapshots, analytics)
}

fn playing(name: &str, artist: &str) -> PlayerEvent {
    PlayerEvent {
        track: Some(TrackInfo::new(name, artist)),
        is_playing: true,
        position_seconds: 0.0,
    }
}

fn stopped() -> PlayerEvent {
    PlayerEvent {
        track: None,
        is_playing: false,
        position_seconds: 0.0,
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_distinct_events_resolves_only_the_last() {
    let catalog = Arc::new(MockCatalog::new(Duration::ZERO).respond("C Z", "song-c"));
    let (events, snapshots, _) = spawn_monitor(catalog.clone());

    events.send(playing("A", "X")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    events.send(playing("B", "Y")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    events.send(playing("C", "Z")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(catalog.recorded_queries().await, vec!["C Z"]);
    let snapshot = snapshots.borrow().clone();
    assert_eq!(snapshot.raw_track.as_ref().unwrap().name, "C");
    assert_eq!(snapshot.resolved_song.as_ref().unwrap().id, "song-c");
}

#[tokio::test(start_paused = true)]
async fn duplicate_events_trigger_a_single_resolution() {
    let catalog = Arc::new(MockCatalog::new(Duration::ZERO).respond("A X", "song-a"));
    let (events, snapshots, _) = spawn_monitor(catalog.clone());

    for _ in 0..5 {
        events.send(playing("A", "X")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_millis(600)).await;

    // More chatter for the same track after resolution completed.
    events.send(playing("A", "X")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(catalog.recorded_queries().await, vec!["A X"]);
    assert_eq!(
        snapshots.borrow().resolved_song.as_ref().unwrap().id,
        "song-a"
    );
}

#[tokio::test(start_paused = true)]
async fn stale_resolution_result_is_discarded() {
    // Lookups take 500ms, so A's result lands well after B became current.
    let catalog = Arc::new(
        MockCatalog::new(Duration::from_millis(500))
            .respond("A X", "song-a")
            .respond("B Y", "song-b"),
    );
    let (events, snapshots, _) = spawn_monitor(catalog.clone());

    events.send(playing("A", "X")).await.unwrap();
    // A's debounce fires at 300ms; its lookup would complete at 800ms.
    tokio::time::sleep(Duration::from_millis(350)).await;
    events.send(playing("B", "Y")).await.unwrap();

    // 900ms: A's lookup has completed but must not have been applied.
    tokio::time::sleep(Duration::from_millis(550)).await;
    assert!(snapshots.borrow().resolved_song.is_none());

    // 1200ms: B's lookup (debounced at 650ms, done at 1150ms) is applied.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let snapshot = snapshots.borrow().clone();
    assert_eq!(snapshot.raw_track.as_ref().unwrap().name, "B");
    assert_eq!(snapshot.resolved_song.as_ref().unwrap().id, "song-b");

    assert_eq!(catalog.recorded_queries().await, vec!["A X", "B Y"]);
}

#[tokio::test(start_paused = true)]
async fn stop_clears_track_and_resolved_song() {
    let catalog = Arc::new(MockCatalog::new(Duration::ZERO).respond("A X", "song-a"));
    let (events, snapshots, _) = spawn_monitor(catalog.clone());

    events.send(playing("A", "X")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(snapshots.borrow().resolved_song.is_some());

    events.send(stopped()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = snapshots.borrow().clone();
    assert!(!snapshot.is_playing);
    assert!(snapshot.raw_track.is_none());
    assert!(snapshot.resolved_song.is_none());
}

#[tokio::test(start_paused = true)]
async fn stop_while_lookup_in_flight_drops_its_result() {
    let catalog = Arc::new(MockCatalog::new(Duration::from_millis(500)).respond("A X", "song-a"));
    let (events, snapshots, _) = spawn_monitor(catalog.clone());

    events.send(playing("A", "X")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await; // lookup now in flight
    events.send(stopped()).await.unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = snapshots.borrow().clone();
    assert!(!snapshot.is_playing);
    assert!(snapshot.raw_track.is_none());
    assert!(snapshot.resolved_song.is_none());
}

#[tokio::test(start_paused = true)]
async fn failed_resolution_keeps_the_raw_track() {
    let catalog = Arc::new(
        MockCatalog::new(Duration::ZERO)
            .failing(|| PlayerError::PermissionDenied("catalog".into())),
    );
    let (events, snapshots, analytics) = spawn_monitor(catalog.clone());

    events.send(playing("A", "X")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let snapshot = snapshots.borrow().clone();
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.raw_track.as_ref().unwrap().name, "A");
    assert!(snapshot.resolved_song.is_none());

    // Non-retryable: one attempt, recorded as a terminal failure.
    assert_eq!(catalog.recorded_queries().await.len(), 1);
    let summary = analytics.summary().await;
    assert_eq!(summary.by_type["authorization.permission_denied"], 1);
}

#[tokio::test(start_paused = true)]
async fn retryable_failures_are_retried_before_resolving() {
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyCatalog {
        attempts: AtomicU32,
        song: CatalogSong,
    }

    #[async_trait]
    impl CatalogSearch for FlakyCatalog {
        async fn search(&self, _query: &str) -> Result<Option<CatalogSong>, PlayerError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PlayerError::RequestTimeout)
            } else {
                Ok(Some(self.song.clone()))
            }
        }
    }

    let catalog = Arc::new(FlakyCatalog {
        attempts: AtomicU32::new(0),
        song: CatalogSong {
            id: "song-a".to_string(),
            title: "A".to_string(),
            artist_name: "X".to_string(),
            album_title: None,
        },
    });

    let analytics = ErrorAnalytics::default();
    let executor = RetryExecutor::with_jitter(analytics.clone(), Arc::new(NoJitter));
    let bus = NotificationBus::new(64);
    let (events, snapshots, _task) = PlayerMonitor::spawn(
        catalog.clone(),
        executor,
        RetryPolicy::network(),
        bus,
        DEBOUNCE,
    );

    events.send(playing("A", "X")).await.unwrap();
    // Debounce 300ms plus two backoffs (1s, 2s) before the third attempt succeeds.
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(catalog.attempts.load(Ordering::SeqCst), 3);
    assert_eq!(
        snapshots.borrow().resolved_song.as_ref().unwrap().id,
        "song-a"
    );
    assert_eq!(analytics.summary().await.recovered_operations, 1);
}
