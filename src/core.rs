//! Composition root.
//!
//! Constructs the shared services (analytics, retry executor, notification
//! bus) exactly once, spawns the monitor task, and hands the host application
//! the handles it needs. Nothing in the crate reaches for global state.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::analytics::ErrorAnalytics;
use crate::catalog::{CatalogSearch, FavoritesApi};
use crate::config::CoreConfig;
use crate::favorites::{FavoriteCache, FavoriteService};
use crate::model::PlaybackSnapshot;
use crate::monitor::{PlayerEvent, PlayerMonitor};
use crate::notify::{Notification, NotificationBus};
use crate::retry::RetryExecutor;

pub struct NowbarCore {
    events: mpsc::Sender<PlayerEvent>,
    snapshots: watch::Receiver<PlaybackSnapshot>,
    favorites: FavoriteService,
    analytics: ErrorAnalytics,
    bus: NotificationBus,
    monitor_task: JoinHandle<()>,
}

impl NowbarCore {
    pub fn start(
        config: CoreConfig,
        catalog: Arc<dyn CatalogSearch>,
        favorites_api: Arc<dyn FavoritesApi>,
    ) -> Self {
        let analytics = ErrorAnalytics::new(config.analytics_capacity);
        let executor = RetryExecutor::new(analytics.clone());
        let bus = NotificationBus::new(config.notification_capacity);

        let cache = FavoriteCache::new(config.favorites_cache_path.clone());
        let favorites = FavoriteService::new(
            favorites_api,
            executor.clone(),
            config.critical_policy.clone(),
            cache,
            bus.clone(),
        );

        let (events, snapshots, monitor_task) = PlayerMonitor::spawn(
            catalog,
            executor,
            config.network_policy.clone(),
            bus.clone(),
            config.debounce_window,
        );

        Self {
            events,
            snapshots,
            favorites,
            analytics,
            bus,
            monitor_task,
        }
    }

    /// Sender the player bridge pushes raw state events into.
    pub fn event_sender(&self) -> mpsc::Sender<PlayerEvent> {
        self.events.clone()
    }

    /// Always-current playback snapshot.
    pub fn snapshots(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.snapshots.clone()
    }

    /// Subscribe to the presentation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.bus.subscribe()
    }

    pub fn favorites(&self) -> &FavoriteService {
        &self.favorites
    }

    pub fn analytics(&self) -> &ErrorAnalytics {
        &self.analytics
    }

    /// Stop the monitor task. Pending catalog lookups are left to finish and
    /// their results dropped.
    pub async fn shutdown(self) {
        drop(self.events);
        let _ = self.monitor_task.await;
    }
}
