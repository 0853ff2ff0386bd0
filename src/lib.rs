//! Core engine for a menu-bar music companion.
//!
//! Mirrors the external player's live state (debouncing and deduplicating its
//! noisy change notifications, resolving stable tracks against the remote
//! catalog) and forwards favorite toggles to the catalog with retry. The
//! presentation layer consumes the snapshot watch and the notification bus;
//! nothing here renders anything.

pub mod analytics;
pub mod catalog;
pub mod config;
pub mod core;
pub mod error;
pub mod favorites;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod notify;
pub mod retry;

pub use analytics::{AnalyticsSummary, ErrorAnalytics, ErrorEvent};
pub use catalog::{CatalogSearch, FavoritesApi};
pub use config::CoreConfig;
pub use self::core::NowbarCore;
pub use error::{classify, ClassifiedError, ErrorKind, PlayerError};
pub use favorites::{FavoriteCache, FavoriteService};
pub use model::{CatalogSong, PlaybackSnapshot, PlaybackState, TrackInfo};
pub use monitor::{PlayerEvent, PlayerMonitor};
pub use notify::{Notification, NotificationBus};
pub use retry::{Jitter, NoJitter, RetryExecutor, RetryPolicy, ThreadRngJitter};
