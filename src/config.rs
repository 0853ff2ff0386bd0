//! Injectable configuration.
//!
//! The host application owns persistence and file formats; this crate only
//! consumes constants. Everything here has a sensible default so tests and
//! simple hosts can use `CoreConfig::default()`.

use std::path::PathBuf;
use std::time::Duration;

use crate::analytics::ErrorAnalytics;
use crate::retry::RetryPolicy;

#[derive(Clone)]
pub struct CoreConfig {
    /// Quiet period after the last distinct track event before resolving.
    pub debounce_window: Duration,
    /// Ring buffer capacity of the error analytics log.
    pub analytics_capacity: usize,
    /// Broadcast capacity of the notification bus.
    pub notification_capacity: usize,
    /// Retry policy for background catalog lookups.
    pub network_policy: RetryPolicy,
    /// Retry policy for user-initiated favorite toggles.
    pub critical_policy: RetryPolicy,
    /// Where to persist the liked-ids cache; `None` keeps it in memory only.
    pub favorites_cache_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(300),
            analytics_capacity: ErrorAnalytics::DEFAULT_CAPACITY,
            notification_capacity: 64,
            network_policy: RetryPolicy::network(),
            critical_policy: RetryPolicy::critical(),
            favorites_cache_path: None,
        }
    }
}
