//! Bounded error analytics.
//!
//! Records terminal failures (and recoveries after retries) without any user
//! content: only the stable error type, retryability, and the operation label
//! are kept. The log is a FIFO ring buffer so memory stays bounded no matter
//! how long the app runs.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use chrono::{DateTime, Timelike, Utc};
use tokio::sync::RwLock;

use crate::error::ClassifiedError;

/// One recorded failure. Contains no track names, queries, or other user data.
#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub timestamp: DateTime<Utc>,
    pub error_type: String,
    pub is_retryable: bool,
    pub operation_context: Option<String>,
}

/// Aggregated view over the recorded events, computed on demand.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsSummary {
    pub total_errors: usize,
    pub by_type: HashMap<String, usize>,
    pub by_hour: HashMap<u32, usize>,
    /// Operations that failed at least once but ultimately succeeded after retry.
    pub recovered_operations: usize,
}

struct AnalyticsInner {
    events: VecDeque<ErrorEvent>,
    recoveries: usize,
}

/// Shared, bounded recorder of classified failures.
///
/// Appends happen from every operation call site; reads happen when a summary
/// is requested. Both go through a short `RwLock` critical section.
#[derive(Clone)]
pub struct ErrorAnalytics {
    inner: Arc<RwLock<AnalyticsInner>>,
    capacity: usize,
}

impl ErrorAnalytics {
    pub const DEFAULT_CAPACITY: usize = 100;

    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(AnalyticsInner {
                events: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
                recoveries: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    /// Record a terminal failure (non-retryable, or retry budget exhausted).
    pub async fn record_error(&self, error: &ClassifiedError, context: &str) {
        let event = ErrorEvent {
            timestamp: Utc::now(),
            error_type: error.error_type(),
            is_retryable: error.retryable,
            operation_context: (!context.is_empty()).then(|| context.to_string()),
        };

        let mut inner = self.inner.write().await;
        if inner.events.len() == self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(event);
    }

    /// Record an operation that succeeded after at least one failed attempt.
    pub async fn record_recovery(&self, context: &str) {
        tracing::debug!(operation = context, "operation recovered after retry");
        let mut inner = self.inner.write().await;
        inner.recoveries += 1;
    }

    pub async fn event_count(&self) -> usize {
        self.inner.read().await.events.len()
    }

    /// Snapshot of the recorded events, oldest first.
    pub async fn events(&self) -> Vec<ErrorEvent> {
        self.inner.read().await.events.iter().cloned().collect()
    }

    pub async fn summary(&self) -> AnalyticsSummary {
        let inner = self.inner.read().await;

        let mut summary = AnalyticsSummary {
            total_errors: inner.events.len(),
            recovered_operations: inner.recoveries,
            ..Default::default()
        };
        for event in &inner.events {
            *summary.by_type.entry(event.error_type.clone()).or_insert(0) += 1;
            *summary.by_hour.entry(event.timestamp.hour()).or_insert(0) += 1;
        }
        summary
    }
}

impl Default for ErrorAnalytics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
