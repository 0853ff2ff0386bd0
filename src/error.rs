//! Error taxonomy for failures coming back from the player bridge and the
//! remote catalog service.
//!
//! Raw failures enter the core as [`PlayerError`] values and are classified
//! exactly once, at the retry executor boundary, into [`ClassifiedError`].
//! Everything downstream of that boundary only ever sees classified errors.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Raw failures produced by the external collaborators.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// Could not open a connection to the remote service
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The network request timed out
    #[error("request timed out")]
    RequestTimeout,

    /// DNS or routing failure for the remote host
    #[error("host unreachable: {0}")]
    HostUnreachable(String),

    /// The remote service asked us to slow down
    #[error("rate limited by remote service")]
    RateLimited,

    /// The account lacks permission for the requested action
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The action requires an active subscription
    #[error("subscription required")]
    SubscriptionRequired,

    /// The requested entity does not exist in the catalog
    #[error("not found: {0}")]
    NotFound(String),

    /// The entity already exists (e.g. double-adding a favorite)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The entity exists but cannot be served right now
    #[error("temporarily unavailable: {0}")]
    TemporarilyUnavailable(String),

    /// The operation was cancelled before completing
    #[error("operation cancelled")]
    Cancelled,

    /// Generic operation failure
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The operation itself timed out (distinct from a network timeout)
    #[error("operation timed out")]
    OperationTimeout,

    /// The operation was attempted in a state that does not allow it
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The local player process is not running
    #[error("player is not running")]
    PlayerNotRunning,

    /// The local player process exists but did not answer
    #[error("player is not responding")]
    PlayerNotResponding,

    /// The OS denied automation access to the player
    #[error("automation permission denied")]
    AutomationDenied,

    /// Anything we cannot classify further
    #[error("{0}")]
    Other(String),
}

impl PlayerError {
    /// Stable machine-readable code used for analytics aggregation.
    pub fn code(&self) -> &'static str {
        match self {
            PlayerError::ConnectionFailed(_) => "connection_failed",
            PlayerError::RequestTimeout => "request_timeout",
            PlayerError::HostUnreachable(_) => "host_unreachable",
            PlayerError::RateLimited => "rate_limited",
            PlayerError::PermissionDenied(_) => "permission_denied",
            PlayerError::SubscriptionRequired => "subscription_required",
            PlayerError::NotFound(_) => "not_found",
            PlayerError::AlreadyExists(_) => "already_exists",
            PlayerError::TemporarilyUnavailable(_) => "temporarily_unavailable",
            PlayerError::Cancelled => "cancelled",
            PlayerError::OperationFailed(_) => "operation_failed",
            PlayerError::OperationTimeout => "operation_timeout",
            PlayerError::InvalidState(_) => "invalid_state",
            PlayerError::PlayerNotRunning => "player_not_running",
            PlayerError::PlayerNotResponding => "player_not_responding",
            PlayerError::AutomationDenied => "automation_denied",
            PlayerError::Other(_) => "unknown",
        }
    }
}

/// High-level classification of a raw failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Authorization,
    Resource,
    Operation,
    System,
    Unknown,
}

impl ErrorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Resource => "resource",
            ErrorKind::Operation => "operation",
            ErrorKind::System => "system",
            ErrorKind::Unknown => "unknown",
        }
    }

    /// Short user-facing title for this kind of failure.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Connection Problem",
            ErrorKind::Authorization => "Not Authorized",
            ErrorKind::Resource => "Item Unavailable",
            ErrorKind::Operation => "Action Failed",
            ErrorKind::System => "Player Unavailable",
            ErrorKind::Unknown => "Something Went Wrong",
        }
    }

    /// User-facing explanation, rendered verbatim by the presentation layer.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Could not reach the music catalog service.",
            ErrorKind::Authorization => {
                "This account is not allowed to perform that action."
            }
            ErrorKind::Resource => {
                "The requested item could not be accessed in the catalog."
            }
            ErrorKind::Operation => "The requested action could not be completed.",
            ErrorKind::System => "The music player is not responding.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }

    /// User-facing recovery suggestion, rendered verbatim by the presentation layer.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ErrorKind::Network => "Check your internet connection and try again.",
            ErrorKind::Authorization => {
                "Check your subscription status and the app's permissions."
            }
            ErrorKind::Resource => "Try again later or pick a different song.",
            ErrorKind::Operation => "Try again in a moment.",
            ErrorKind::System => "Make sure the player is running and try again.",
            ErrorKind::Unknown => {
                "Try again, and restart the app if the problem persists."
            }
        }
    }
}

/// A raw failure plus everything the rest of the core needs to know about it:
/// the kind, whether retrying can help, a suggested backoff, and the stable
/// user-facing strings.
///
/// The original [`PlayerError`] is kept (shared) so propagation is lossless.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub retryable: bool,
    pub suggested_backoff: Duration,
    source: Arc<PlayerError>,
}

impl ClassifiedError {
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    pub fn message(&self) -> &'static str {
        self.kind.message()
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        self.kind.recovery_suggestion()
    }

    /// The raw failure this classification was made from.
    pub fn source_error(&self) -> &PlayerError {
        &self.source
    }

    /// Stable label for analytics, e.g. `"network.rate_limited"`.
    pub fn error_type(&self) -> String {
        format!("{}.{}", self.kind.name(), self.source.code())
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.source)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

const SHORT_BACKOFF: Duration = Duration::from_secs(1);
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);
const PLAYER_BACKOFF: Duration = Duration::from_secs(2);

/// Classify a raw failure. Pure and total: every [`PlayerError`] maps to
/// exactly one `(kind, retryable, backoff)` triple.
///
/// `TemporarilyUnavailable` is deliberately not flagged retryable: a caller's
/// policy predicate may still opt into retrying it, but the executor will not
/// do so on its own.
pub fn classify(error: PlayerError) -> ClassifiedError {
    let (kind, retryable, suggested_backoff) = match &error {
        PlayerError::ConnectionFailed(_)
        | PlayerError::RequestTimeout
        | PlayerError::HostUnreachable(_) => (ErrorKind::Network, true, SHORT_BACKOFF),
        PlayerError::RateLimited => (ErrorKind::Network, true, RATE_LIMIT_BACKOFF),

        PlayerError::PermissionDenied(_) | PlayerError::SubscriptionRequired => {
            (ErrorKind::Authorization, false, SHORT_BACKOFF)
        }

        PlayerError::NotFound(_)
        | PlayerError::AlreadyExists(_)
        | PlayerError::TemporarilyUnavailable(_) => (ErrorKind::Resource, false, SHORT_BACKOFF),

        PlayerError::Cancelled
        | PlayerError::OperationFailed(_)
        | PlayerError::InvalidState(_) => (ErrorKind::Operation, false, SHORT_BACKOFF),
        PlayerError::OperationTimeout => (ErrorKind::Operation, true, SHORT_BACKOFF),

        PlayerError::PlayerNotRunning | PlayerError::AutomationDenied => {
            (ErrorKind::System, false, PLAYER_BACKOFF)
        }
        PlayerError::PlayerNotResponding => (ErrorKind::System, true, PLAYER_BACKOFF),

        PlayerError::Other(_) => (ErrorKind::Unknown, false, SHORT_BACKOFF),
    };

    ClassifiedError {
        kind,
        retryable,
        suggested_backoff,
        source: Arc::new(error),
    }
}
