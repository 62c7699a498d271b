use std::error::Error as StdError;
use std::sync::Arc;

/// Shared, cloneable cause attached to subscriber and interceptor failures.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Errors surfaced by the command bus.
///
/// Registration-side misses (unsubscribing something that is not registered,
/// disposing twice) are not errors and never produce one of these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusError {
    #[error("Command bus has been disposed")]
    Disposed,

    #[error("Subscriber failed while handling {command}: {error}")]
    SubscriberFailure {
        command: &'static str,
        error: SharedError,
    },

    #[error("Interceptor {interceptor} failed: {error}")]
    InterceptorFailure {
        interceptor: &'static str,
        error: SharedError,
    },

    #[error("Publish was cancelled")]
    Cancelled,

    #[error("{} failures while awaiting subscribers, first: {}", .0.len(), first_message(.0))]
    Aggregate(Vec<BusError>),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn first_message(errors: &[BusError]) -> String {
    errors
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".to_string())
}

impl BusError {
    /// Wrap a subscriber's own error.
    pub fn subscriber(
        command: &'static str,
        error: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        BusError::SubscriberFailure {
            command,
            error: Arc::from(error.into()),
        }
    }

    /// Wrap an interceptor's own error.
    pub fn interceptor(
        interceptor: &'static str,
        error: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        BusError::InterceptorFailure {
            interceptor,
            error: Arc::from(error.into()),
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, BusError::Disposed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BusError::Cancelled)
    }

    /// First observed failure; `self` unless this is an aggregate.
    pub fn first(&self) -> &BusError {
        match self {
            BusError::Aggregate(errors) => errors.first().map_or(self, BusError::first),
            other => other,
        }
    }

    /// Collapse the failures observed while awaiting a set of completions.
    ///
    /// Keeps completion order. All-cancelled collapses to `Cancelled`.
    pub fn from_failures(mut failures: Vec<BusError>) -> BusResult<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ if failures.iter().all(BusError::is_cancelled) => Err(BusError::Cancelled),
            _ => Err(BusError::Aggregate(failures)),
        }
    }
}

pub type BusResult<T> = std::result::Result<T, BusError>;
