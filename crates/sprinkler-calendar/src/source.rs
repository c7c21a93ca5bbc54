//! Event source trait

use async_trait::async_trait;
use sprinkler_store::ScheduledEvent;
use sprinkler_util::EventId;
use thiserror::Error;

/// Errors from event source operations
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed calendar payload: {0}")]
    MalformedPayload(String),
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Source of upcoming watering events - implemented per calendar backend
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the upcoming events for one calendar.
    ///
    /// Returned events have `zone_id` unset; resolution against the zone
    /// store happens during reconciliation.
    async fn fetch_events(&self, calendar_id: &str)
        -> FetchResult<Vec<(EventId, ScheduledEvent)>>;
}
