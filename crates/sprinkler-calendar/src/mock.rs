//! Mock event source for testing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{EventSource, FetchError, FetchResult};
use sprinkler_store::ScheduledEvent;
use sprinkler_util::EventId;

/// Mock event source for unit/integration testing.
///
/// Clones share state, so tests keep a clone to swap event sets between
/// reconciliation passes.
#[derive(Clone, Default)]
pub struct MockSource {
    events: Arc<Mutex<Vec<(EventId, ScheduledEvent)>>>,
    fail: Arc<Mutex<bool>>,
    fetch_count: Arc<Mutex<usize>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the event set returned by subsequent fetches.
    pub fn set_events(&self, events: Vec<(EventId, ScheduledEvent)>) {
        *self.events.lock().unwrap() = events;
    }

    /// Configure fetches to fail.
    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn fetch_count(&self) -> usize {
        *self.fetch_count.lock().unwrap()
    }
}

#[async_trait]
impl EventSource for MockSource {
    async fn fetch_events(
        &self,
        _calendar_id: &str,
    ) -> FetchResult<Vec<(EventId, ScheduledEvent)>> {
        *self.fetch_count.lock().unwrap() += 1;

        if *self.fail.lock().unwrap() {
            return Err(FetchError::MalformedPayload("mock fetch failure".into()));
        }

        Ok(self.events.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_configured_events() {
        let source = MockSource::new();
        let now = sprinkler_util::now();

        source.set_events(vec![(
            EventId::new("a"),
            ScheduledEvent {
                zone_name: "Front Lawn".into(),
                zone_id: None,
                turn_on: now,
                turn_off: now + chrono::Duration::minutes(30),
                running: true,
            },
        )]);

        let events = source.fetch_events("cal").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(source.fetch_count(), 1);

        source.set_fail(true);
        assert!(source.fetch_events("cal").await.is_err());
    }
}
