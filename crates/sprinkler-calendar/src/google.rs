//! Google Calendar API v3 event source

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::{EventSource, FetchResult};
use sprinkler_store::ScheduledEvent;
use sprinkler_util::EventId;

/// Event source backed by the Google Calendar REST API
pub struct GoogleCalendar {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// One entry of the `items` array in an events response
#[derive(Debug, Deserialize)]
struct EventItem {
    id: String,
    /// Absent on events without a title; those are skipped.
    summary: Option<String>,
    #[serde(default)]
    start: EventTime,
    #[serde(default)]
    end: EventTime,
}

/// Timed events carry `dateTime`; all-day events carry only `date` and
/// are skipped.
#[derive(Debug, Default, Deserialize)]
struct EventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Local>>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventItem>,
}

impl GoogleCalendar {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EventSource for GoogleCalendar {
    async fn fetch_events(
        &self,
        calendar_id: &str,
    ) -> FetchResult<Vec<(EventId, ScheduledEvent)>> {
        // Query from the start of the current UTC day so events already in
        // progress are included.
        let time_min = Utc::now().format("%Y-%m-%dT00:00:00.000Z").to_string();
        let url = format!("{}/{}/events", self.base_url, calendar_id);

        let response: EventsResponse = self
            .client
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("timeMin", time_min.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(calendar_id, items = response.items.len(), "Fetched calendar events");

        Ok(events_from_items(response.items, sprinkler_util::now()))
    }
}

/// Map raw calendar items to schedule events, dropping entries without a
/// summary or a timed window, and entries that already ended.
fn events_from_items(
    items: Vec<EventItem>,
    now: DateTime<Local>,
) -> Vec<(EventId, ScheduledEvent)> {
    let mut events = Vec::new();

    for item in items {
        let Some(zone_name) = item.summary else {
            debug!(event_id = %item.id, "Skipping event without summary");
            continue;
        };
        let (Some(turn_on), Some(turn_off)) = (item.start.date_time, item.end.date_time)
        else {
            debug!(event_id = %item.id, "Skipping event without a timed window");
            continue;
        };

        if turn_off < now {
            continue;
        }

        events.push((
            EventId::new(item.id),
            ScheduledEvent {
                zone_name,
                zone_id: None,
                turn_on,
                turn_off,
                running: turn_on <= now && now <= turn_off,
            },
        ));
    }

    events
}
