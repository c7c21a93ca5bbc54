//! Schedule cache store
//!
//! Local cache of the calendar-sourced watering events. Each
//! reconciliation pass purges expired events, resolves zone names against
//! the zone store, upserts by event id, and optionally garbage-collects
//! events the source no longer reports. Every removal turns the owning
//! zone off through the schedule path, so the ownership rule still
//! protects manually activated zones.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::serde_compat::{bit_bool, legacy_time};
use crate::zones::{StateOwner, ZoneStore};
use crate::StoreError;
use sprinkler_util::EventId;

/// A calendar event mapped onto a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Event summary text; resolved to `zone_id` during reconciliation.
    pub zone_name: String,

    #[serde(default)]
    pub zone_id: Option<usize>,

    #[serde(with = "legacy_time")]
    pub turn_on: DateTime<Local>,

    #[serde(with = "legacy_time")]
    pub turn_off: DateTime<Local>,

    /// Whether the event window covers "now" as of the last fetch.
    #[serde(with = "bit_bool")]
    pub running: bool,
}

/// Cache entry; the vec keeps insertion order so sort ties stay stable.
#[derive(Debug, Clone)]
struct CachedEvent {
    id: EventId,
    event: ScheduledEvent,
}

/// On-disk layout of the schedule file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ScheduleData {
    calendar_id: Option<String>,

    #[serde(with = "event_map", default)]
    events: Vec<CachedEvent>,
}

/// JSON-file-backed store for the schedule cache.
pub struct ScheduleStore {
    path: PathBuf,
    data: ScheduleData,
}

impl ScheduleStore {
    /// Load the schedule file, starting empty when missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();

        let data = match crate::load_json::<ScheduleData>(&path) {
            Ok(data) => data,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Schedule file not found, initializing");
                ScheduleData::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load schedule file, starting fresh");
                ScheduleData::default()
            }
        };

        Self { path, data }
    }

    pub fn calendar_id(&self) -> Option<&str> {
        self.data.calendar_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.events.is_empty()
    }

    /// Iterate cached events in insertion order.
    pub fn events(&self) -> impl Iterator<Item = (&EventId, &ScheduledEvent)> {
        self.data.events.iter().map(|e| (&e.id, &e.event))
    }

    /// Merge a fetched event set into the cache.
    ///
    /// Expired events are purged first. Incoming events resolve their zone
    /// id against the zone store; unresolvable events are dropped. Known
    /// event ids are replaced in place, new ones appended. With
    /// `remove_missing`, cached events absent from `incoming` are removed
    /// and their zones turned off through the schedule path.
    pub fn update(
        &mut self,
        zones: &mut ZoneStore,
        incoming: &[(EventId, ScheduledEvent)],
        remove_missing: bool,
    ) {
        self.remove_past_events(zones);

        for (id, event) in incoming {
            let mut event = event.clone();
            event.zone_id = zones.resolve_zone_id(&event.zone_name);

            let Some(zone_id) = event.zone_id else {
                debug!(event_id = %id, zone_name = %event.zone_name, "Dropping event for unknown zone");
                continue;
            };

            match self.data.events.iter_mut().find(|e| &e.id == id) {
                Some(cached) => cached.event = event,
                None => {
                    debug!(event_id = %id, zone_id, "Caching new schedule event");
                    self.data.events.push(CachedEvent {
                        id: id.clone(),
                        event,
                    });
                }
            }
        }

        if remove_missing {
            let stale: Vec<EventId> = self
                .data
                .events
                .iter()
                .filter(|cached| !incoming.iter().any(|(id, _)| id == &cached.id))
                .map(|cached| cached.id.clone())
                .collect();

            for id in stale {
                self.remove(zones, &id);
            }
        }

        self.persist();
    }

    /// Drop every cached event whose turn-off time has passed, turning the
    /// affected zones off through the schedule path.
    ///
    /// Does not persist on its own; callers that need durability follow up
    /// with a persisting operation, matching the reconciliation flow.
    pub fn remove_past_events(&mut self, zones: &mut ZoneStore) {
        let now = sprinkler_util::now();

        let expired: Vec<EventId> = self
            .data
            .events
            .iter()
            .filter(|cached| cached.event.turn_off < now)
            .map(|cached| cached.id.clone())
            .collect();

        for id in expired {
            debug!(event_id = %id, "Purging expired schedule event");
            self.remove(zones, &id);
        }
    }

    /// Remove one event from the cache, turning its zone off through the
    /// schedule path (a manually owned zone stays on).
    pub fn remove(&mut self, zones: &mut ZoneStore, event_id: &EventId) {
        let Some(pos) = self.data.events.iter().position(|e| &e.id == event_id) else {
            return;
        };

        let cached = self.data.events.remove(pos);
        if let Some(zone_id) = cached.event.zone_id {
            if let Err(e) = zones.set_status(zone_id, false, StateOwner::Schedule) {
                warn!(event_id = %event_id, zone_id, error = %e, "Failed to turn zone off for removed event");
            }
        }
    }

    /// Set the calendar to follow. A different id discards the entire
    /// event cache before taking effect; the cache refills on the next
    /// fetch cycle.
    pub fn set_calendar_id(&mut self, id: Option<String>) {
        if id != self.data.calendar_id {
            info!(
                events_discarded = self.data.events.len(),
                "Calendar id changed, clearing schedule cache"
            );
            self.data.events.clear();
        }

        self.data.calendar_id = id;
        self.persist();
    }

    /// Events ordered ascending by turn-on time; ties keep insertion order.
    pub fn get_sorted(&self) -> Vec<(EventId, ScheduledEvent)> {
        let mut events: Vec<(EventId, ScheduledEvent)> = self
            .data
            .events
            .iter()
            .map(|e| (e.id.clone(), e.event.clone()))
            .collect();

        // Vec::sort_by_key is stable, which preserves insertion order on
        // equal turn-on times.
        events.sort_by_key(|(_, event)| event.turn_on);
        events
    }

    /// Fingerprint of the full schedule snapshot, for the client-facing
    /// `_data_hash`.
    pub fn data_hash(&self) -> String {
        crate::fingerprint(&self.data)
    }

    fn persist(&self) {
        crate::persist(&self.path, &self.data);
    }
}

impl std::fmt::Debug for ScheduleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleStore")
            .field("path", &self.path)
            .field("calendar_id", &self.data.calendar_id)
            .field("events", &self.data.events.len())
            .finish()
    }
}

/// The schedule file stores events as a JSON object keyed by event id; the
/// in-memory cache is a vec to keep insertion order. Bridge the two here.
mod event_map {
    use super::{CachedEvent, ScheduledEvent};
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use sprinkler_util::EventId;

    pub fn serialize<S: Serializer>(
        events: &[CachedEvent],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(events.len()))?;
        for cached in events {
            map.serialize_entry(&cached.id, &cached.event)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<CachedEvent>, D::Error> {
        struct EventMapVisitor;

        impl<'de> Visitor<'de> for EventMapVisitor {
            type Value = Vec<CachedEvent>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of event id to scheduled event")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut events = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, event)) = access.next_entry::<EventId, ScheduledEvent>()? {
                    events.push(CachedEvent { id, event });
                }
                Ok(events)
            }
        }

        deserializer.deserialize_map(EventMapVisitor)
    }
}
