//! Command dispatcher
//!
//! Maps the request-layer command surface onto controller operations.
//! Validation failures come back as nonzero error codes in the reply
//! envelope; they never touch daemon state.

use serde_json::json;
use tracing::warn;

use sprinkler_api::{Command, ErrorCode, Reply, DATA_HASH_KEY};
use sprinkler_core::Controller;

pub fn handle_command(controller: &mut Controller, command: Command) -> Reply {
    match command {
        Command::GetZones => {
            let mut data = controller.zones().to_json();
            if let Some(map) = data.as_object_mut() {
                map.insert(
                    DATA_HASH_KEY.to_string(),
                    json!(controller.zones().data_hash()),
                );
            }
            Reply::with_data(data)
        }

        Command::GetSchedule { hash } => {
            // Expired events drop out before the snapshot; if that turned
            // any zone off, the register was flushed as part of it.
            controller.refresh_schedule();

            let current = controller.schedule().data_hash();
            if hash.as_deref() == Some(current.as_str()) {
                return Reply::with_data(json!({ DATA_HASH_KEY: current }));
            }

            let events: Vec<serde_json::Value> = controller
                .schedule()
                .get_sorted()
                .into_iter()
                .map(|(id, event)| {
                    let mut value = serde_json::to_value(&event).unwrap_or(json!({}));
                    if let Some(map) = value.as_object_mut() {
                        map.insert("event_id".to_string(), json!(id.as_str()));
                    }
                    value
                })
                .collect();

            Reply::with_data(json!({
                "calendar_id": controller.calendar_id(),
                "server_time": sprinkler_util::now()
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string(),
                "events": events,
                DATA_HASH_KEY: current,
            }))
        }

        Command::SaveCalendarId { id } => {
            let Some(id) = id else {
                warn!("save-calendar-id called without id parameter");
                return Reply::fail(ErrorCode::MissingParameter);
            };
            controller.save_calendar_id(if id.is_empty() { None } else { Some(id) });
            Reply::ok()
        }

        Command::SaveMaxRun { hours } => {
            let Some(hours) = hours else {
                warn!("save-max-run called without hours parameter");
                return Reply::fail(ErrorCode::MissingParameter);
            };
            controller.save_max_run(hours);
            Reply::ok()
        }

        Command::SaveZoneCount { count } => {
            let Some(count) = count else {
                warn!("save-zone-count called without count parameter");
                return Reply::fail(ErrorCode::MissingParameter);
            };
            controller.save_zone_count(count);
            Reply::ok()
        }

        Command::SaveZoneNames { names } => {
            let Some(names) = names else {
                warn!("save-zone-names called without names parameter");
                return Reply::fail(ErrorCode::MissingParameter);
            };
            controller.save_zone_names(&names);
            Reply::ok()
        }

        Command::UpdateZoneStatus { zone, status } => {
            let Some(zone) = zone else {
                warn!("update-zone-status called without zone parameter");
                return Reply::fail(ErrorCode::MissingParameter);
            };
            if zone >= controller.zones().zone_count() {
                warn!(zone, "update-zone-status called with out-of-range zone id");
                return Reply::fail(ErrorCode::InvalidZoneId);
            }
            let Some(status) = status else {
                warn!("update-zone-status called without status parameter");
                return Reply::fail(ErrorCode::MissingStatus);
            };

            match controller.set_zone_status(zone, status) {
                Ok(()) => Reply::ok(),
                Err(e) => {
                    warn!(zone, error = %e, "Zone status update rejected");
                    Reply::fail(ErrorCode::InvalidZoneId)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sprinkler_gpio::{MockLines, ShiftRegister};
    use sprinkler_store::{ScheduleStore, ScheduledEvent, ZoneStore};
    use sprinkler_util::EventId;
    use tempfile::TempDir;

    fn make_controller(zone_count: usize) -> (TempDir, Controller) {
        let dir = TempDir::new().unwrap();
        let zones = ZoneStore::open(dir.path().join("zones.json"), zone_count);
        let schedule = ScheduleStore::open(dir.path().join("schedule.json"));
        let register = ShiftRegister::new(Box::new(MockLines::new()), &zones.status_bits());
        (dir, Controller::new(zones, schedule, register))
    }

    #[test]
    fn get_zones_carries_data_hash() {
        let (_dir, mut controller) = make_controller(4);

        let reply = handle_command(&mut controller, Command::GetZones);
        assert!(reply.is_ok());

        let data = reply.data.unwrap();
        assert_eq!(data["zone_count"], 4);
        assert!(data[DATA_HASH_KEY].is_string());
    }

    #[test]
    fn get_schedule_short_circuits_on_matching_hash() {
        let (_dir, mut controller) = make_controller(4);

        let reply = handle_command(&mut controller, Command::GetSchedule { hash: None });
        let data = reply.data.unwrap();
        let hash = data[DATA_HASH_KEY].as_str().unwrap().to_string();
        assert!(data["events"].is_array());

        let reply = handle_command(
            &mut controller,
            Command::GetSchedule {
                hash: Some(hash.clone()),
            },
        );
        let data = reply.data.unwrap();
        assert_eq!(data[DATA_HASH_KEY], json!(hash));
        assert!(data.get("events").is_none());
    }

    #[test]
    fn get_schedule_payload_matches_legacy_shape() {
        let (_dir, mut controller) = make_controller(4);

        let now = sprinkler_util::now();
        controller.reconcile(&[(
            EventId::new("evt-1"),
            ScheduledEvent {
                zone_name: "Zone 1".to_string(),
                zone_id: None,
                turn_on: now - Duration::minutes(5),
                turn_off: now + Duration::minutes(25),
                running: true,
            },
        )]);

        let data = handle_command(&mut controller, Command::GetSchedule { hash: None })
            .data
            .unwrap();

        assert!(data["server_time"].is_string());
        assert_eq!(data["events"][0]["event_id"], "evt-1");
        assert_eq!(data["events"][0]["zone_name"], "Zone 1");
    }

    #[test]
    fn missing_parameters_yield_error_one() {
        let (_dir, mut controller) = make_controller(4);

        for command in [
            Command::SaveCalendarId { id: None },
            Command::SaveMaxRun { hours: None },
            Command::SaveZoneCount { count: None },
            Command::SaveZoneNames { names: None },
            Command::UpdateZoneStatus {
                zone: None,
                status: Some(true),
            },
        ] {
            let reply = handle_command(&mut controller, command);
            assert_eq!(reply.error, 1);
        }
    }

    #[test]
    fn out_of_range_zone_yields_error_two() {
        let (_dir, mut controller) = make_controller(4);

        let reply = handle_command(
            &mut controller,
            Command::UpdateZoneStatus {
                zone: Some(4),
                status: Some(true),
            },
        );
        assert_eq!(reply.error, 2);
    }

    #[test]
    fn missing_status_yields_error_three() {
        let (_dir, mut controller) = make_controller(4);

        let reply = handle_command(
            &mut controller,
            Command::UpdateZoneStatus {
                zone: Some(0),
                status: None,
            },
        );
        assert_eq!(reply.error, 3);
    }

    #[test]
    fn update_zone_status_round_trips_through_get_zones() {
        let (_dir, mut controller) = make_controller(4);

        let reply = handle_command(
            &mut controller,
            Command::UpdateZoneStatus {
                zone: Some(2),
                status: Some(true),
            },
        );
        assert!(reply.is_ok());

        let data = handle_command(&mut controller, Command::GetZones)
            .data
            .unwrap();
        assert_eq!(data["zone"][2]["status"], 1);
        assert_eq!(data["zone"][2]["state_owner"], "M");
    }
}
