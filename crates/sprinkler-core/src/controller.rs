//! The controller: zone state, schedule cache, and hardware as one unit

use tracing::{info, warn};

use sprinkler_gpio::ShiftRegister;
use sprinkler_store::{ScheduleStore, ScheduledEvent, StateOwner, StoreResult, ZoneStore};
use sprinkler_util::EventId;

/// Owns all mutable daemon state.
///
/// Callers wrap the controller in a single async mutex; each method is one
/// read-modify-write sequence that must not interleave with another, so
/// the command path and the scheduler tick serialize on that lock.
pub struct Controller {
    zones: ZoneStore,
    schedule: ScheduleStore,
    register: ShiftRegister,
}

impl Controller {
    pub fn new(zones: ZoneStore, schedule: ScheduleStore, register: ShiftRegister) -> Self {
        Self {
            zones,
            schedule,
            register,
        }
    }

    pub fn zones(&self) -> &ZoneStore {
        &self.zones
    }

    pub fn schedule(&self) -> &ScheduleStore {
        &self.schedule
    }

    pub fn calendar_id(&self) -> Option<String> {
        self.schedule.calendar_id().map(str::to_string)
    }

    /// Manually turn a zone on or off.
    ///
    /// The manual path writes the register unconditionally: a command is
    /// the user asking the hardware to match, even when the stored status
    /// did not change.
    pub fn set_zone_status(&mut self, zone_id: usize, status: bool) -> StoreResult<()> {
        self.zones.set_status(zone_id, status, StateOwner::Manual)?;
        self.register.write(&self.zones.status_bits());
        Ok(())
    }

    /// Merge a fetched event set and drive zones from the cached schedule.
    ///
    /// The register is written only if the status vector changed; schedule
    /// churn that leaves every zone as-is stays off the wire.
    pub fn reconcile(&mut self, events: &[(EventId, ScheduledEvent)]) {
        let before = self.zones.status_hash();

        self.schedule.update(&mut self.zones, events, true);

        let driven: Vec<(usize, bool)> = self
            .schedule
            .events()
            .filter_map(|(_, e)| e.zone_id.map(|id| (id, e.running)))
            .collect();
        for (zone_id, running) in driven {
            if let Err(e) = self.zones.set_status(zone_id, running, StateOwner::Schedule) {
                warn!(zone_id, error = %e, "Skipping schedule update for stale zone id");
            }
        }

        self.flush_if_changed(&before);
    }

    /// Force off manually activated zones that ran past the max-run cutoff.
    pub fn sweep_long_running(&mut self) {
        let before = self.zones.status_hash();
        if self.zones.clear_long_running_zones() {
            self.flush_if_changed(&before);
        }
    }

    /// Drop expired events ahead of a schedule read, flushing the register
    /// if any zone turned off with them.
    pub fn refresh_schedule(&mut self) {
        let before = self.zones.status_hash();
        self.schedule.remove_past_events(&mut self.zones);
        self.flush_if_changed(&before);
    }

    pub fn save_calendar_id(&mut self, id: Option<String>) {
        self.schedule.set_calendar_id(id);
    }

    pub fn save_max_run(&mut self, hours: i64) {
        self.zones.set_max_run(hours);
    }

    pub fn save_zone_count(&mut self, count: usize) {
        self.zones.set_count(count);
    }

    pub fn save_zone_names(&mut self, names: &[String]) {
        self.zones.set_names(names);
    }

    /// Turn every zone off and release the hardware.
    pub fn shutdown(&mut self) {
        info!("Turning all zones off");
        let all_off = vec![false; self.zones.zone_count()];
        self.register.close(&all_off);
    }

    fn flush_if_changed(&mut self, before: &str) {
        if self.zones.status_hash() != before {
            self.register.write(&self.zones.status_bits());
        }
    }
}
