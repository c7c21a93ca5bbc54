//! Zone state store
//!
//! Owns the authoritative answer to "is zone N on", including the
//! ownership arbitration between the manual command path and the
//! calendar schedule, and the max-run safety cutoff for manually
//! started zones.

use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::serde_compat::{bit_bool, legacy_time_opt};
use crate::{StoreError, StoreResult};

/// Default number of zones on a freshly provisioned controller.
pub const DEFAULT_ZONE_COUNT: usize = 16;

/// Default max-run cutoff in hours.
pub const DEFAULT_MAX_RUN_HOURS: i64 = 3;

/// Which control path last authoritatively set a zone's status.
///
/// Stored as `"M"` / `"S"` in the zone file. Governs the override rule:
/// the schedule may never turn off a manually activated zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOwner {
    Manual,
    Schedule,
}

impl Serialize for StateOwner {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            StateOwner::Manual => "M",
            StateOwner::Schedule => "S",
        })
    }
}

impl<'de> Deserialize<'de> for StateOwner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Files written before ownership tracking carry "" here; treat
        // anything that is not an explicit "S" as manual.
        let s = String::deserialize(deserializer)?;
        Ok(if s == "S" {
            StateOwner::Schedule
        } else {
            StateOwner::Manual
        })
    }
}

/// A single valve output channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    #[serde(default)]
    pub name: String,

    #[serde(with = "bit_bool", default)]
    pub status: bool,

    #[serde(rename = "state_owner", default = "default_owner")]
    pub owner: StateOwner,

    /// When the status last flipped; drives the max-run cutoff.
    #[serde(with = "legacy_time_opt", default)]
    pub start_time: Option<DateTime<Local>>,
}

fn default_owner() -> StateOwner {
    StateOwner::Manual
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            name: String::new(),
            status: false,
            owner: StateOwner::Manual,
            start_time: None,
        }
    }
}

/// On-disk layout of the zone file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ZoneData {
    zone_count: usize,

    /// Hours a manually started zone may run before being forced off.
    #[serde(default = "default_max_run")]
    max_run: i64,

    zone: Vec<Zone>,
}

fn default_max_run() -> i64 {
    DEFAULT_MAX_RUN_HOURS
}

impl ZoneData {
    fn with_count(zone_count: usize) -> Self {
        Self {
            zone_count,
            max_run: DEFAULT_MAX_RUN_HOURS,
            zone: vec![Zone::default(); zone_count.max(1)],
        }
    }
}

/// JSON-file-backed store for zone state.
pub struct ZoneStore {
    path: PathBuf,
    data: ZoneData,
}

impl ZoneStore {
    /// Load the zone file, creating it with `default_zone_count` empty
    /// blocks when missing or unreadable.
    pub fn open(path: impl Into<PathBuf>, default_zone_count: usize) -> Self {
        let path = path.into();

        let mut data = match crate::load_json::<ZoneData>(&path) {
            Ok(data) => data,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Zone file not found, initializing");
                ZoneData::with_count(default_zone_count)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load zone file, starting fresh");
                ZoneData::with_count(default_zone_count)
            }
        };

        // Older files can be short on blocks; grow to the configured count.
        while data.zone.len() < data.zone_count {
            data.zone.push(Zone::default());
        }

        let store = Self { path, data };
        store.persist();
        store
    }

    pub fn zone_count(&self) -> usize {
        self.data.zone_count
    }

    pub fn max_run_hours(&self) -> i64 {
        self.data.max_run
    }

    pub fn zones(&self) -> &[Zone] {
        &self.data.zone
    }

    /// Set the number of zones available on the connected device.
    ///
    /// Grow-only at the block level: shrinking the count leaves existing
    /// blocks in storage, but they drop out of the hardware status vector.
    pub fn set_count(&mut self, count: usize) {
        self.data.zone_count = count;
        while self.data.zone.len() < count {
            self.data.zone.push(Zone::default());
        }
        self.persist();
    }

    /// Set the max-run cutoff in hours.
    pub fn set_max_run(&mut self, hours: i64) {
        self.data.max_run = hours;
        self.persist();
    }

    /// Update the user-facing zone names, growing the block list as needed.
    ///
    /// Names are UI-only; they never affect device operation, but they do
    /// participate in schedule name resolution.
    pub fn set_names<S: AsRef<str>>(&mut self, names: &[S]) {
        for (zone_id, name) in names.iter().enumerate() {
            if self.data.zone.len() <= zone_id {
                self.data.zone.push(Zone::default());
            }
            self.data.zone[zone_id].name = name.as_ref().to_string();
        }
        self.persist();
    }

    /// Update the on/off status of a zone.
    ///
    /// This records what the hardware state should be; the shift register
    /// is written separately. Applies the ownership rule: the schedule
    /// cannot turn off a manually owned zone. On an accepted request the
    /// owner is always updated; `start_time` resets only when the status
    /// actually flips. Returns whether the status changed.
    ///
    /// # Errors
    ///
    /// [`StoreError::ZoneOutOfRange`] when `zone_id` is not within the
    /// configured zone count.
    pub fn set_status(
        &mut self,
        zone_id: usize,
        status: bool,
        owner: StateOwner,
    ) -> StoreResult<bool> {
        if zone_id >= self.data.zone_count || zone_id >= self.data.zone.len() {
            return Err(StoreError::ZoneOutOfRange {
                zone_id,
                zone_count: self.data.zone_count,
            });
        }

        let zone = &mut self.data.zone[zone_id];

        // Manually turned on zones can't be turned off by the schedule.
        if !status && zone.owner == StateOwner::Manual && owner == StateOwner::Schedule {
            debug!(zone_id, "Schedule off request ignored, zone is manually owned");
            return Ok(false);
        }

        let changed = zone.status != status;
        if changed {
            zone.start_time = Some(sprinkler_util::now());
        }
        zone.status = status;
        zone.owner = owner;

        if changed {
            info!(zone_id, status, owner = ?owner, "Zone status updated");
        }

        self.persist();
        Ok(changed)
    }

    /// Force off every manually owned zone that has been running for the
    /// max-run cutoff or longer (inclusive). Returns whether anything
    /// changed; persists once if so.
    pub fn clear_long_running_zones(&mut self) -> bool {
        let cutoff = Duration::hours(self.data.max_run);
        let max_run = self.data.max_run;
        let now = sprinkler_util::now();
        let mut changed = false;

        for (zone_id, zone) in self.data.zone.iter_mut().enumerate() {
            if zone.owner != StateOwner::Manual || !zone.status {
                continue;
            }

            let Some(start) = zone.start_time else {
                warn!(zone_id, "Running zone has no start time, skipping max-run check");
                continue;
            };

            if now - start >= cutoff {
                info!(zone_id, hours = max_run, "Forcing long-running zone off");
                zone.status = false;
                changed = true;
            }
        }

        if changed {
            self.persist();
        }
        changed
    }

    /// Resolve a zone name to its index.
    ///
    /// Exact case-insensitive name match wins, first match in zone order on
    /// duplicate names. When nothing is named to match, `"Zone <N>"` falls
    /// back to slot N-1 provided that slot exists, is within the zone
    /// count, and has no name of its own.
    pub fn resolve_zone_id(&self, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }

        if let Some(zone_id) = self
            .data
            .zone
            .iter()
            .position(|z| !z.name.is_empty() && z.name.eq_ignore_ascii_case(name))
        {
            return Some(zone_id);
        }

        let zone_id = parse_zone_pattern(name)?.checked_sub(1)?;
        if zone_id < self.data.zone.len()
            && zone_id < self.data.zone_count
            && self.data.zone[zone_id].name.is_empty()
        {
            return Some(zone_id);
        }

        None
    }

    /// The status vector sent to the shift register, in zone-index order.
    /// Blocks beyond the configured count are excluded.
    pub fn status_bits(&self) -> Vec<bool> {
        (0..self.data.zone_count)
            .map(|i| self.data.zone.get(i).is_some_and(|z| z.status))
            .collect()
    }

    /// Fingerprint of the full zone snapshot, for the client-facing
    /// `_data_hash`.
    pub fn data_hash(&self) -> String {
        crate::fingerprint(&self.data)
    }

    /// Fingerprint of the status vector alone. This is the hardware write
    /// gate: mutations that leave every zone's status unchanged (owner or
    /// name updates, schedule churn) must not trigger a register write.
    pub fn status_hash(&self) -> String {
        crate::fingerprint(&self.status_bits())
    }

    /// Serialize the snapshot for the `get-zones` view.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.data).unwrap_or(serde_json::Value::Null)
    }

    fn persist(&self) {
        crate::persist(&self.path, &self.data);
    }
}

/// Parse the `"Zone <N>"` positional pattern: the literal prefix, at least
/// one whitespace character, then digits only.
fn parse_zone_pattern(name: &str) -> Option<usize> {
    let rest = name.strip_prefix("Zone")?;
    let digits = rest.trim_start();
    if digits.len() == rest.len() || digits.is_empty() {
        return None;
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl std::fmt::Debug for ZoneStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneStore")
            .field("path", &self.path)
            .field("zone_count", &self.data.zone_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_store(count: usize) -> (TempDir, ZoneStore) {
        let dir = TempDir::new().unwrap();
        let store = ZoneStore::open(dir.path().join("zones.json"), count);
        (dir, store)
    }

    #[test]
    fn schedule_cannot_turn_off_manual_zone() {
        let (_dir, mut store) = make_store(4);

        store.set_status(1, true, StateOwner::Manual).unwrap();
        let changed = store.set_status(1, false, StateOwner::Schedule).unwrap();

        assert!(!changed);
        assert!(store.zones()[1].status);
        assert_eq!(store.zones()[1].owner, StateOwner::Manual);
    }

    #[test]
    fn manual_request_always_takes_effect() {
        let (_dir, mut store) = make_store(4);

        store.set_status(1, true, StateOwner::Schedule).unwrap();
        let changed = store.set_status(1, false, StateOwner::Manual).unwrap();

        assert!(changed);
        assert!(!store.zones()[1].status);
        assert_eq!(store.zones()[1].owner, StateOwner::Manual);
    }

    #[test]
    fn failed_persist_keeps_in_memory_state() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        // The state file's parent is a regular file, so every save fails.
        let mut store = ZoneStore::open(blocker.join("zones.json"), 4);

        let changed = store.set_status(2, true, StateOwner::Manual).unwrap();
        assert!(changed);
        assert!(store.zones()[2].status);
        assert!(!blocker.join("zones.json").exists());
    }

    #[test]
    fn out_of_range_zone_is_rejected() {
        let (_dir, mut store) = make_store(4);

        let result = store.set_status(4, true, StateOwner::Manual);
        assert!(matches!(
            result,
            Err(StoreError::ZoneOutOfRange { zone_id: 4, .. })
        ));
    }

    #[test]
    fn start_time_resets_only_on_actual_flip() {
        let (_dir, mut store) = make_store(4);

        store.set_status(0, true, StateOwner::Manual).unwrap();
        let first_start = store.zones()[0].start_time;
        assert!(first_start.is_some());

        // Same status again: no-op write, start_time untouched.
        let changed = store.set_status(0, true, StateOwner::Manual).unwrap();
        assert!(!changed);
        assert_eq!(store.zones()[0].start_time, first_start);
    }

    #[test]
    fn max_run_cutoff_is_inclusive() {
        let (_dir, mut store) = make_store(4);
        store.set_max_run(2);

        // Three manual zones: over, exactly at, and under the cutoff.
        for zone_id in 0..3 {
            store.set_status(zone_id, true, StateOwner::Manual).unwrap();
        }
        let now = sprinkler_util::now();
        store.data.zone[0].start_time = Some(now - Duration::hours(3));
        store.data.zone[1].start_time = Some(now - Duration::hours(2));
        store.data.zone[2].start_time = Some(now - Duration::minutes(30));

        let changed = store.clear_long_running_zones();

        assert!(changed);
        assert!(!store.zones()[0].status);
        assert!(!store.zones()[1].status, "boundary is inclusive");
        assert!(store.zones()[2].status);
        // Owner is untouched by the cutoff.
        assert_eq!(store.zones()[0].owner, StateOwner::Manual);
    }

    #[test]
    fn max_run_ignores_schedule_owned_zones() {
        let (_dir, mut store) = make_store(4);
        store.set_max_run(1);

        store.set_status(0, true, StateOwner::Schedule).unwrap();
        store.data.zone[0].start_time = Some(sprinkler_util::now() - Duration::hours(5));

        assert!(!store.clear_long_running_zones());
        assert!(store.zones()[0].status);
    }

    #[test]
    fn resolve_exact_name_case_insensitive() {
        let (_dir, mut store) = make_store(4);
        store.set_names(&["Front Lawn", "Patio"]);

        assert_eq!(store.resolve_zone_id("patio"), Some(1));
        assert_eq!(store.resolve_zone_id("FRONT LAWN"), Some(0));
        assert_eq!(store.resolve_zone_id("Greenhouse"), None);
    }

    #[test]
    fn resolve_positional_fallback_for_unnamed_slot() {
        let (_dir, mut store) = make_store(4);
        store.set_names(&["Front Lawn"]);

        // zone[2] is unnamed, so "Zone 3" maps to index 2.
        assert_eq!(store.resolve_zone_id("Zone 3"), Some(2));
    }

    #[test]
    fn resolve_positional_fallback_blocked_by_name() {
        let (_dir, mut store) = make_store(4);
        store.set_names(&["", "", "Patio"]);

        assert_eq!(store.resolve_zone_id("Zone 3"), None);
    }

    #[test]
    fn resolve_positional_fallback_respects_zone_count() {
        let (_dir, mut store) = make_store(4);
        store.set_names(&["", "", "", "", "", ""]);
        store.set_count(4);

        assert_eq!(store.resolve_zone_id("Zone 6"), None);
        assert_eq!(store.resolve_zone_id("Zone 4"), Some(3));
        assert_eq!(store.resolve_zone_id("Zone 0"), None);
        assert_eq!(store.resolve_zone_id("Zone3"), None);
    }

    #[test]
    fn zone_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zones.json");

        {
            let mut store = ZoneStore::open(&path, 8);
            store.set_names(&["Front", "Back"]);
            store.set_max_run(5);
            store.set_status(1, true, StateOwner::Schedule).unwrap();
        }

        let reloaded = ZoneStore::open(&path, 8);
        assert_eq!(reloaded.zone_count(), 8);
        assert_eq!(reloaded.max_run_hours(), 5);
        assert_eq!(reloaded.zones()[0].name, "Front");
        assert!(reloaded.zones()[1].status);
        assert_eq!(reloaded.zones()[1].owner, StateOwner::Schedule);
        assert!(reloaded.zones()[1].start_time.is_some());
    }

    #[test]
    fn legacy_file_without_max_run_or_owner_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zones.json");
        std::fs::write(
            &path,
            r#"{"zone_count":2,"zone":[{"name":"Front","status":1},{"name":"","status":0}]}"#,
        )
        .unwrap();

        let store = ZoneStore::open(&path, 16);
        assert_eq!(store.zone_count(), 2);
        assert_eq!(store.max_run_hours(), DEFAULT_MAX_RUN_HOURS);
        assert!(store.zones()[0].status);
        assert_eq!(store.zones()[0].owner, StateOwner::Manual);
        assert!(store.zones()[0].start_time.is_none());
    }

    #[test]
    fn shrinking_count_keeps_blocks_but_trims_status_bits() {
        let (_dir, mut store) = make_store(4);
        store.set_status(3, true, StateOwner::Manual).unwrap();

        store.set_count(2);

        assert_eq!(store.zones().len(), 4);
        assert_eq!(store.status_bits(), vec![false, false]);
        assert!(matches!(
            store.set_status(3, true, StateOwner::Manual),
            Err(StoreError::ZoneOutOfRange { .. })
        ));
    }

    #[test]
    fn data_hash_tracks_status_changes() {
        let (_dir, mut store) = make_store(4);
        let before = store.data_hash();

        store.set_status(0, true, StateOwner::Manual).unwrap();
        assert_ne!(store.data_hash(), before);
    }
}
