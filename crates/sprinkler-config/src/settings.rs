//! Resolved configuration with defaults applied

use crate::schema::RawConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Default BCM pin assignments, matching the OpenSprinkler Pi wiring.
pub const DEFAULT_PIN_CLK: u8 = 4;
pub const DEFAULT_PIN_NOE: u8 = 17;
pub const DEFAULT_PIN_DAT: u8 = 27;
pub const DEFAULT_PIN_LAT: u8 = 22;

/// Default seconds between reconciliation passes.
pub const DEFAULT_QUERY_DELAY_SECONDS: u64 = 60;

/// Fully resolved daemon settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub gpio: GpioPins,
    pub storage: StoragePaths,
    pub calendar: CalendarSettings,
}

/// Resolved shift-register line assignments (BCM numbering)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPins {
    pub pin_clk: u8,
    pub pin_noe: u8,
    pub pin_dat: u8,
    pub pin_lat: u8,
}

/// Resolved state file locations
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub zone_file: PathBuf,
    pub schedule_file: PathBuf,
}

/// Resolved calendar polling settings
#[derive(Debug, Clone)]
pub struct CalendarSettings {
    /// No key means schedule polling stays disabled.
    pub api_key: Option<String>,
    pub base_url: String,
    pub query_delay: Duration,
}

impl Settings {
    /// Apply defaults to a validated raw configuration.
    pub fn from_raw(raw: RawConfig) -> Self {
        let data_dir = sprinkler_util::default_data_dir();

        Self {
            gpio: GpioPins {
                pin_clk: raw.gpio.pin_clk.unwrap_or(DEFAULT_PIN_CLK),
                pin_noe: raw.gpio.pin_noe.unwrap_or(DEFAULT_PIN_NOE),
                pin_dat: raw.gpio.pin_dat.unwrap_or(DEFAULT_PIN_DAT),
                pin_lat: raw.gpio.pin_lat.unwrap_or(DEFAULT_PIN_LAT),
            },
            storage: StoragePaths {
                zone_file: raw
                    .storage
                    .zone_file
                    .unwrap_or_else(|| data_dir.join("zones.json")),
                schedule_file: raw
                    .storage
                    .schedule_file
                    .unwrap_or_else(|| data_dir.join("schedule.json")),
            },
            calendar: CalendarSettings {
                api_key: raw.calendar.api_key,
                base_url: raw.calendar.base_url.unwrap_or_else(|| {
                    "https://www.googleapis.com/calendar/v3/calendars".to_string()
                }),
                query_delay: Duration::from_secs(
                    raw.calendar
                        .query_delay_seconds
                        .unwrap_or(DEFAULT_QUERY_DELAY_SECONDS),
                ),
            },
        }
    }
}
