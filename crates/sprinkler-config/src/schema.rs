//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Shift-register line assignments
    #[serde(default)]
    pub gpio: RawGpioConfig,

    /// State file locations
    #[serde(default)]
    pub storage: RawStorageConfig,

    /// Calendar polling settings
    #[serde(default)]
    pub calendar: RawCalendarConfig,
}

/// GPIO pin assignments (BCM numbering)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawGpioConfig {
    /// Shift clock line
    pub pin_clk: Option<u8>,

    /// Output-enable line (active low)
    pub pin_noe: Option<u8>,

    /// Serial data line
    pub pin_dat: Option<u8>,

    /// Latch line
    pub pin_lat: Option<u8>,
}

/// State file locations
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStorageConfig {
    /// Zone state file (default: <data dir>/zones.json)
    pub zone_file: Option<PathBuf>,

    /// Schedule cache file (default: <data dir>/schedule.json)
    pub schedule_file: Option<PathBuf>,
}

/// Calendar polling settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawCalendarConfig {
    /// API key for the calendar service
    pub api_key: Option<String>,

    /// Base URL of the calendar API
    pub base_url: Option<String>,

    /// Seconds between schedule reconciliation passes
    pub query_delay_seconds: Option<u64>,
}
