//! Command and reply types for the sprinklerd protocol

use serde::{Deserialize, Serialize};

/// All possible commands from the request layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    /// Get the full zone snapshot
    GetZones,

    /// Get the schedule cache, sorted by turn-on time.
    ///
    /// When `hash` matches the current snapshot fingerprint the reply
    /// carries a skeleton payload (fingerprint only).
    GetSchedule {
        #[serde(default)]
        hash: Option<String>,
    },

    /// Set or clear the calendar to follow
    SaveCalendarId {
        #[serde(default)]
        id: Option<String>,
    },

    /// Set the maximum continuous run time for manually activated zones
    SaveMaxRun {
        #[serde(default)]
        hours: Option<i64>,
    },

    /// Set the number of zones wired to the register chain
    SaveZoneCount {
        #[serde(default)]
        count: Option<usize>,
    },

    /// Set display names for zones, positionally from zone 0
    SaveZoneNames {
        #[serde(default)]
        names: Option<Vec<String>>,
    },

    /// Manually turn a zone on or off
    UpdateZoneStatus {
        #[serde(default)]
        zone: Option<usize>,
        #[serde(default)]
        status: Option<bool>,
    },
}

/// Validation failures surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingParameter,
    InvalidZoneId,
    MissingStatus,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        match self {
            ErrorCode::MissingParameter => 1,
            ErrorCode::InvalidZoneId => 2,
            ErrorCode::MissingStatus => 3,
        }
    }

    pub fn desc(self) -> &'static str {
        match self {
            ErrorCode::MissingParameter => "Required parameter missing",
            ErrorCode::InvalidZoneId => "Invalid zone id",
            ErrorCode::MissingStatus => "Zone status missing",
        }
    }
}

/// Reply envelope: `error` 0 on success, nonzero validation code otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub error: u32,
    pub desc: String,

    /// Command-specific payload, absent on plain acknowledgements and
    /// validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Reply {
    pub fn ok() -> Self {
        Self {
            error: 0,
            desc: "OK".to_string(),
            data: None,
        }
    }

    pub fn with_data(data: serde_json::Value) -> Self {
        Self {
            error: 0,
            desc: "OK".to_string(),
            data: Some(data),
        }
    }

    pub fn fail(code: ErrorCode) -> Self {
        Self {
            error: code.code(),
            desc: code.desc().to_string(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_serialization() {
        let json = r#"{"command":"update-zone-status","zone":4,"status":true}"#;
        let parsed: Command = serde_json::from_str(json).unwrap();

        assert!(matches!(
            parsed,
            Command::UpdateZoneStatus {
                zone: Some(4),
                status: Some(true),
            }
        ));
    }

    #[test]
    fn missing_parameters_deserialize_as_none() {
        let parsed: Command =
            serde_json::from_str(r#"{"command":"update-zone-status"}"#).unwrap();

        assert!(matches!(
            parsed,
            Command::UpdateZoneStatus {
                zone: None,
                status: None,
            }
        ));
    }

    #[test]
    fn command_tags_are_kebab_case() {
        let json = serde_json::to_string(&Command::GetZones).unwrap();
        assert!(json.contains("get-zones"));

        let json = serde_json::to_string(&Command::SaveCalendarId { id: None }).unwrap();
        assert!(json.contains("save-calendar-id"));
    }

    #[test]
    fn reply_envelope() {
        let reply = Reply::fail(ErrorCode::InvalidZoneId);
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"error\":2"));
        assert!(!json.contains("data"));

        let reply = Reply::with_data(serde_json::json!({"zone_count": 16}));
        assert!(reply.is_ok());
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains("\"error\":0"));
        assert!(json.contains("zone_count"));
    }
}
