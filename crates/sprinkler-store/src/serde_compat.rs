//! Serde adapters for the legacy state-file formats.
//!
//! The JSON files this daemon inherits encode booleans as `0`/`1` and local
//! times as `"YYYY-MM-DD HH:MM:SS[.ffffff]"` strings (empty string for
//! "never set"). These modules keep the on-disk layout byte-compatible
//! while the in-memory model uses real types.

/// Booleans stored as `0` / `1` integers.
pub(crate) mod bit_bool {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Ok(value != 0)
    }
}

/// Required local timestamps in the legacy layout.
pub(crate) mod legacy_time {
    use chrono::{DateTime, Local};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Local>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&sprinkler_util::format_timestamp(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Local>, D::Error> {
        let s = String::deserialize(deserializer)?;
        sprinkler_util::parse_timestamp(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", s)))
    }
}

/// Optional local timestamps; the empty string means "never set".
pub(crate) mod legacy_time_opt {
    use chrono::{DateTime, Local};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Local>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&sprinkler_util::format_timestamp(dt)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Local>>, D::Error> {
        // Unparseable values degrade to None rather than rejecting the file;
        // the zone then behaves as freshly created.
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().and_then(sprinkler_util::parse_timestamp))
    }
}
