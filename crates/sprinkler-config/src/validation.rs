//! Configuration validation

use crate::schema::RawConfig;
use crate::settings::{DEFAULT_PIN_CLK, DEFAULT_PIN_DAT, DEFAULT_PIN_LAT, DEFAULT_PIN_NOE};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("GPIO pin {pin} assigned to more than one line")]
    SharedPin { pin: u8 },

    #[error("calendar.query_delay_seconds must be nonzero")]
    ZeroQueryDelay,

    #[error("calendar.base_url must not be empty")]
    EmptyBaseUrl,
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // The four register lines must land on distinct pins, defaults included.
    let pins = [
        config.gpio.pin_clk.unwrap_or(DEFAULT_PIN_CLK),
        config.gpio.pin_noe.unwrap_or(DEFAULT_PIN_NOE),
        config.gpio.pin_dat.unwrap_or(DEFAULT_PIN_DAT),
        config.gpio.pin_lat.unwrap_or(DEFAULT_PIN_LAT),
    ];
    let mut seen = HashSet::new();
    for pin in pins {
        if !seen.insert(pin) {
            errors.push(ValidationError::SharedPin { pin });
        }
    }

    if config.calendar.query_delay_seconds == Some(0) {
        errors.push(ValidationError::ZeroQueryDelay);
    }

    if config
        .calendar
        .base_url
        .as_deref()
        .is_some_and(|url| url.is_empty())
    {
        errors.push(ValidationError::EmptyBaseUrl);
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawCalendarConfig, RawGpioConfig, RawStorageConfig};

    fn raw() -> RawConfig {
        RawConfig {
            config_version: 1,
            gpio: RawGpioConfig::default(),
            storage: RawStorageConfig::default(),
            calendar: RawCalendarConfig::default(),
        }
    }

    #[test]
    fn defaults_validate_clean() {
        assert!(validate_config(&raw()).is_empty());
    }

    #[test]
    fn shared_pin_detection() {
        let mut config = raw();
        config.gpio.pin_noe = Some(DEFAULT_PIN_CLK);

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::SharedPin { .. })));
    }

    #[test]
    fn zero_delay_rejected() {
        let mut config = raw();
        config.calendar.query_delay_seconds = Some(0);

        let errors = validate_config(&config);
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::ZeroQueryDelay)));
    }
}
