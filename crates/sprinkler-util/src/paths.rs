//! Default paths for sprinklerd components
//!
//! State files are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/sprinklerd/config.toml` or `~/.config/sprinklerd/config.toml`
//! - Data: `$XDG_DATA_HOME/sprinklerd` or `~/.local/share/sprinklerd`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const SPRINKLER_DATA_DIR_ENV: &str = "SPRINKLER_DATA_DIR";

/// Application subdirectory name
const APP_DIR: &str = "sprinklerd";

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(APP_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$SPRINKLER_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/sprinklerd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/sprinklerd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(SPRINKLER_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_names_the_app() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("sprinklerd"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn data_dir_names_the_app() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("sprinklerd"));
    }
}
