//! Loads gateway [`Settings`] from the path named by `KAIROS_CONFIG_PATH`.
//!
//! Falls back to `./config.json` relative to the working directory when the
//! variable is unset, matching the default the hot-reload watcher uses.

use crate::models::settings::Settings;
use std::env;
use std::error::Error;
use std::fmt;

const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Error loading or parsing the configuration file.
#[derive(Debug)]
pub enum LoadSettingsError {
    Io { path: String, source: std::io::Error },
    Parse { path: String, source: serde_json::Error },
}

impl fmt::Display for LoadSettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadSettingsError::Io { path, source } => {
                write!(f, "failed to read config file {}: {}", path, source)
            }
            LoadSettingsError::Parse { path, source } => {
                write!(f, "failed to parse config file {}: {}", path, source)
            }
        }
    }
}

impl Error for LoadSettingsError {}

/// Returns the configuration file path: `KAIROS_CONFIG_PATH` if set, else
/// [`DEFAULT_CONFIG_PATH`].
pub fn config_path() -> String {
    env::var("KAIROS_CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Loads and parses gateway settings from the configured path.
///
/// This only deserializes the file; it does not run
/// [`crate::config::validation::ConfigValidator`] or [`Settings::validate`] —
/// callers are expected to validate immediately after loading so startup
/// fails fast on a bad configuration.
pub fn load_settings() -> Result<Settings, LoadSettingsError> {
    load_settings_from_path(&config_path())
}

/// Loads and parses gateway settings from an explicit path, bypassing
/// `KAIROS_CONFIG_PATH`.
pub fn load_settings_from_path(path: &str) -> Result<Settings, LoadSettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadSettingsError::Io {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadSettingsError::Parse {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_valid_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"version": 1, "routers": []}}"#).unwrap();
        let settings = load_settings_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.version, 1);
        assert!(settings.routers.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_settings_from_path("/nonexistent/path/config.json").unwrap_err();
        assert!(matches!(err, LoadSettingsError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_settings_from_path(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LoadSettingsError::Parse { .. }));
    }

    #[test]
    fn default_config_path_honors_env_override() {
        std::env::set_var("KAIROS_CONFIG_PATH", "/tmp/custom-kairos.json");
        assert_eq!(config_path(), "/tmp/custom-kairos.json");
        std::env::remove_var("KAIROS_CONFIG_PATH");
    }
}
