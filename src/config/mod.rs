//! Configuration file support.
//!
//! Reads `~/.config/s2cli/config.toml` when present. Command-line flags
//! and the `S2_API_KEY` environment variable take precedence over file
//! values.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! key = "your-api-key"
//! timeout_secs = 30
//!
//! [retry]
//! enabled = true
//! max_retries = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration file structure
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// API section
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry section
    #[serde(default)]
    pub retry: RetryConfig,
}

/// API access configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key for higher rate limits
    #[serde(default)]
    pub key: Option<String>,

    /// Per-request network timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Rate-limit retry configuration
#[derive(Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

/// Path of the configuration file, if a config directory exists on this
/// platform.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("s2cli").join("config.toml"))
}

/// Load the configuration file, falling back to defaults when it is
/// missing or malformed. A malformed file is reported but never fatal.
pub fn load() -> ConfigFile {
    let Some(path) = config_path() else {
        return ConfigFile::default();
    };
    let Ok(text) = std::fs::read_to_string(&path) else {
        return ConfigFile::default();
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring malformed config file");
            ConfigFile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.api.key, None);
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let config: ConfigFile = toml::from_str(
            r#"
            [api]
            key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.key.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn full_file_round_trips() {
        let config: ConfigFile = toml::from_str(
            r#"
            [api]
            key = "abc"
            timeout_secs = 10

            [retry]
            enabled = false
            max_retries = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.api.timeout_secs, 10);
        assert!(!config.retry.enabled);
        assert_eq!(config.retry.max_retries, 7);
    }
}
