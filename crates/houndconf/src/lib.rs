//! Configuration loading for vodhound.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/vodhound/config.toml` (system)
//! 2. `~/.config/vodhound/config.toml` (user)
//! 3. `./vodhound.toml` (local override, replaced by `--config` if given)
//! 4. Environment variables (`VODHOUND_*`, `TWITCH_*`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! http_port = 8080
//!
//! [paths]
//! vods_dir = "/vods"
//!
//! [telemetry]
//! log_level = "info"
//!
//! [twitch]
//! client_id = "abc123"
//! client_secret = "s3cret"
//! eventsub_callback = "https://vods.example.com/eventsub"
//! eventsub_secret = "webhook-hmac-secret"
//!
//! [archive]
//! delete_after_upload = false
//! max_title_length = 100
//! utc_offset_hours = -8
//! ```

pub mod loader;
pub mod sections;

pub use loader::{discover_config_files_with_override, ConfigSources};
pub use sections::{ArchiveConfig, BindConfig, PathsConfig, TelemetryConfig, TwitchConfig};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Complete vodhound configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HoundConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub twitch: TwitchConfig,

    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl HoundConfig {
    /// Load configuration from all standard sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an optional CLI config path, which takes
    /// precedence over the local `./vodhound.toml` override.
    pub fn load_from(config_path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report where values came from.
    pub fn load_with_sources_from(
        config_path: Option<&std::path::Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = HoundConfig::default();

        for path in loader::discover_config_files_with_override(config_path) {
            let file_config = loader::load_from_file(&path)?;
            config = loader::merge_configs(config, file_config);
            sources.files.push(path);
        }

        loader::apply_env_overrides(&mut config, &mut sources);

        Ok((config, sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HoundConfig::default();
        assert_eq!(config.bind.http_port, 8080);
        assert_eq!(config.paths.vods_dir, PathBuf::from("/vods"));
        assert_eq!(config.telemetry.log_level, "info");
        assert!(!config.archive.delete_after_upload);
    }

    #[test]
    fn test_load_defaults() {
        // Load should work even with no config files present.
        let config = HoundConfig::load().unwrap();
        assert_eq!(config.archive.max_title_length, 100);
    }
}
