//! Configuration sections. All fields have serde defaults so partial
//! files parse cleanly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network bind settings for the intake HTTP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindConfig {
    /// HTTP port for intake signals and health.
    /// Default: 8080
    #[serde(default = "BindConfig::default_http_port")]
    pub http_port: u16,
}

impl BindConfig {
    fn default_http_port() -> u16 {
        8080
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            http_port: Self::default_http_port(),
        }
    }
}

/// Filesystem layout for recordings and chapter files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the recording tree: `<vods_dir>/<channel>/<id>/...`.
    /// Default: /vods
    #[serde(default = "PathsConfig::default_vods_dir")]
    pub vods_dir: PathBuf,
}

impl PathsConfig {
    fn default_vods_dir() -> PathBuf {
        PathBuf::from("/vods")
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            vods_dir: Self::default_vods_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level or full EnvFilter directive string.
    /// Default: info
    #[serde(default = "TelemetryConfig::default_log_level")]
    pub log_level: String,
}

impl TelemetryConfig {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

/// Twitch API credentials and endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitchConfig {
    /// Application client id.
    #[serde(default)]
    pub client_id: String,

    /// Application client secret.
    #[serde(default)]
    pub client_secret: String,

    /// Helix API base URL.
    /// Default: https://api.twitch.tv/helix
    #[serde(default = "TwitchConfig::default_api_url")]
    pub api_url: String,

    /// App-token endpoint.
    /// Default: https://id.twitch.tv/oauth2/token
    #[serde(default = "TwitchConfig::default_auth_url")]
    pub auth_url: String,

    /// Public callback URL handed to EventSub when subscribing.
    #[serde(default)]
    pub eventsub_callback: String,

    /// Shared secret EventSub signs deliveries with. Verification itself
    /// happens upstream of this process.
    #[serde(default)]
    pub eventsub_secret: String,
}

impl TwitchConfig {
    fn default_api_url() -> String {
        "https://api.twitch.tv/helix".to_string()
    }

    fn default_auth_url() -> String {
        "https://id.twitch.tv/oauth2/token".to_string()
    }
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_url: Self::default_api_url(),
            auth_url: Self::default_auth_url(),
            eventsub_callback: String::new(),
            eventsub_secret: String::new(),
        }
    }
}

/// Archival behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Delete the source recording after a successful upload.
    /// Default: false
    #[serde(default)]
    pub delete_after_upload: bool,

    /// Display-title bound in grapheme clusters.
    /// Default: 100
    #[serde(default = "ArchiveConfig::default_max_title_length")]
    pub max_title_length: usize,

    /// UTC offset, in whole hours, applied when formatting the date in a
    /// display title (e.g. -8 for Pacific). Out-of-range values fall back
    /// to UTC.
    /// Default: 0
    #[serde(default)]
    pub utc_offset_hours: i32,
}

impl ArchiveConfig {
    fn default_max_title_length() -> usize {
        100
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            delete_after_upload: false,
            max_title_length: Self::default_max_title_length(),
            utc_offset_hours: 0,
        }
    }
}
