//! Config file discovery, loading, and environment variable overlay.

use crate::sections::{
    ArchiveConfig, BindConfig, PathsConfig, TelemetryConfig, TwitchConfig,
};
use crate::{ConfigError, HoundConfig};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files in standard locations.
///
/// Returns paths in load order (system, user, local/cli). Only returns
/// files that exist. A CLI path replaces the local override.
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/vodhound/config.toml");
    if system.exists() {
        files.push(system);
    }

    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("vodhound/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("vodhound.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load config from a TOML file.
pub fn load_from_file(path: &Path) -> Result<HoundConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge two configs, with `overlay` winning wherever it diverges from
/// the compiled defaults.
///
/// The merge is field-by-field, not section-by-section: a file that sets
/// only `twitch.api_url` must not wipe credentials an earlier file set in
/// the same section.
pub fn merge_configs(base: HoundConfig, overlay: HoundConfig) -> HoundConfig {
    let defaults = HoundConfig::default();

    macro_rules! pick {
        ($field:expr, $default:expr, $base:expr) => {
            if $field != $default {
                $field
            } else {
                $base
            }
        };
    }

    HoundConfig {
        bind: BindConfig {
            http_port: pick!(
                overlay.bind.http_port,
                defaults.bind.http_port,
                base.bind.http_port
            ),
        },
        paths: PathsConfig {
            vods_dir: pick!(
                overlay.paths.vods_dir,
                defaults.paths.vods_dir,
                base.paths.vods_dir
            ),
        },
        telemetry: TelemetryConfig {
            log_level: pick!(
                overlay.telemetry.log_level,
                defaults.telemetry.log_level,
                base.telemetry.log_level
            ),
        },
        twitch: TwitchConfig {
            client_id: pick!(
                overlay.twitch.client_id,
                defaults.twitch.client_id,
                base.twitch.client_id
            ),
            client_secret: pick!(
                overlay.twitch.client_secret,
                defaults.twitch.client_secret,
                base.twitch.client_secret
            ),
            api_url: pick!(
                overlay.twitch.api_url,
                defaults.twitch.api_url,
                base.twitch.api_url
            ),
            auth_url: pick!(
                overlay.twitch.auth_url,
                defaults.twitch.auth_url,
                base.twitch.auth_url
            ),
            eventsub_callback: pick!(
                overlay.twitch.eventsub_callback,
                defaults.twitch.eventsub_callback,
                base.twitch.eventsub_callback
            ),
            eventsub_secret: pick!(
                overlay.twitch.eventsub_secret,
                defaults.twitch.eventsub_secret,
                base.twitch.eventsub_secret
            ),
        },
        archive: ArchiveConfig {
            delete_after_upload: pick!(
                overlay.archive.delete_after_upload,
                defaults.archive.delete_after_upload,
                base.archive.delete_after_upload
            ),
            max_title_length: pick!(
                overlay.archive.max_title_length,
                defaults.archive.max_title_length,
                base.archive.max_title_length
            ),
            utc_offset_hours: pick!(
                overlay.archive.utc_offset_hours,
                defaults.archive.utc_offset_hours,
                base.archive.utc_offset_hours
            ),
        },
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut HoundConfig, sources: &mut ConfigSources) {
    if let Ok(v) = env::var("VODHOUND_HTTP_PORT") {
        if let Ok(port) = v.parse() {
            config.bind.http_port = port;
            sources.env_overrides.push("VODHOUND_HTTP_PORT".to_string());
        }
    }
    if let Ok(v) = env::var("VODHOUND_VODS_DIR") {
        config.paths.vods_dir = PathBuf::from(v);
        sources.env_overrides.push("VODHOUND_VODS_DIR".to_string());
    }
    if let Ok(v) = env::var("VODHOUND_LOG_LEVEL") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("VODHOUND_LOG_LEVEL".to_string());
    }
    // Also support RUST_LOG
    if let Ok(v) = env::var("RUST_LOG") {
        config.telemetry.log_level = v;
        sources.env_overrides.push("RUST_LOG".to_string());
    }

    if let Ok(v) = env::var("TWITCH_CLIENT_ID") {
        config.twitch.client_id = v;
        sources.env_overrides.push("TWITCH_CLIENT_ID".to_string());
    }
    if let Ok(v) = env::var("TWITCH_CLIENT_SECRET") {
        config.twitch.client_secret = v;
        sources.env_overrides.push("TWITCH_CLIENT_SECRET".to_string());
    }
    if let Ok(v) = env::var("VODHOUND_EVENTSUB_CALLBACK") {
        config.twitch.eventsub_callback = v;
        sources
            .env_overrides
            .push("VODHOUND_EVENTSUB_CALLBACK".to_string());
    }
    if let Ok(v) = env::var("VODHOUND_EVENTSUB_SECRET") {
        config.twitch.eventsub_secret = v;
        sources
            .env_overrides
            .push("VODHOUND_EVENTSUB_SECRET".to_string());
    }

    if let Ok(v) = env::var("VODHOUND_UTC_OFFSET_HOURS") {
        if let Ok(hours) = v.parse() {
            config.archive.utc_offset_hours = hours;
            sources
                .env_overrides
                .push("VODHOUND_UTC_OFFSET_HOURS".to_string());
        }
    }
    if let Ok(v) = env::var("VODHOUND_DELETE_AFTER_UPLOAD") {
        config.archive.delete_after_upload = matches!(v.as_str(), "1" | "true" | "yes");
        sources
            .env_overrides
            .push("VODHOUND_DELETE_AFTER_UPLOAD".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_toml() {
        let config: HoundConfig = toml::from_str(
            r#"
[paths]
vods_dir = "/data/vods"
"#,
        )
        .unwrap();
        assert_eq!(config.paths.vods_dir, PathBuf::from("/data/vods"));
        // Other values should be defaults
        assert_eq!(config.bind.http_port, 8080);
        assert_eq!(config.archive.max_title_length, 100);
    }

    #[test]
    fn test_parse_full_toml() {
        let config: HoundConfig = toml::from_str(
            r#"
[bind]
http_port = 9000

[paths]
vods_dir = "/tank/vods"

[telemetry]
log_level = "debug"

[twitch]
client_id = "abc"
client_secret = "def"
eventsub_callback = "https://vods.example.com/eventsub"
eventsub_secret = "hmac"

[archive]
delete_after_upload = true
max_title_length = 80
"#,
        )
        .unwrap();

        assert_eq!(config.bind.http_port, 9000);
        assert_eq!(config.paths.vods_dir, PathBuf::from("/tank/vods"));
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.twitch.client_id, "abc");
        assert_eq!(config.twitch.eventsub_secret, "hmac");
        assert!(config.archive.delete_after_upload);
        assert_eq!(config.archive.max_title_length, 80);
    }

    #[test]
    fn test_merge_overlay_wins_where_set() {
        let base: HoundConfig = toml::from_str(
            r#"
[bind]
http_port = 9000

[telemetry]
log_level = "debug"
"#,
        )
        .unwrap();
        let overlay: HoundConfig = toml::from_str(
            r#"
[telemetry]
log_level = "trace"
"#,
        )
        .unwrap();

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.bind.http_port, 9000);
        assert_eq!(merged.telemetry.log_level, "trace");
    }

    #[test]
    fn test_merge_keeps_sibling_fields_within_a_section() {
        // A system file supplies credentials; a local file tweaks only the
        // API URL in the same [twitch] table. The credentials must survive.
        let base: HoundConfig = toml::from_str(
            r#"
[twitch]
client_id = "abc"
client_secret = "def"
"#,
        )
        .unwrap();
        let overlay: HoundConfig = toml::from_str(
            r#"
[twitch]
api_url = "https://mock.twitch.local/helix"
"#,
        )
        .unwrap();

        let merged = merge_configs(base, overlay);
        assert_eq!(merged.twitch.client_id, "abc");
        assert_eq!(merged.twitch.client_secret, "def");
        assert_eq!(merged.twitch.api_url, "https://mock.twitch.local/helix");
        // Untouched fields in the section fall back to defaults.
        assert_eq!(merged.twitch.auth_url, "https://id.twitch.tv/oauth2/token");
    }

    #[test]
    fn test_discover_config_files() {
        // Just verify it doesn't panic
        let _files = discover_config_files_with_override(None);
    }
}
