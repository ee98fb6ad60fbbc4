//! # Client Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TURF_BACKEND_URL=https://turf.example.com                          │
//! │     TURF_REQUEST_TIMEOUT_SECS=15                                       │
//! │     TURF_LOG=turf_client=debug                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/turf-booking/client.toml (Linux)                         │
//! │     ~/Library/Application Support/com.turf.booking/client.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [backend]
//! endpoint = "https://turf.example.com"
//! request_timeout_secs = 30
//!
//! [booking]
//! default_slot_duration_minutes = 60
//! allow_past_dates = false
//!
//! [logging]
//! filter = "info"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use turf_core::{MAX_SLOT_DURATION_MINUTES, MIN_SLOT_DURATION_MINUTES};

use crate::error::ConfigError;

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Where the booking store lives and how long to wait for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Per-call timeout. A timed out call surfaces as a generic failure.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            endpoint: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSettings {
    /// Used for a new booking when slot settings have not been fetched.
    #[serde(default = "default_slot_duration")]
    pub default_slot_duration_minutes: u16,

    #[serde(default)]
    pub allow_past_dates: bool,
}

fn default_slot_duration() -> u16 {
    turf_core::DEFAULT_SLOT_DURATION_MINUTES
}

impl Default for BookingSettings {
    fn default() -> Self {
        BookingSettings {
            default_slot_duration_minutes: default_slot_duration(),
            allow_past_dates: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` wins over it.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Client Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub booking: BookingSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (client.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading client config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load client config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Client config saved");
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(ref url) = self.backend.endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "Backend endpoint must start with http:// or https://, got: {}",
                    url
                )));
            }
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        let duration = self.booking.default_slot_duration_minutes;
        if !(MIN_SLOT_DURATION_MINUTES..=MAX_SLOT_DURATION_MINUTES).contains(&duration) {
            return Err(ConfigError::Invalid(format!(
                "default_slot_duration_minutes must be between {} and {}, got: {}",
                MIN_SLOT_DURATION_MINUTES, MAX_SLOT_DURATION_MINUTES, duration
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TURF_BACKEND_URL") {
            debug!(url = %url, "Overriding backend endpoint from environment");
            self.backend.endpoint = Some(url);
        }

        if let Ok(secs) = std::env::var("TURF_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.backend.request_timeout_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring unparseable TURF_REQUEST_TIMEOUT_SECS"),
            }
        }

        if let Ok(filter) = std::env::var("TURF_LOG") {
            self.logging.filter = filter;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "turf", "booking")
            .map(|dirs| dirs.config_dir().join("client.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.backend.endpoint.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.backend.request_timeout_secs, 30);
        assert_eq!(config.booking.default_slot_duration_minutes, 60);
        assert!(!config.booking.allow_past_dates);
        assert_eq!(config.logging.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClientConfig::default();

        config.backend.endpoint = Some("ftp://turf".to_string());
        assert!(config.validate().is_err());

        config.backend.endpoint = Some("https://turf.example.com".to_string());
        assert!(config.validate().is_ok());

        config.backend.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.backend.request_timeout_secs = 5;
        config.booking.default_slot_duration_minutes = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [booking]
            allow_past_dates = true
            "#,
        )
        .unwrap();
        assert!(config.booking.allow_past_dates);
        assert_eq!(config.booking.default_slot_duration_minutes, 60);
        assert_eq!(config.backend.request_timeout_secs, 30);
    }

    #[test]
    fn test_toml_serialization() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[backend]"));
        assert!(toml_str.contains("[booking]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = std::env::temp_dir().join(format!("turf-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("client.toml");
        let mut config = ClientConfig::default();
        config.backend.request_timeout_secs = 7;
        config.save(Some(path.clone())).unwrap();

        let loaded = ClientConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.booking.default_slot_duration_minutes, 60);
        // Environment may override the timeout; only check when unset
        if std::env::var("TURF_REQUEST_TIMEOUT_SECS").is_err() {
            assert_eq!(loaded.backend.request_timeout_secs, 7);
        }
        let _ = std::fs::remove_dir_all(dir);
    }
}
