use std::time::Duration;

use opencloud_core::Timeouts;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub timeouts: TimeoutSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub client: ClientSettings,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Timeout validations
        let t = &self.timeouts;
        if t.create_timeout_ms == 0 || t.delete_timeout_ms == 0 {
            return Err("timeouts.create_timeout_ms and timeouts.delete_timeout_ms must be > 0".into());
        }
        if t.poll_interval_ms == 0 {
            return Err("timeouts.poll_interval_ms must be > 0".into());
        }
        if t.poll_interval_ms >= t.create_timeout_ms || t.poll_interval_ms >= t.delete_timeout_ms {
            return Err("timeouts.poll_interval_ms must be < every operation timeout".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Client validation
        if self.client.region.trim().is_empty() {
            return Err("client.region must not be empty".into());
        }
        if let Some(endpoint) = self.client.endpoint_override.as_deref()
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err("client.endpoint_override must be an http(s) URL".into());
        }
        Ok(())
    }

    /// Timeouts for the lifecycle controller.
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::default()
            .with_create(Duration::from_millis(self.timeouts.create_timeout_ms))
            .with_delete(Duration::from_millis(self.timeouts.delete_timeout_ms))
            .with_poll_interval(Duration::from_millis(self.timeouts.poll_interval_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_create_timeout_ms")]
    pub create_timeout_ms: u64,
    #[serde(default = "default_delete_timeout_ms")]
    pub delete_timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}
fn default_create_timeout_ms() -> u64 {
    30 * 60 * 1000
}
fn default_delete_timeout_ms() -> u64 {
    30 * 60 * 1000
}
fn default_poll_interval_ms() -> u64 {
    3000
}
impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            create_timeout_ms: default_create_timeout_ms(),
            delete_timeout_ms: default_delete_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Settings handed to the cloud API backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_region")]
    pub region: String,
    /// Replaces the endpoint discovered from the service catalog.
    #[serde(default)]
    pub endpoint_override: Option<String>,
}
fn default_region() -> String {
    "eu-de".into()
}
impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint_override: None,
        }
    }
}

pub mod loader {
    use super::ProviderConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<ProviderConfig, String> {
        let mut builder = Config::builder();
        let file = PathBuf::from(path.unwrap_or("opencloud.toml"));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        }
        // Environment variable overrides, e.g., OPENCLOUD__TIMEOUTS__POLL_INTERVAL_MS=500
        builder = builder.add_source(
            Environment::with_prefix("OPENCLOUD")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: ProviderConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = ProviderConfig::default();
        assert!(cfg.validate().is_ok());
        let timeouts = cfg.timeouts();
        assert_eq!(timeouts.create, Duration::from_secs(30 * 60));
        assert_eq!(timeouts.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_poll_interval_must_be_below_timeouts() {
        let mut cfg = ProviderConfig::default();
        cfg.timeouts.delete_timeout_ms = cfg.timeouts.poll_interval_ms;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("poll_interval_ms"));
    }

    #[test]
    fn test_unknown_log_level() {
        let mut cfg = ProviderConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().is_err());
        cfg.logging.level = "DEBUG".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_endpoint_override_must_be_url() {
        let mut cfg = ProviderConfig::default();
        cfg.client.endpoint_override = Some("ims.example.com".into());
        assert!(cfg.validate().is_err());
        cfg.client.endpoint_override = Some("https://ims.eu-de.example.com".into());
        assert!(cfg.validate().is_ok());
    }
}
