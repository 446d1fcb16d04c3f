//! Tracing setup with a reloadable level filter.
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::config::LoggingConfig;

static LOG_RELOAD_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initializes tracing from the `[logging]` section.
pub fn init_tracing_from_config(logging: &LoggingConfig) {
    init_tracing_with_level(&logging.level);
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    // RUST_LOG wins over the configured level.
    let base_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let (reload_layer, handle) = reload::Layer::new(base_filter);
    if LOG_RELOAD_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(reload_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Swaps the active level filter, e.g. after a configuration reload.
pub fn apply_logging_level(level: &str) -> Result<(), String> {
    let filter = EnvFilter::try_new(level).map_err(|e| format!("invalid log filter: {e}"))?;
    let handle = LOG_RELOAD_HANDLE
        .get()
        .ok_or_else(|| "tracing is not initialized".to_string())?;
    handle
        .modify(|f| *f = filter)
        .map_err(|e| format!("failed to reload log filter: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_after_init() {
        init_tracing_from_config(&LoggingConfig {
            level: "debug".into(),
        });
        init_tracing();
        assert!(apply_logging_level("warn").is_ok());
        assert!(apply_logging_level("opencloud_lifecycle=trace,info").is_ok());
        assert!(apply_logging_level("opencloud_query=loud").is_err());
        tracing::warn!(component = "observability", "still logging after reload");
    }
}
