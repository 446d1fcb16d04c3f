//! # opencloud-config
//!
//! Provider configuration and tracing setup.
//!
//! Configuration is read from an optional TOML file (`opencloud.toml` by
//! default) and overridden by `OPENCLOUD__<SECTION>__<KEY>` environment
//! variables:
//!
//! ```toml
//! [timeouts]
//! create_timeout_ms = 600000
//! poll_interval_ms = 5000
//!
//! [logging]
//! level = "debug"
//!
//! [client]
//! region = "eu-de"
//! ```

pub mod config;
pub mod observability;

pub use self::config::loader::load_config;
pub use self::config::{ClientSettings, LoggingConfig, ProviderConfig, TimeoutSettings};
pub use observability::{
    apply_logging_level, init_tracing, init_tracing_from_config, init_tracing_with_level,
};
