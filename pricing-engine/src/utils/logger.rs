//! Logging Infrastructure
//!
//! Structured logging setup, human-readable for development and JSON lines
//! for log shippers.

use crate::core::EngineConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global logger
///
/// `RUST_LOG` takes precedence over `level`. Returns an error instead of
/// panicking when a subscriber is already installed.
pub fn init_logger(level: &str, json: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(false)
                    .with_target(false),
            )
            .try_init()?;
    }

    Ok(())
}

/// Initialize the logger from [`EngineConfig`]
pub fn init_logger_from_config(config: &EngineConfig) -> anyhow::Result<()> {
    init_logger(&config.log_level, config.log_json)
}
