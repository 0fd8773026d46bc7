//! Structured logging setup.
//!
//! Installs a `tracing` subscriber driven by [`LoggingConfig`]. `RUST_LOG`
//! overrides the configured level when it is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Build the filter for `config`, preferring `RUST_LOG` when present.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_lowercase()))
}

/// Install the global subscriber.
///
/// Fails with `ConfigError` when the log file cannot be opened or a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_thread_names(true);

    let installed = match (&config.log_file_path, config.json_format) {
        (Some(path), json) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ProtocolError::ConfigError(format!("Failed to open log file {path}: {e}"))
                })?;
            let builder = builder.with_writer(Mutex::new(file)).with_ansi(false);
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        (None, true) => builder.json().try_init(),
        (None, false) => builder.try_init(),
    };

    installed.map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}
