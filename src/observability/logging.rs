//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Console sink (pretty or JSON) on stderr, keeping stdout for prompts
//! - Optional append-only file sink without ANSI colors
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from config, overridden by `RUST_LOG`

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Error type for logging initialization failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("cannot open log file '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize logging: {0}")]
    SubscriberInit(String),
}

/// Level filter: `RUST_LOG` when set, the configured level otherwise.
fn build_filter(config: &ObservabilityConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|e| LoggingError::InvalidLevel {
        level: config.log_level.clone(),
        reason: e.to_string(),
    })
}

fn open_log_file(path: &str) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::File {
            path: path.to_string(),
            source,
        })
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    let pretty = (config.log_format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });
    let json = (config.log_format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
    });

    let file = match config.log_file.as_deref() {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .with(file)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;

    tracing::debug!(
        level = %config.log_level,
        format = ?config.log_format,
        file = config.log_file.as_deref().unwrap_or("-"),
        "Logging initialized"
    );
    Ok(())
}
