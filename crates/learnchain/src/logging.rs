//! Structured logging initialisation.
//!
//! Two output formats are supported:
//! - [`LogFormat::Human`]: human-readable lines (development).
//! - [`LogFormat::Json`]: newline-delimited JSON (log aggregation).
//!
//! The filter level can be overridden at runtime via the `RUST_LOG`
//! environment variable. When `RUST_LOG` is not set, the caller-supplied
//! `level` string is used (e.g. `"info"`, `"debug,learnchain=trace"`).

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{EngineError, Result};

/// Selects the output format for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn try_init_logging(format: LogFormat, level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let installed = match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
    };
    installed.map_err(|e| EngineError::Logging(e.to_string()))
}

/// Install the global tracing subscriber.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (i.e. this function
/// was called twice in the same process).
pub fn init_logging(format: LogFormat, level: &str) {
    if let Err(e) = try_init_logging(format, level) {
        panic!("failed to initialise logging: {}", e);
    }
}
