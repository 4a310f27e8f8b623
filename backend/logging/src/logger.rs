//! Structured Logger
//!
//! Wraps `tracing` with environment-based level control, optional JSON
//! console output, and optional daily file rotation (NDJSON).

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "grokgram.log";

#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is unset (e.g. "info", "grokgram=debug").
    pub level: String,
    /// Forces the "debug" level regardless of `level`.
    pub debug: bool,
    /// JSON instead of human-readable console lines.
    pub json: bool,
    /// Directory for `grokgram.log.YYYY-MM-DD` files.
    pub dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            debug: false,
            json: false,
            dir: None,
        }
    }
}

impl LogOptions {
    fn directive(&self) -> &str {
        if self.debug { "debug" } else { &self.level }
    }
}

/// Initialize the global subscriber. A second call leaves the first in place.
pub fn init_logger(options: &LogOptions) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(options.directive())
            .with_context(|| format!("Invalid log level: {}", options.directive()))?,
    };

    let json_console = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stdout));
    let plain_console = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(false)
            .with_ansi(true)
    });

    // Rolling file appender: writes NDJSON to `<dir>/grokgram.log.YYYY-MM-DD`
    let file_layer = options.dir.as_ref().map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_overrides_level() {
        let options = LogOptions {
            level: "warn".into(),
            debug: true,
            ..LogOptions::default()
        };
        assert_eq!(options.directive(), "debug");
        assert_eq!(LogOptions::default().directive(), "info");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let options = LogOptions::default();
        init_logger(&options).unwrap();
        init_logger(&options).unwrap();
    }
}
