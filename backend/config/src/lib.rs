//! `grokgram-config`: bot configuration management.
//!
//! Provides:
//! - Typed config schema (Telegram bot, Grok API, storage, logging, session)
//! - YAML loading from `--config`, `CONFIG_PATH`, or the container default
//! - `${ENV_VAR}` substitution
//! - Validation with errors and warnings
//! - Redaction for safe logging/display

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{load_config, parse_config, resolve_config_path, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use redact::redact;
pub use schema::{BotConfig, BotSection, DbSection, GrokSection, LoggingSection, SessionSection};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use grokgram_core::BotError;
use std::path::Path;

/// Load the config file and reject it if validation finds any error.
///
/// This is the main entry point for loading a config at runtime. The
/// returned report carries only warnings. A rejected config surfaces as
/// [`BotError::Config`].
pub async fn load_and_prepare(path: &Path) -> Result<(BotConfig, ValidationReport)> {
    let config = load_config(path).await?;
    let report = validate(&config);
    if !report.is_valid() {
        let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
        return Err(BotError::Config(format!(
            "invalid config {}:\n  {}",
            path.display(),
            details.join("\n  ")
        ))
        .into());
    }
    Ok((config, report))
}
