//! Config validation with user-friendly error messages.

use crate::schema::BotConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &BotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_bot(config, &mut report);
    validate_grok(config, &mut report);
    validate_db(config, &mut report);
    validate_session(config, &mut report);
    report
}

fn validate_bot(config: &BotConfig, report: &mut ValidationReport) {
    if config.bot.token.trim().is_empty() {
        report.error("bot.token", "Telegram bot token is required");
    }
    let username = config.bot.username.trim();
    if username.is_empty() {
        report.error("bot.username", "Bot username is required to detect mentions");
    } else if username.contains(char::is_whitespace) {
        report.error("bot.username", "Bot username cannot contain whitespace");
    }
}

fn validate_grok(config: &BotConfig, report: &mut ValidationReport) {
    let grok = &config.grok;
    if grok.api_key.trim().is_empty() {
        report.error("grok.api_key", "Grok API key is required");
    }
    if grok.model.trim().is_empty() {
        report.error("grok.model", "Model name cannot be empty");
    }
    if let Some(url) = &grok.api_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("grok.api_url", format!("'{url}' is not an http(s) URL"));
        }
    }
    if grok.timeout_secs == 0 {
        report.error("grok.timeout_secs", "Timeout must be > 0");
    }
    if let Some(t) = grok.temperature {
        if !(0.0..=2.0).contains(&t) {
            report.warn("grok.temperature", format!("Temperature {t} is outside 0.0..=2.0"));
        }
    }
}

fn validate_db(config: &BotConfig, report: &mut ValidationReport) {
    if config.db.path.as_os_str().is_empty() {
        report.error("db.path", "Database path cannot be empty");
    }
}

fn validate_session(config: &BotConfig, report: &mut ValidationReport) {
    let session = &config.session;
    if session.max_history == 0 {
        report.error("session.max_history", "max_history must be > 0");
    }
    if session.max_context_messages == 0 {
        report.error(
            "session.max_context_messages",
            "max_context_messages must be > 0 (the prompt itself counts)",
        );
    }
    if session.max_history > 0 && session.max_context_messages > session.max_history + 1 {
        report.warn(
            "session.max_context_messages",
            format!(
                "Only {} entries are retained, so the window never carries more than {} messages",
                session.max_history,
                session.max_history + 1
            ),
        );
    }
    if session.placeholders.is_empty() {
        report.warn("session.placeholders", "No placeholders configured; \"...\" will be shown");
    }
}
