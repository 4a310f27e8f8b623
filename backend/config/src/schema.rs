//! Bot configuration schema.
//!
//! Field names follow the YAML file layout (`bot.token`, `grok.api_key`, ...).
//! Every section has defaults, so only the credentials are mandatory.

use grokgram_core::{DEFAULT_MAX_CONTEXT_MESSAGES, DEFAULT_MAX_HISTORY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "/data/bot.db";
pub const DEFAULT_MODEL: &str = "grok-3";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

const DEFAULT_PLACEHOLDERS: &[&str] = &[
    "Thinking...",
    "Consulting the oracle...",
    "Asking Grok nicely...",
    "Reading the room...",
    "Warming up the neurons...",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub bot: BotSection,
    pub grok: GrokSection,
    pub db: DbSection,
    pub logging: LoggingSection,
    pub session: SessionSection,
}

/// Telegram bot credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    pub token: String,
    /// Username without `@`, used to detect mentions.
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrokSection {
    pub api_key: String,
    /// Full chat-completions endpoint; the provider default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for GrokSection {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: None,
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbSection {
    pub path: PathBuf,
}

impl Default for DbSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub debug: bool,
    pub level: String,
    pub json: bool,
    /// Directory for rolling log files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            debug: false,
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub max_history: usize,
    pub max_context_messages: usize,
    pub placeholders: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared_reply: Option<String>,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            max_context_messages: DEFAULT_MAX_CONTEXT_MESSAGES,
            placeholders: DEFAULT_PLACEHOLDERS.iter().map(|s| s.to_string()).collect(),
            fallback_reply: None,
            cleared_reply: None,
        }
    }
}
