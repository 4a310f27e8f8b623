//! Config redaction: produce safe-to-log config snapshots by masking secrets.

use crate::schema::BotConfig;
use serde_json::Value;

/// Keys whose string values are secrets.
static SECRET_KEYS: &[&str] = &["token", "api_key", "apiKey", "secret", "password"];

/// Serialize the config with every secret replaced by a short hint.
pub fn redact(config: &BotConfig) -> Value {
    match serde_json::to_value(config) {
        Ok(value) => redact_value(&value, ""),
        Err(e) => Value::String(format!("<unserializable config: {e}>")),
    }
}

fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    // Preserve length hint: show first 4 chars + ***
    if s.chars().count() > 8 {
        format!("{}***", s.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}

fn redact_value(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_secret_key(key) && !s.is_empty() => Value::String(mask(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_credentials() {
        let mut config = BotConfig::default();
        config.bot.token = "123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawX".into();
        config.bot.username = "GrokBot".into();
        config.grok.api_key = "short".into();

        let redacted = redact(&config);
        assert_eq!(redacted["bot"]["token"], "1234***");
        assert_eq!(redacted["grok"]["api_key"], "***");
        assert_eq!(redacted["bot"]["username"], "GrokBot");
    }

    #[test]
    fn empty_secret_stays_empty() {
        let redacted = redact(&BotConfig::default());
        assert_eq!(redacted["bot"]["token"], "");
        assert_eq!(redacted["logging"]["level"], "info");
    }
}
