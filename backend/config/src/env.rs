//! Environment variable substitution for config values.
//!
//! Supports `${VAR_NAME}` in YAML string values, resolved before the file is
//! deserialized. Only uppercase `[A-Z_][A-Z0-9_]*` names are matched and
//! `$${VAR}` escapes to a literal `${VAR}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_yaml::Value;
use std::collections::HashMap;

/// `${VAR}` or the escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\$)?\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references from the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut result = serde_yaml::Mapping::new();
            for (k, v) in map {
                let key = k.as_str().unwrap_or("?");
                let child_path = if path.is_empty() {
                    key.to_string()
                } else {
                    format!("{path}.{key}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Mapping(result))
        }
        // Scalars and tagged values pass through unchanged.
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let var_name = &caps[2];
        if caps.get(1).is_some() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(substituted.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = yaml("grok:\n  api_key: ${XAI_API_KEY}\n");
        let result = resolve_env_vars_with(&v, &env(&[("XAI_API_KEY", "xai-123")])).unwrap();
        assert_eq!(result["grok"]["api_key"].as_str(), Some("xai-123"));
    }

    #[test]
    fn substitutes_inside_text_and_lists() {
        let v = yaml(
            "db:\n  path: ${DATA_DIR}/bot.db\nsession:\n  placeholders: [\"${WORD}...\"]\n",
        );
        let result =
            resolve_env_vars_with(&v, &env(&[("DATA_DIR", "/srv"), ("WORD", "Hmm")])).unwrap();
        assert_eq!(result["db"]["path"].as_str(), Some("/srv/bot.db"));
        assert_eq!(result["session"]["placeholders"][0].as_str(), Some("Hmm..."));
    }

    #[test]
    fn error_names_var_and_path() {
        let v = yaml("bot:\n  token: ${MISSING_TOKEN}\n");
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "MISSING_TOKEN");
        assert_eq!(err.config_path, "bot.token");
    }

    #[test]
    fn escaped_reference_is_literal() {
        let v = yaml("grok:\n  system_prompt: \"say $${NAME}\"\n");
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["grok"]["system_prompt"].as_str(), Some("say ${NAME}"));
    }

    #[test]
    fn passthrough_non_strings() {
        let v = yaml("session:\n  max_history: 10\nlogging:\n  debug: true\n");
        assert_eq!(resolve_env_vars_with(&v, &HashMap::new()).unwrap(), v);
    }
}
