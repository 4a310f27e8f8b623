//! Config file discovery and loading.

use crate::env::{resolve_env_vars, resolve_env_vars_with};
use crate::schema::BotConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Location inside the container image.
pub const DEFAULT_CONFIG_PATH: &str = "/app/config/config.yaml";

/// Resolve the config file path.
/// Priority: explicit path > `CONFIG_PATH` env > `/app/config/config.yaml`
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// Read, env-substitute, and parse the config at `path`.
pub async fn load_config(path: &Path) -> Result<BotConfig> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: serde_yaml::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;
    let value = resolve_env_vars(&value)?;
    let config = into_config(value)
        .with_context(|| format!("Invalid config structure at: {}", path.display()))?;

    debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse config text against an explicit environment (useful for testing).
pub fn parse_config(raw: &str, env: &HashMap<String, String>) -> Result<BotConfig> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).context("Failed to parse config YAML")?;
    into_config(resolve_env_vars_with(&value, env)?)
}

fn into_config(value: serde_yaml::Value) -> Result<BotConfig> {
    // An empty file parses as null; treat it as all defaults.
    if value.is_null() {
        return Ok(BotConfig::default());
    }
    Ok(serde_yaml::from_value(value)?)
}
