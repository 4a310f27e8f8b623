//! `grokgram check-config`

use anyhow::Result;
use std::path::Path;

use grokgram_config::{load_config, redact, validate};

pub async fn run(path: &Path) -> Result<()> {
    let config = load_config(path).await?;
    let report = validate(&config);

    println!("Config: {}", path.display());
    println!("{}", serde_json::to_string_pretty(&redact(&config))?);

    for warning in &report.warnings {
        println!("  warning: {}: {}", warning.path, warning.message);
    }
    for error in &report.errors {
        println!("  error:   {}: {}", error.path, error.message);
    }

    if !report.is_valid() {
        anyhow::bail!("{} config error(s)", report.errors.len());
    }
    println!("Config OK");
    Ok(())
}
