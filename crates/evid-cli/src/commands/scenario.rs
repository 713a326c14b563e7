//! Scenario command implementation.

use anyhow::{Context, Result};
use evid_core::ScenarioFile;

use super::load_registry;

pub fn run(file: String, rules: Option<String>, json_output: bool) -> Result<()> {
    let registry = load_registry(rules)?;
    let scenario = ScenarioFile::load(&file)
        .and_then(|loaded| loaded.process(&registry))
        .with_context(|| format!("Failed to process scenario {}", file))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&scenario)?);
        return Ok(());
    }

    for event in &scenario.events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}
