//! Redact command implementation.

use anyhow::{Context, Result};
use evid_core::{canonical_form_for, RuleSource};
use serde_json::Value;

use super::{load_registry, read_input};

pub fn run(input: Option<String>, room_version: String, rules: Option<String>) -> Result<()> {
    let registry = load_registry(rules)?;
    let rule_set = registry.resolve(&room_version)?;

    let json_str = read_input(input)?;
    let event: Value = serde_json::from_str(&json_str).context("Invalid JSON")?;

    let form = canonical_form_for(&event, &rule_set).context("Redaction failed")?;

    println!("{}", form.as_str());
    Ok(())
}
