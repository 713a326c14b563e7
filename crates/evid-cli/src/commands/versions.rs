//! Versions command implementation.

use anyhow::Result;
use serde_json::json;

use super::load_registry;
use crate::output::{format_version_row, print_version_header};

pub fn run(rules: Option<String>, json_output: bool) -> Result<()> {
    let registry = load_registry(rules)?;

    if json_output {
        let versions: Vec<_> = registry
            .iter()
            .map(|(tag, rule_set)| json!({"room_version": tag, "rules": rule_set}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    print_version_header();
    for (tag, rule_set) in registry.iter() {
        println!("{}", format_version_row(tag.as_str(), rule_set));
    }
    Ok(())
}
