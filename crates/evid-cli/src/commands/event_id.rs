//! Event ID command implementation.

use anyhow::{Context, Result};
use evid_core::event_id_with;
use tracing::debug;

use super::{load_registry, read_input};

pub fn run(input: Option<String>, room_version: String, rules: Option<String>) -> Result<()> {
    let registry = load_registry(rules)?;
    let event_json = read_input(input)?;

    let event_id = event_id_with(&registry, event_json.trim().as_bytes(), &room_version)
        .with_context(|| format!("Failed to derive event ID under room version {}", room_version))?;
    debug!(%room_version, %event_id, "computed event ID");

    println!("{}", event_id);
    Ok(())
}
