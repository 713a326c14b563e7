//! Subcommand implementations.

pub mod canonicalize;
pub mod event_id;
pub mod redact;
pub mod scenario;
pub mod verify;
pub mod versions;

use std::io::{self, Read};

use anyhow::{Context, Result};
use evid_core::{RoomVersionRegistry, RuleTableConfig};
use tracing::debug;

/// Reads input from a file, or stdin if no path is given.
pub fn read_input(input: Option<String>) -> Result<String> {
    match input {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("Failed to read file {}", path))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Built-in room versions, extended with a rule table if one is given.
pub fn load_registry(rules: Option<String>) -> Result<RoomVersionRegistry> {
    match rules {
        Some(path) => {
            debug!(%path, "loading rule table");
            let config = RuleTableConfig::load(&path)
                .with_context(|| format!("Failed to load rule table {}", path))?;
            Ok(config.into_registry()?)
        }
        None => Ok(RoomVersionRegistry::with_builtin()),
    }
}
