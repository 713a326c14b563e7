//! Canonicalize command implementation.

use anyhow::{Context, Result};
use evid_canonical::{Canonicalizer, NumberPolicy};
use serde_json::Value;

use super::read_input;

pub fn run(input: Option<String>, strict: bool) -> Result<()> {
    let policy = if strict {
        NumberPolicy::Strict
    } else {
        NumberPolicy::Lenient
    };
    let canonicalizer = Canonicalizer::new(policy);

    let json_str = read_input(input)?;
    let value: Value = serde_json::from_str(&json_str).context("Invalid JSON")?;

    let form = canonicalizer
        .canonicalize(&value)
        .context("Canonicalization failed")?;

    println!("{}", form.as_str());
    Ok(())
}
