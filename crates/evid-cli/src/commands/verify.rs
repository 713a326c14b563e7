//! Verify command implementation.

use anyhow::{bail, Context, Result};
use evid_core::{verify_event_id, EventId, RuleSource};
use serde_json::{json, Value};
use tracing::warn;

use super::{load_registry, read_input};
use crate::output::{format_verdict_row, print_verdict_header, Verdict};

pub fn run(
    input: Option<String>,
    room_version: String,
    claimed: Option<String>,
    rules: Option<String>,
    strict: bool,
    json_output: bool,
) -> Result<()> {
    let registry = load_registry(rules)?;
    let rule_set = registry.resolve(&room_version)?;

    let events = read_input(input)?
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid JSON")?;

    if claimed.is_some() && events.len() != 1 {
        bail!("--claimed requires exactly one event, got {}", events.len());
    }

    let mut all_ok = true;
    let mut results = Vec::new();

    for event in &events {
        let event_type = event
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        let claimed_id = claimed
            .clone()
            .or_else(|| event.get("event_id").and_then(Value::as_str).map(str::to_string));

        let Some(claimed_id) = claimed_id else {
            all_ok = false;
            results.push(("?".to_string(), event_type, Verdict::Missing));
            continue;
        };

        let verdict = match verify_event_id(event, &EventId::new(claimed_id.as_str()), &rule_set) {
            Ok(true) => Verdict::Valid,
            Ok(false) => Verdict::Invalid,
            Err(e) => {
                if !json_output {
                    eprintln!("Error verifying {}: {}", claimed_id, e);
                }
                warn!(event_id = %claimed_id, error = %e, "event ID could not be computed");
                Verdict::Error
            }
        };
        all_ok = all_ok && verdict == Verdict::Valid;
        results.push((claimed_id, event_type, verdict));
    }

    if json_output {
        let json_results: Vec<_> = results
            .into_iter()
            .map(|(id, ty, verdict)| {
                json!({
                    "event_id": id,
                    "type": ty,
                    "verdict": verdict.as_str()
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_results)?);
    } else {
        print_verdict_header();
        for (id, ty, verdict) in &results {
            println!("{}", format_verdict_row(id, ty, *verdict));
        }
    }

    if strict && !all_ok {
        std::process::exit(1);
    }

    Ok(())
}
