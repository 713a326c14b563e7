//! Output formatting utilities.

use evid_core::{EventFormat, RuleSet};

/// Outcome of verifying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Computed ID equals the claimed one.
    Valid,
    /// Computed ID differs.
    Invalid,
    /// No ID was claimed.
    Missing,
    /// The ID could not be computed.
    Error,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Valid => "VALID",
            Verdict::Invalid => "INVALID",
            Verdict::Missing => "MISSING",
            Verdict::Error => "ERROR",
        }
    }
}

/// Prints the verification table header.
#[allow(clippy::print_literal)]
pub fn print_verdict_header() {
    println!("{:<46} {:<28} {}", "EVENT_ID", "TYPE", "VERDICT");
    println!("{}", "-".repeat(84));
}

/// Formats one verification result as a table row.
pub fn format_verdict_row(event_id: &str, event_type: &str, verdict: Verdict) -> String {
    format!(
        "{:<46} {:<28} {}",
        truncate(event_id, 46),
        truncate(event_type, 28),
        verdict.as_str()
    )
}

/// Prints the room version table header.
#[allow(clippy::print_literal)]
pub fn print_version_header() {
    println!(
        "{:<22} {:<13} {:<20} {}",
        "ROOM_VERSION", "FORMAT", "ENCODING", "STRICT_JSON"
    );
    println!("{}", "-".repeat(70));
}

/// Formats one room version as a table row.
pub fn format_version_row(tag: &str, rules: &RuleSet) -> String {
    let format = match rules.event_format {
        EventFormat::Legacy => "legacy",
        EventFormat::HashDerived => "hash-derived",
    };
    let encoding = rules.id_encoding.map_or("-", |e| e.name());
    format!(
        "{:<22} {:<13} {:<20} {}",
        truncate(tag, 22),
        format,
        encoding,
        rules.strict_canonical_json
    )
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
