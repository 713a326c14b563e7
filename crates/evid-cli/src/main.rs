//! evid CLI - derive, verify and inspect content-derived event IDs.

use std::env;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod output;

use commands::{canonicalize, event_id, redact, scenario, verify, versions};

#[derive(Parser)]
#[command(name = "evid")]
#[command(version, about = "Content-derived event ID tooling")]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the event ID for input event JSON
    EventId {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Room version whose rules apply
        #[arg(long)]
        room_version: String,
        /// TOML rule table with extra room versions
        #[arg(long)]
        rules: Option<String>,
    },
    /// Verify event IDs of one or more events (newline-delimited)
    Verify {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Room version whose rules apply
        #[arg(long)]
        room_version: String,
        /// Expected ID for a single event (default: the event's own event_id)
        #[arg(long)]
        claimed: Option<String>,
        /// TOML rule table with extra room versions
        #[arg(long)]
        rules: Option<String>,
        /// Exit with error code if any verification fails
        #[arg(long)]
        strict: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the canonical redacted form that is hashed
    Redact {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Room version whose rules apply
        #[arg(long)]
        room_version: String,
        /// TOML rule table with extra room versions
        #[arg(long)]
        rules: Option<String>,
    },
    /// Show canonical bytes for input JSON
    Canonicalize {
        /// Input JSON file (or stdin if not provided)
        input: Option<String>,
        /// Reject floats and integers outside the interoperable range
        #[arg(long)]
        strict: bool,
    },
    /// Load a scenario and print its events with calculated IDs
    Scenario {
        /// Scenario file (.json document or newline-delimited events)
        file: String,
        /// TOML rule table with extra room versions
        #[arg(long)]
        rules: Option<String>,
        /// Print the processed scenario document, including remapped state and annotations
        #[arg(long)]
        json: bool,
    },
    /// List known room versions
    Versions {
        /// TOML rule table with extra room versions
        #[arg(long)]
        rules: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("EVID_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "evid_core=debug,evid_cli=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("EVID_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());
    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::EventId {
            input,
            room_version,
            rules,
        } => event_id::run(input, room_version, rules),
        Commands::Verify {
            input,
            room_version,
            claimed,
            rules,
            strict,
            json,
        } => verify::run(input, room_version, claimed, rules, strict, json),
        Commands::Redact {
            input,
            room_version,
            rules,
        } => redact::run(input, room_version, rules),
        Commands::Canonicalize { input, strict } => canonicalize::run(input, strict),
        Commands::Scenario { file, rules, json } => scenario::run(file, rules, json),
        Commands::Versions { rules, json } => versions::run(rules, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
