//! Room version rules, redaction and event ID derivation.
//!
//! This crate provides:
//! - Room version rule tables behind an injectable [`RuleSource`]
//! - Version-specific redaction of event JSON
//! - The event ID pipeline: redact, strip, canonicalize, hash, encode
//! - TOML rule-table configuration for extra room versions
//! - Scenario loading with placeholder event ID rewriting
//!
//! Core invariants:
//! - Derivation is a pure function of the event bytes and the resolved rule set
//! - Event IDs never depend on `signatures`, `unsigned` or a pre-existing `event_id`,
//!   except that legacy-format versions take their ID from `event_id`
//! - Every failure is a typed error; no empty or default identifier is returned
//!
#![deny(missing_docs)]

/// Rule-table configuration files.
pub mod config;
/// Error types for core operations.
pub mod errors;
/// Event ID derivation pipeline.
pub mod event_id;
/// Version-specific event redaction.
pub mod redaction;
/// Room version rule tables and resolution.
pub mod room_version;
/// Scenario loading and event ID rewriting.
pub mod scenario;

pub use config::{ConfigError, RuleTableConfig, VersionConfig};
pub use errors::CoreError;
pub use event_id::{
    canonical_form_for, compute_event_id, derive, event_id_for_event, event_id_with,
    reference_hash_for, verify_event_id, EventIdError,
};
pub use evid_canonical::{EventId, IdEncoding, ReferenceHash, RoomVersionId};
pub use redaction::redact;
pub use room_version::{
    known_versions, resolve, EventFormat, RedactionRules, RoomVersionRegistry, RuleSet,
    RuleSource,
};
pub use scenario::{Annotations, Scenario, ScenarioFile, DEFAULT_ROOM_VERSION};
