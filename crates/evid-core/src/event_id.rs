//! Event ID derivation.
//!
//! The pipeline runs in a fixed order and stops at the first failure:
//! parse, redact, strip `signatures`/`unsigned`/`event_id`, canonicalize, hash with
//! SHA-256, then encode according to the room version's event format.

use evid_canonical::{
    CanonicalForm, CanonicalizationError, Canonicalizer, EventId, ReferenceHash,
};
use serde_json::{Map, Value};
use tracing::debug;

use crate::redaction::{json_kind, redact};
use crate::room_version::{resolve, EventFormat, RuleSet, RuleSource};

/// Keys removed after redaction and before hashing.
const IDENTITY_ADJACENT_KEYS: &[&str] = &["signatures", "unsigned", "event_id"];

/// Error during event ID computation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EventIdError {
    /// The room version is not registered.
    #[error("unknown room version: {0:?}")]
    UnknownVersion(String),
    /// The event bytes are not a JSON object of the expected shape.
    #[error("malformed event: {0}")]
    MalformedInput(String),
    /// Canonicalization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
    /// A legacy-format event has no string `event_id`.
    #[error("legacy event format requires a string event_id")]
    MissingLegacyId,
    /// A hash-derived rule set names no identifier encoding.
    #[error("no supported event ID encoding declared for hash-derived format")]
    UnsupportedEncoding,
}

/// Output of the redact, strip and canonicalize stages.
struct Prepared {
    form: CanonicalForm,
    original_id: Option<Value>,
}

/// Derives the event ID of `raw` JSON under `rules`.
///
/// # Errors
///
/// - [`EventIdError::MalformedInput`] if `raw` is not a JSON object.
/// - [`EventIdError::Canonicalization`] if the redacted event has no canonical form.
/// - [`EventIdError::MissingLegacyId`] for legacy events without a string `event_id`.
/// - [`EventIdError::UnsupportedEncoding`] for hash-derived rules without an encoding.
pub fn derive(raw: &[u8], rules: &RuleSet) -> Result<EventId, EventIdError> {
    let event = parse_event(raw)?;
    derive_from_map(&event, rules)
}

/// Derives the event ID of an already-parsed event.
///
/// # Example
///
/// ```rust
/// use evid_core::{compute_event_id, room_version::resolve};
/// use serde_json::json;
///
/// let rules = resolve("1")?;
/// let event = json!({
///     "type": "m.room.message",
///     "content": {"body": "hi"},
///     "event_id": "$legacyABC"
/// });
///
/// let event_id = compute_event_id(&event, &rules)?;
/// assert_eq!(event_id.as_str(), "$legacyABC");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// As [`derive`]; non-object values are [`EventIdError::MalformedInput`].
pub fn compute_event_id(event: &Value, rules: &RuleSet) -> Result<EventId, EventIdError> {
    let event = as_event_object(event)?;
    derive_from_map(event, rules)
}

/// Resolves `version` in the built-in table and derives the event ID of `raw`.
///
/// This is the two-argument boundary call for host bindings.
///
/// # Errors
///
/// [`EventIdError::UnknownVersion`] for unregistered tags, otherwise as [`derive`].
pub fn event_id_for_event(raw: &[u8], version: &str) -> Result<EventId, EventIdError> {
    let rules = resolve(version)?;
    derive(raw, &rules)
}

/// Like [`event_id_for_event`], resolving against a caller-supplied rule source.
///
/// # Errors
///
/// [`EventIdError::UnknownVersion`] for unregistered tags, otherwise as [`derive`].
pub fn event_id_with(
    source: &dyn RuleSource,
    raw: &[u8],
    version: &str,
) -> Result<EventId, EventIdError> {
    let rules = source.resolve(version)?;
    derive(raw, &rules)
}

/// Canonical bytes that are hashed for `event`: redacted, stripped of
/// `signatures`/`unsigned`/`event_id`, then canonicalized.
///
/// # Errors
///
/// As [`derive`] for the parse, redaction and canonicalization stages.
pub fn canonical_form_for(event: &Value, rules: &RuleSet) -> Result<CanonicalForm, EventIdError> {
    let event = as_event_object(event)?;
    Ok(prepare(event, rules)?.form)
}

/// Computes the SHA-256 reference hash of the redacted, stripped, canonical event.
///
/// # Errors
///
/// As [`derive`] for the parse, redaction and canonicalization stages.
pub fn reference_hash_for(event: &Value, rules: &RuleSet) -> Result<ReferenceHash, EventIdError> {
    Ok(ReferenceHash::of(canonical_form_for(event, rules)?))
}

/// Verifies that `claimed` is the event ID of `event` under `rules`.
///
/// # Errors
///
/// Returns [`EventIdError`] if the ID cannot be computed.
pub fn verify_event_id(
    event: &Value,
    claimed: &EventId,
    rules: &RuleSet,
) -> Result<bool, EventIdError> {
    let computed = compute_event_id(event, rules)?;
    Ok(&computed == claimed)
}

fn parse_event(raw: &[u8]) -> Result<Map<String, Value>, EventIdError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|err| EventIdError::MalformedInput(err.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(EventIdError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn as_event_object(event: &Value) -> Result<&Map<String, Value>, EventIdError> {
    event.as_object().ok_or_else(|| {
        EventIdError::MalformedInput(format!(
            "expected a JSON object, got {}",
            json_kind(event)
        ))
    })
}

fn prepare(event: &Map<String, Value>, rules: &RuleSet) -> Result<Prepared, EventIdError> {
    let mut redacted = redact(event, &rules.redaction)?;

    let original_id = redacted.get("event_id").cloned();
    for key in IDENTITY_ADJACENT_KEYS {
        redacted.remove(*key);
    }

    let canonicalizer = Canonicalizer::new(rules.number_policy());
    let form = canonicalizer.canonicalize(&Value::Object(redacted))?;
    debug!(bytes = form.as_bytes().len(), "canonicalized redacted event");

    Ok(Prepared { form, original_id })
}

fn derive_from_map(event: &Map<String, Value>, rules: &RuleSet) -> Result<EventId, EventIdError> {
    let Prepared { form, original_id } = prepare(event, rules)?;
    let hash = ReferenceHash::of(form.as_bytes());

    let event_id = match rules.event_format {
        EventFormat::Legacy => match original_id {
            Some(Value::String(id)) => EventId::new(id),
            _ => return Err(EventIdError::MissingLegacyId),
        },
        EventFormat::HashDerived => {
            let encoding = rules
                .id_encoding
                .ok_or(EventIdError::UnsupportedEncoding)?;
            EventId::from_hash(&hash, encoding)
        }
    };

    debug!(format = ?rules.event_format, %event_id, "derived event ID");
    Ok(event_id)
}
