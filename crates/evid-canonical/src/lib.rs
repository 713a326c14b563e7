//! Canonical primitives for content-derived event identifiers.
//!
//! Everything that decides the exact bytes of an identifier lives in this crate:
//! canonical JSON serialization, the SHA-256 reference hash and the two unpadded
//! Base64 renderings. Room-version policy is layered on top in `evid-core`.
//!
#![deny(missing_docs)]

/// Canonical JSON serialization for deterministic hashing.
pub mod canonicalizer;
/// Reference hash and identifier encodings.
pub mod digest;
/// Identifier newtypes.
pub mod identifiers;
/// Validation errors used by identifier types.
pub mod validation;

pub use canonicalizer::{
    CanonicalForm, CanonicalizationError, Canonicalizer, NumberPolicy, MAX_SAFE_INTEGER,
};
pub use digest::{IdEncoding, ReferenceHash, ENCODED_HASH_LEN, REFERENCE_HASH_LEN};
pub use identifiers::{EventId, RoomVersionId, EVENT_ID_SIGIL};
pub use validation::ValidationError;
