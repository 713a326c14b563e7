use crate::digest::{IdEncoding, ReferenceHash};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sigil that prefixes every hash-derived event ID.
pub const EVENT_ID_SIGIL: char = '$';

macro_rules! newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrows the identifier text.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier, returning its text.
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    RoomVersionId,
    "Protocol revision tag. Opaque; compared by exact string match."
);
newtype!(
    EventId,
    "Event identifier: a legacy opaque string or `$` followed by an encoded reference hash."
);

impl EventId {
    /// Builds the hash-derived identifier `$<encoded hash>`.
    pub fn from_hash(hash: &ReferenceHash, encoding: IdEncoding) -> Self {
        let mut id = String::with_capacity(1 + crate::digest::ENCODED_HASH_LEN);
        id.push(EVENT_ID_SIGIL);
        id.push_str(&hash.encode(encoding));
        Self(id)
    }

    /// Parses an identifier.
    ///
    /// With an encoding, the text must be `$` followed by exactly 43 characters of that
    /// encoding's alphabet. Without one the identifier is legacy and only has to be
    /// non-empty.
    pub fn parse(
        value: impl Into<String>,
        encoding: Option<IdEncoding>,
    ) -> Result<Self, ValidationError> {
        let s = value.into();
        let valid = match encoding {
            Some(encoding) => encoding.id_regex().is_match(&s),
            None => !s.is_empty(),
        };
        if !valid {
            return Err(ValidationError::PatternMismatch {
                field: "event_id",
                value: s,
            });
        }
        Ok(Self(s))
    }

    /// Recovers the reference hash from a hash-derived identifier.
    pub fn decode_hash(&self, encoding: IdEncoding) -> Result<ReferenceHash, ValidationError> {
        let encoded = self.0.strip_prefix(EVENT_ID_SIGIL).ok_or_else(|| {
            ValidationError::PatternMismatch {
                field: "event_id",
                value: self.0.clone(),
            }
        })?;
        encoding.decode_hash(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_ids_carry_sigil_and_alphabet() {
        let hash = ReferenceHash::from_bytes([0xfb; 32]);
        let std_id = EventId::from_hash(&hash, IdEncoding::Base64Unpadded);
        let url_id = EventId::from_hash(&hash, IdEncoding::Base64UrlUnpadded);

        assert!(std_id.as_str().starts_with('$'));
        assert!(std_id.as_str().contains('+') || std_id.as_str().contains('/'));
        assert!(!url_id.as_str().contains('+') && !url_id.as_str().contains('/'));
        assert_eq!(url_id.as_str().len(), 44);
        assert_eq!(url_id.decode_hash(IdEncoding::Base64UrlUnpadded).unwrap(), hash);
    }

    #[test]
    fn parse_checks_shape() {
        let hash = ReferenceHash::of(b"abc");
        let id = EventId::from_hash(&hash, IdEncoding::Base64UrlUnpadded);
        assert!(EventId::parse(id.as_str(), Some(IdEncoding::Base64UrlUnpadded)).is_ok());
        assert!(EventId::parse("$short", Some(IdEncoding::Base64UrlUnpadded)).is_err());
        assert!(EventId::parse("$legacy:example.org", None).is_ok());
        assert!(EventId::parse("", None).is_err());
    }

    #[test]
    fn parse_rejects_foreign_alphabet_and_reuses_patterns() {
        let hash = ReferenceHash::from_bytes([0xfb; 32]);
        let std_id = EventId::from_hash(&hash, IdEncoding::Base64Unpadded);
        let url_id = EventId::from_hash(&hash, IdEncoding::Base64UrlUnpadded);

        assert!(EventId::parse(std_id.as_str(), Some(IdEncoding::Base64Unpadded)).is_ok());
        assert!(EventId::parse(std_id.as_str(), Some(IdEncoding::Base64UrlUnpadded)).is_err());
        assert!(EventId::parse(url_id.as_str(), Some(IdEncoding::Base64Unpadded)).is_err());
        assert!(std::ptr::eq(
            IdEncoding::Base64UrlUnpadded.id_regex(),
            IdEncoding::Base64UrlUnpadded.id_regex()
        ));
    }

    #[test]
    fn decode_hash_requires_sigil() {
        let id = EventId::new("abc");
        assert!(matches!(
            id.decode_hash(IdEncoding::Base64Unpadded),
            Err(ValidationError::PatternMismatch { .. })
        ));
    }
}
