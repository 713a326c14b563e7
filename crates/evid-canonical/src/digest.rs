use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest as Sha2Digest, Sha256};
use std::fmt;
use std::sync::OnceLock;

use crate::validation::ValidationError;

/// Length in bytes of a reference hash.
pub const REFERENCE_HASH_LEN: usize = 32;

/// Length of an unpadded Base64 rendering of a reference hash.
pub const ENCODED_HASH_LEN: usize = 43;

/// SHA-256 digest of an event's canonical form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReferenceHash([u8; REFERENCE_HASH_LEN]);

impl ReferenceHash {
    /// Hashes `bytes` with SHA-256.
    pub fn of(bytes: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(bytes.as_ref());
        let mut out = [0u8; REFERENCE_HASH_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; REFERENCE_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; REFERENCE_HASH_LEN] {
        &self.0
    }

    /// Renders the digest with the given encoding.
    pub fn encode(&self, encoding: IdEncoding) -> String {
        encoding.encode(self.0)
    }
}

impl fmt::Debug for ReferenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceHash({})", URL_SAFE_NO_PAD.encode(self.0))
    }
}

/// Base64 variant used to render a reference hash as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdEncoding {
    /// Standard alphabet (`+`, `/`), no padding.
    Base64Unpadded,
    /// URL-safe alphabet (`-`, `_`), no padding.
    Base64UrlUnpadded,
}

impl IdEncoding {
    /// Encodes bytes without padding.
    pub fn encode(self, bytes: impl AsRef<[u8]>) -> String {
        match self {
            IdEncoding::Base64Unpadded => STANDARD_NO_PAD.encode(bytes),
            IdEncoding::Base64UrlUnpadded => URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    /// Decodes unpadded text in this encoding's alphabet.
    pub fn decode(self, text: &str) -> Result<Vec<u8>, ValidationError> {
        let decoded = match self {
            IdEncoding::Base64Unpadded => STANDARD_NO_PAD.decode(text),
            IdEncoding::Base64UrlUnpadded => URL_SAFE_NO_PAD.decode(text),
        };
        decoded.map_err(|err| ValidationError::InvalidEncoding {
            encoding: self.name(),
            reason: err.to_string(),
        })
    }

    /// Decodes text into a reference hash, checking the digest length.
    pub fn decode_hash(self, text: &str) -> Result<ReferenceHash, ValidationError> {
        let bytes = self.decode(text)?;
        let array: [u8; REFERENCE_HASH_LEN] =
            bytes
                .try_into()
                .map_err(|bytes: Vec<u8>| ValidationError::InvalidEncoding {
                    encoding: self.name(),
                    reason: format!(
                        "expected {} digest bytes, got {}",
                        REFERENCE_HASH_LEN,
                        bytes.len()
                    ),
                })?;
        Ok(ReferenceHash(array))
    }

    /// Stable name, matching the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            IdEncoding::Base64Unpadded => "base64-unpadded",
            IdEncoding::Base64UrlUnpadded => "base64-url-unpadded",
        }
    }

    /// Regex matching a `$`-prefixed identifier in this encoding, compiled once.
    pub(crate) fn id_regex(self) -> &'static Regex {
        static STANDARD: OnceLock<Regex> = OnceLock::new();
        static URL_SAFE: OnceLock<Regex> = OnceLock::new();
        match self {
            IdEncoding::Base64Unpadded => STANDARD.get_or_init(|| {
                Regex::new(r"^\$[A-Za-z0-9+/]{43}$").expect("invalid regex")
            }),
            IdEncoding::Base64UrlUnpadded => URL_SAFE.get_or_init(|| {
                Regex::new(r"^\$[A-Za-z0-9_-]{43}$").expect("invalid regex")
            }),
        }
    }
}

impl fmt::Display for IdEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
