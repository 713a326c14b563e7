use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Largest magnitude an integer may have under [`NumberPolicy::Strict`] (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CanonicalizationError {
    /// A non-integer number was found while numbers are restricted to integers.
    #[error("non-integer number at {0}")]
    FloatNotAllowed(String),
    /// An integer lies outside `[-(2^53 - 1), 2^53 - 1]`.
    #[error("integer out of range at {0}")]
    IntegerOutOfRange(String),
    /// The serializer rejected the value.
    #[error("other error: {0}")]
    Other(String),
}

/// How numbers are treated during canonicalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberPolicy {
    /// Only integers in the interoperable range are accepted.
    Strict,
    /// Any JSON number is accepted and normalized by the serializer.
    Lenient,
}

/// Canonical UTF-8 bytes for a JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm {
    bytes: Vec<u8>,
}

impl CanonicalForm {
    /// Borrows the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the form, returning the canonical bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Canonical text. The serializer only ever emits UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}

impl AsRef<[u8]> for CanonicalForm {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Helper for building JSON paths in error messages.
#[derive(Debug, Clone)]
struct Path {
    segments: Vec<String>,
}

impl Path {
    fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    fn push_field(&self, field: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Self { segments }
    }

    fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("[{}]", index));
        Self { segments }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "root")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

/// Canonicalizer that emits deterministic bytes.
///
/// Object keys are sorted by code point, insignificant whitespace is dropped and
/// strings are emitted as UTF-8 with minimal escaping. Two structurally equal values
/// always produce the same bytes, whatever their source key order or formatting.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    numbers: NumberPolicy,
}

impl Canonicalizer {
    /// Creates a new canonicalizer with the given number policy.
    pub fn new(numbers: NumberPolicy) -> Self {
        Self { numbers }
    }

    /// The number policy this canonicalizer enforces.
    pub fn number_policy(&self) -> NumberPolicy {
        self.numbers
    }

    /// Produces canonical bytes for `value`.
    pub fn canonicalize(&self, value: &Value) -> Result<CanonicalForm, CanonicalizationError> {
        if self.numbers == NumberPolicy::Strict {
            validate_numbers(value, Path::root())?;
        }

        let mut buf = String::new();
        write_canonical(value, &mut buf)?;

        Ok(CanonicalForm {
            bytes: buf.into_bytes(),
        })
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new(NumberPolicy::Strict)
    }
}

fn write_canonical(value: &Value, buf: &mut String) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null => buf.push_str("null"),
        Value::Bool(b) => {
            if *b {
                buf.push_str("true");
            } else {
                buf.push_str("false");
            }
        }
        // Emits the number as it was written in the source document.
        Value::Number(n) => buf.push_str(&n.to_string()),
        Value::String(s) => write_string(s, buf)?,
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf)?;
            }
            buf.push(']');
        }
        Value::Object(map) => {
            // Byte order of UTF-8 keys is code point order.
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_unstable_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            buf.push('{');
            for (i, (key, child)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_string(key, buf)?;
                buf.push(':');
                write_canonical(child, buf)?;
            }
            buf.push('}');
        }
    }
    Ok(())
}

/// Quotes `s` with minimal escaping: `"`, `\` and control characters only.
fn write_string(s: &str, buf: &mut String) -> Result<(), CanonicalizationError> {
    let quoted =
        serde_json::to_string(s).map_err(|err| CanonicalizationError::Other(err.to_string()))?;
    buf.push_str(&quoted);
    Ok(())
}

fn validate_numbers(value: &Value, path: Path) -> Result<(), CanonicalizationError> {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                validate_numbers(child, path.push_field(key))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                validate_numbers(item, path.push_index(idx))?;
            }
            Ok(())
        }
        Value::Number(num) => check_integer(num, &path),
        Value::String(_) | Value::Bool(_) | Value::Null => Ok(()),
    }
}

fn check_integer(num: &Number, path: &Path) -> Result<(), CanonicalizationError> {
    let in_range = if let Some(i) = num.as_i64() {
        (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i)
    } else if let Some(u) = num.as_u64() {
        u <= MAX_SAFE_INTEGER as u64
    } else {
        return Err(CanonicalizationError::FloatNotAllowed(path.to_string()));
    };

    if in_range {
        Ok(())
    } else {
        Err(CanonicalizationError::IntegerOutOfRange(path.to_string()))
    }
}
