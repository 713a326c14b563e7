//! Rule-table configuration.
//!
//! Extra room versions can be declared in TOML, either inheriting a registered rule
//! set through `base` or spelling one out in full:
//!
//! ```toml
//! [versions."org.example.custom"]
//! base = "10"
//! strict_canonical_json = false
//!
//! [versions."org.example.legacy"]
//! event_format = "legacy"
//!
//! [versions."org.example.legacy".redaction]
//! keep_origin_membership_prev_state = true
//! keep_aliases = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use evid_canonical::IdEncoding;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::room_version::{EventFormat, RedactionRules, RoomVersionRegistry, RuleSet};

/// Errors raised while loading a rule-table file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for a rule table.
    #[error("invalid rule table: {0}")]
    Parse(#[from] toml::de::Error),
    /// `base` names a version that is not registered.
    #[error("version {version:?} inherits unknown base {base:?}")]
    UnknownBase {
        /// Version being declared.
        version: String,
        /// Missing base.
        base: String,
    },
    /// A version without `base` leaves out a required field.
    #[error("version {version:?} has no base and does not set {field}")]
    Incomplete {
        /// Version being declared.
        version: String,
        /// Missing field.
        field: &'static str,
    },
    /// A hash-derived version has no identifier encoding.
    #[error("version {0:?} is hash-derived but names no id_encoding")]
    MissingEncoding(String),
}

/// Top-level rule-table document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTableConfig {
    /// Declared versions keyed by tag.
    #[serde(default)]
    pub versions: BTreeMap<String, VersionConfig>,
}

/// One declared room version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionConfig {
    /// Registered version to inherit from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Identifier scheme override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_format: Option<EventFormat>,
    /// Hash rendering override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_encoding: Option<IdEncoding>,
    /// Number policy override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict_canonical_json: Option<bool>,
    /// Full redaction table override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redaction: Option<RedactionRules>,
}

impl RuleTableConfig {
    /// Parses a rule table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a rule table file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loaded rule table");
        Self::from_toml_str(&text)
    }

    /// Registers every declared version into `registry`.
    ///
    /// Bases are looked up in `registry` as it stands before this call, so declared
    /// versions cannot inherit from each other.
    pub fn apply(&self, registry: &mut RoomVersionRegistry) -> Result<(), ConfigError> {
        let base_table = registry.clone();
        for (version, declared) in &self.versions {
            let rules = declared.resolve(version, &base_table)?;
            if registry.insert(version.as_str(), rules).is_some() {
                warn!(%version, "rule table overrides a registered room version");
            }
        }
        Ok(())
    }

    /// Built-in table extended with this configuration.
    pub fn into_registry(self) -> Result<RoomVersionRegistry, ConfigError> {
        let mut registry = RoomVersionRegistry::with_builtin();
        self.apply(&mut registry)?;
        Ok(registry)
    }
}

impl VersionConfig {
    fn resolve(&self, version: &str, table: &RoomVersionRegistry) -> Result<RuleSet, ConfigError> {
        let inherited = match &self.base {
            Some(base) => Some(*table.get(base).ok_or_else(|| ConfigError::UnknownBase {
                version: version.to_string(),
                base: base.clone(),
            })?),
            None => None,
        };

        let incomplete = |field| ConfigError::Incomplete {
            version: version.to_string(),
            field,
        };

        let event_format = self
            .event_format
            .or(inherited.map(|r| r.event_format))
            .ok_or_else(|| incomplete("event_format"))?;
        let redaction = self
            .redaction
            .or(inherited.map(|r| r.redaction))
            .ok_or_else(|| incomplete("redaction"))?;
        let strict_canonical_json = self
            .strict_canonical_json
            .or(inherited.map(|r| r.strict_canonical_json))
            .unwrap_or(event_format == EventFormat::HashDerived);

        let id_encoding = match event_format {
            EventFormat::Legacy => None,
            EventFormat::HashDerived => Some(
                self.id_encoding
                    .or(inherited.and_then(|r| r.id_encoding))
                    .ok_or_else(|| ConfigError::MissingEncoding(version.to_string()))?,
            ),
        };

        Ok(RuleSet {
            redaction,
            event_format,
            id_encoding,
            strict_canonical_json,
        })
    }
}
