//! Room version rule tables.
//!
//! A room version tag resolves to a [`RuleSet`]: data describing what survives
//! redaction, which event format applies and how the reference hash is rendered.
//! The derivation pipeline only ever sees a resolved `RuleSet`, so adding a protocol
//! revision means adding a table entry here (or in a rule-table config file).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use evid_canonical::{IdEncoding, NumberPolicy, RoomVersionId};
use serde::{Deserialize, Serialize};

use crate::event_id::EventIdError;

/// Top-level identifier scheme of a room version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventFormat {
    /// The event carries its own opaque `event_id`.
    Legacy,
    /// The event ID is `$` plus the encoded reference hash.
    HashDerived,
}

/// Which keys survive redaction.
///
/// Each flag switches on one of the additions or removals the protocol made to the
/// original redaction algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RedactionRules {
    /// Keep top-level `origin`, `membership` and `prev_state`.
    pub keep_origin_membership_prev_state: bool,
    /// Keep `aliases` in `m.room.aliases` content.
    pub keep_aliases: bool,
    /// Keep `allow` in `m.room.join_rules` content.
    pub keep_join_rules_allow: bool,
    /// Keep `join_authorised_via_users_server` in `m.room.member` content.
    pub keep_member_join_authorised: bool,
    /// Keep `third_party_invite.signed` in `m.room.member` content.
    pub keep_member_third_party_invite_signed: bool,
    /// Keep all of `m.room.create` content instead of only `creator`.
    pub keep_all_create_content: bool,
    /// Keep `invite` in `m.room.power_levels` content.
    pub keep_power_levels_invite: bool,
    /// Keep `redacts` in `m.room.redaction` content.
    pub keep_redaction_redacts: bool,
}

impl RedactionRules {
    /// Room versions 1 to 5.
    pub const V1: Self = Self {
        keep_origin_membership_prev_state: true,
        keep_aliases: true,
        keep_join_rules_allow: false,
        keep_member_join_authorised: false,
        keep_member_third_party_invite_signed: false,
        keep_all_create_content: false,
        keep_power_levels_invite: false,
        keep_redaction_redacts: false,
    };

    /// Room versions 6 and 7: `m.room.aliases` loses its special case.
    pub const V6: Self = Self {
        keep_aliases: false,
        ..Self::V1
    };

    /// Room version 8: restricted join rules.
    pub const V8: Self = Self {
        keep_join_rules_allow: true,
        ..Self::V6
    };

    /// Room versions 9 and 10: authorising server on joins.
    pub const V9: Self = Self {
        keep_member_join_authorised: true,
        ..Self::V8
    };

    /// Room version 11 onwards.
    pub const V11: Self = Self {
        keep_origin_membership_prev_state: false,
        keep_member_third_party_invite_signed: true,
        keep_all_create_content: true,
        keep_power_levels_invite: true,
        keep_redaction_redacts: true,
        ..Self::V9
    };
}

/// Resolved, immutable rules for one room version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSet {
    /// Redaction table applied before hashing.
    pub redaction: RedactionRules,
    /// Identifier scheme.
    pub event_format: EventFormat,
    /// Hash rendering; required for [`EventFormat::HashDerived`].
    pub id_encoding: Option<IdEncoding>,
    /// Restrict numbers to integers in `±(2^53 - 1)`.
    pub strict_canonical_json: bool,
}

impl RuleSet {
    /// Rules for a legacy-format room version.
    pub const fn legacy(redaction: RedactionRules) -> Self {
        Self {
            redaction,
            event_format: EventFormat::Legacy,
            id_encoding: None,
            strict_canonical_json: false,
        }
    }

    /// Rules for a hash-derived room version.
    pub const fn hash_derived(
        redaction: RedactionRules,
        encoding: IdEncoding,
        strict_canonical_json: bool,
    ) -> Self {
        Self {
            redaction,
            event_format: EventFormat::HashDerived,
            id_encoding: Some(encoding),
            strict_canonical_json,
        }
    }

    /// Number policy for canonicalization under these rules.
    pub fn number_policy(&self) -> NumberPolicy {
        if self.strict_canonical_json {
            NumberPolicy::Strict
        } else {
            NumberPolicy::Lenient
        }
    }
}

/// Source of rule sets keyed by room version.
///
/// The seam through which callers inject their own rule tables.
pub trait RuleSource: Send + Sync {
    /// Resolves `version` by exact match.
    ///
    /// # Errors
    ///
    /// Returns [`EventIdError::UnknownVersion`] when the tag is not registered.
    fn resolve(&self, version: &str) -> Result<RuleSet, EventIdError>;
}

/// Table of room versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomVersionRegistry {
    versions: BTreeMap<RoomVersionId, RuleSet>,
}

static BUILTIN: OnceLock<RoomVersionRegistry> = OnceLock::new();

impl RoomVersionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide built-in table. Initialized once, read-only afterwards.
    pub fn builtin() -> &'static Self {
        BUILTIN.get_or_init(Self::with_builtin)
    }

    /// An owned copy of the built-in table that may be extended.
    pub fn with_builtin() -> Self {
        let url = IdEncoding::Base64UrlUnpadded;
        let entries = [
            ("1", RuleSet::legacy(RedactionRules::V1)),
            ("2", RuleSet::legacy(RedactionRules::V1)),
            (
                "3",
                RuleSet::hash_derived(RedactionRules::V1, IdEncoding::Base64Unpadded, false),
            ),
            ("4", RuleSet::hash_derived(RedactionRules::V1, url, false)),
            ("5", RuleSet::hash_derived(RedactionRules::V1, url, false)),
            ("6", RuleSet::hash_derived(RedactionRules::V6, url, true)),
            ("7", RuleSet::hash_derived(RedactionRules::V6, url, true)),
            ("8", RuleSet::hash_derived(RedactionRules::V8, url, true)),
            ("9", RuleSet::hash_derived(RedactionRules::V9, url, true)),
            ("10", RuleSet::hash_derived(RedactionRules::V9, url, true)),
            ("11", RuleSet::hash_derived(RedactionRules::V11, url, true)),
            ("12", RuleSet::hash_derived(RedactionRules::V11, url, true)),
            (
                "org.matrix.hydra.11",
                RuleSet::hash_derived(RedactionRules::V11, url, true),
            ),
        ];

        let mut registry = Self::new();
        for (tag, rules) in entries {
            registry.insert(tag, rules);
        }
        registry
    }

    /// Registers `rules` under `version`, returning the rules it replaced.
    pub fn insert(&mut self, version: impl Into<RoomVersionId>, rules: RuleSet) -> Option<RuleSet> {
        self.versions.insert(version.into(), rules)
    }

    /// Looks up a version without producing an error.
    pub fn get(&self, version: &str) -> Option<&RuleSet> {
        self.versions.get(&RoomVersionId::from(version))
    }

    /// Whether `version` is registered.
    pub fn contains(&self, version: &str) -> bool {
        self.get(version).is_some()
    }

    /// Registered versions in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&RoomVersionId, &RuleSet)> {
        self.versions.iter()
    }

    /// Number of registered versions.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

impl RuleSource for RoomVersionRegistry {
    fn resolve(&self, version: &str) -> Result<RuleSet, EventIdError> {
        self.get(version)
            .copied()
            .ok_or_else(|| EventIdError::UnknownVersion(version.to_string()))
    }
}

/// Resolves `version` against the built-in table.
pub fn resolve(version: &str) -> Result<RuleSet, EventIdError> {
    RoomVersionRegistry::builtin().resolve(version)
}

/// Tags registered in the built-in table.
pub fn known_versions() -> Vec<&'static str> {
    RoomVersionRegistry::builtin()
        .iter()
        .map(|(tag, _)| tag.as_str())
        .collect()
}
