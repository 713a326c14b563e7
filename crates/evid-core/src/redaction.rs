//! Event redaction.
//!
//! Redaction reduces an event to the keys that form its identity before hashing.
//! Which keys survive is driven entirely by [`RedactionRules`].

use serde_json::{Map, Value};

use crate::event_id::EventIdError;
use crate::room_version::RedactionRules;

/// Top-level keys every room version keeps.
const KEPT_TOP_LEVEL: &[&str] = &[
    "event_id",
    "type",
    "room_id",
    "sender",
    "state_key",
    "content",
    "hashes",
    "signatures",
    "depth",
    "prev_events",
    "auth_events",
    "origin_server_ts",
];

/// Top-level keys dropped from room version 11.
const KEPT_TOP_LEVEL_PRE_V11: &[&str] = &["origin", "membership", "prev_state"];

const POWER_LEVELS_KEYS: &[&str] = &[
    "ban",
    "events",
    "events_default",
    "kick",
    "redact",
    "state_default",
    "users",
    "users_default",
];

/// Redacts `event` according to `rules`.
///
/// The result always carries a `content` object, empty when nothing survives.
///
/// # Errors
///
/// Returns [`EventIdError::MalformedInput`] if `type` is present but not a string, or
/// `content` is present but not an object.
pub fn redact(
    event: &Map<String, Value>,
    rules: &RedactionRules,
) -> Result<Map<String, Value>, EventIdError> {
    let event_type = match event.get("type") {
        None => "",
        Some(Value::String(event_type)) => event_type.as_str(),
        Some(other) => {
            return Err(EventIdError::MalformedInput(format!(
                "type must be a string, got {}",
                json_kind(other)
            )))
        }
    };

    let mut redacted = Map::new();
    for (key, value) in event {
        let kept = KEPT_TOP_LEVEL.contains(&key.as_str())
            || (rules.keep_origin_membership_prev_state
                && KEPT_TOP_LEVEL_PRE_V11.contains(&key.as_str()));
        if kept && key != "content" {
            redacted.insert(key.clone(), value.clone());
        }
    }

    let content = match event.get("content") {
        None => Map::new(),
        Some(Value::Object(content)) => redact_content(event_type, content, rules),
        Some(other) => {
            return Err(EventIdError::MalformedInput(format!(
                "content must be an object, got {}",
                json_kind(other)
            )))
        }
    };
    redacted.insert("content".to_string(), Value::Object(content));

    Ok(redacted)
}

fn redact_content(
    event_type: &str,
    content: &Map<String, Value>,
    rules: &RedactionRules,
) -> Map<String, Value> {
    let mut keep: Vec<&str> = Vec::new();
    match event_type {
        "m.room.member" => {
            keep.push("membership");
            if rules.keep_member_join_authorised {
                keep.push("join_authorised_via_users_server");
            }
        }
        "m.room.create" => {
            if rules.keep_all_create_content {
                return content.clone();
            }
            keep.push("creator");
        }
        "m.room.join_rules" => {
            keep.push("join_rule");
            if rules.keep_join_rules_allow {
                keep.push("allow");
            }
        }
        "m.room.power_levels" => {
            keep.extend_from_slice(POWER_LEVELS_KEYS);
            if rules.keep_power_levels_invite {
                keep.push("invite");
            }
        }
        "m.room.aliases" if rules.keep_aliases => keep.push("aliases"),
        "m.room.history_visibility" => keep.push("history_visibility"),
        "m.room.redaction" if rules.keep_redaction_redacts => keep.push("redacts"),
        _ => {}
    }

    let mut out: Map<String, Value> = content
        .iter()
        .filter(|(key, _)| keep.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if event_type == "m.room.member" && rules.keep_member_third_party_invite_signed {
        let signed = content
            .get("third_party_invite")
            .and_then(Value::as_object)
            .and_then(|invite| invite.get("signed"));
        if let Some(signed) = signed {
            let mut invite = Map::new();
            invite.insert("signed".to_string(), signed.clone());
            out.insert("third_party_invite".to_string(), Value::Object(invite));
        }
    }

    out
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn redact_value(event: Value, rules: RedactionRules) -> Value {
        let map = event.as_object().cloned().unwrap();
        Value::Object(redact(&map, &rules).unwrap())
    }

    #[test]
    fn drops_unknown_top_level_keys_and_message_content() {
        let out = redact_value(
            json!({
                "type": "m.room.message",
                "room_id": "!room:example.org",
                "sender": "@alice:example.org",
                "content": {"body": "hi", "msgtype": "m.text"},
                "unsigned": {"age": 5},
                "custom": true,
                "origin": "example.org"
            }),
            RedactionRules::V9,
        );
        assert_eq!(
            out,
            json!({
                "type": "m.room.message",
                "room_id": "!room:example.org",
                "sender": "@alice:example.org",
                "content": {},
                "origin": "example.org"
            })
        );
    }

    #[test]
    fn v11_drops_origin_membership_prev_state() {
        let out = redact_value(
            json!({
                "type": "m.room.message",
                "origin": "example.org",
                "membership": "join",
                "prev_state": [],
                "depth": 3
            }),
            RedactionRules::V11,
        );
        assert_eq!(out, json!({"type": "m.room.message", "depth": 3, "content": {}}));
    }

    #[test]
    fn missing_content_becomes_empty_object() {
        let out = redact_value(json!({"type": "m.room.message"}), RedactionRules::V1);
        assert_eq!(out["content"], json!({}));
    }

    #[test]
    fn non_object_content_is_malformed() {
        let map = json!({"type": "m.room.message", "content": "hi"})
            .as_object()
            .cloned()
            .unwrap();
        assert!(matches!(
            redact(&map, &RedactionRules::V1),
            Err(EventIdError::MalformedInput(_))
        ));
    }

    #[test]
    fn non_string_type_is_malformed() {
        for event_type in [json!(7), json!(null), json!(["m.room.member"])] {
            let map = json!({"type": event_type, "content": {"membership": "join"}})
                .as_object()
                .cloned()
                .unwrap();
            assert!(matches!(
                redact(&map, &RedactionRules::V9),
                Err(EventIdError::MalformedInput(msg)) if msg.contains("type")
            ));
        }
    }

    #[test]
    fn member_content_by_version() {
        let event = json!({
            "type": "m.room.member",
            "content": {
                "membership": "join",
                "displayname": "Alice",
                "join_authorised_via_users_server": "@bob:example.org",
                "third_party_invite": {"display_name": "a", "signed": {"token": "t"}}
            }
        });

        let v8 = redact_value(event.clone(), RedactionRules::V8);
        assert_eq!(v8["content"], json!({"membership": "join"}));

        let v9 = redact_value(event.clone(), RedactionRules::V9);
        assert_eq!(
            v9["content"],
            json!({"membership": "join", "join_authorised_via_users_server": "@bob:example.org"})
        );

        let v11 = redact_value(event, RedactionRules::V11);
        assert_eq!(
            v11["content"],
            json!({
                "membership": "join",
                "join_authorised_via_users_server": "@bob:example.org",
                "third_party_invite": {"signed": {"token": "t"}}
            })
        );
    }

    #[test]
    fn create_content_by_version() {
        let event = json!({
            "type": "m.room.create",
            "content": {"creator": "@alice:example.org", "room_version": "10"}
        });
        assert_eq!(
            redact_value(event.clone(), RedactionRules::V9)["content"],
            json!({"creator": "@alice:example.org"})
        );
        assert_eq!(
            redact_value(event, RedactionRules::V11)["content"],
            json!({"creator": "@alice:example.org", "room_version": "10"})
        );
    }

    #[test]
    fn aliases_only_kept_before_v6() {
        let event = json!({"type": "m.room.aliases", "content": {"aliases": ["#a:b"]}});
        assert_eq!(
            redact_value(event.clone(), RedactionRules::V1)["content"],
            json!({"aliases": ["#a:b"]})
        );
        assert_eq!(redact_value(event, RedactionRules::V6)["content"], json!({}));
    }

    #[test]
    fn join_rules_power_levels_and_redaction() {
        let join_rules = json!({
            "type": "m.room.join_rules",
            "content": {"join_rule": "restricted", "allow": [], "extra": 1}
        });
        assert_eq!(
            redact_value(join_rules.clone(), RedactionRules::V6)["content"],
            json!({"join_rule": "restricted"})
        );
        assert_eq!(
            redact_value(join_rules, RedactionRules::V8)["content"],
            json!({"join_rule": "restricted", "allow": []})
        );

        let power_levels = json!({
            "type": "m.room.power_levels",
            "content": {"ban": 50, "invite": 0, "notifications": {"room": 50}}
        });
        assert_eq!(
            redact_value(power_levels.clone(), RedactionRules::V9)["content"],
            json!({"ban": 50})
        );
        assert_eq!(
            redact_value(power_levels, RedactionRules::V11)["content"],
            json!({"ban": 50, "invite": 0})
        );

        let redaction = json!({"type": "m.room.redaction", "content": {"redacts": "$x", "reason": "spam"}});
        assert_eq!(
            redact_value(redaction.clone(), RedactionRules::V9)["content"],
            json!({})
        );
        assert_eq!(
            redact_value(redaction, RedactionRules::V11)["content"],
            json!({"redacts": "$x"})
        );
    }
}
