//! Scenario loading and event ID rewriting.
//!
//! A scenario is a list of events, in processing order, that are usually written by
//! hand with placeholder event IDs. When `calculate_event_ids` is set every placeholder
//! is replaced by the event's real ID under the scenario's room version, and all
//! references to it are rewritten to match.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use evid_canonical::{EventId, RoomVersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::CoreError;
use crate::event_id::compute_event_id;
use crate::room_version::RuleSource;

/// Room version assumed for newline-delimited event files.
pub const DEFAULT_ROOM_VERSION: &str = "10";

/// Event keys holding lists of referenced event IDs.
const REFERENCE_KEYS: &[&str] = &["prev_events", "auth_events"];

/// Free-form labels attached to a scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotations {
    /// Graph title.
    #[serde(default)]
    pub title: String,
    /// Labels keyed by event ID.
    #[serde(default)]
    pub events: BTreeMap<String, String>,
}

/// On-disk scenario document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// File format version, always 1.
    #[serde(default = "default_file_version")]
    pub tardis_version: u32,
    /// Events in processing order.
    pub events: Vec<Value>,
    /// Room version of the events.
    #[serde(default = "default_room_version")]
    pub room_version: String,
    /// Fills `room_id` on events that lack one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    /// Replace placeholder event IDs with derived ones.
    #[serde(default)]
    pub calculate_event_ids: bool,
    /// Forced state after an event, as lists of event IDs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precalculated_state_after: Option<BTreeMap<String, Vec<String>>>,
    /// Optional labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

fn default_file_version() -> u32 {
    1
}

fn default_room_version() -> String {
    DEFAULT_ROOM_VERSION.to_string()
}

/// A processed scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    /// Events in processing order, with IDs and references rewritten.
    pub events: Vec<Value>,
    /// Room version of the events.
    pub room_version: RoomVersionId,
    /// Forced state after an event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precalculated_state_after: Option<BTreeMap<String, Vec<String>>>,
    /// Optional labels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

impl ScenarioFile {
    /// Parses a scenario document.
    pub fn from_json_str(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses newline-delimited event JSON into a scenario with default settings.
    ///
    /// The room ID is taken from the first event.
    pub fn from_ndjson_str(text: &str) -> Result<Self, CoreError> {
        let events = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str::<Value>)
            .collect::<Result<Vec<_>, _>>()?;
        let room_id = events
            .first()
            .and_then(|ev| ev.get("room_id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            tardis_version: default_file_version(),
            events,
            room_version: default_room_version(),
            room_id,
            calculate_event_ids: false,
            precalculated_state_after: None,
            annotations: None,
        })
    }

    /// Reads a scenario from disk.
    ///
    /// `.json` and `.json5` files are scenario documents (JSON syntax); anything else is
    /// read as newline-delimited events.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let is_document = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("json" | "json5")
        );
        if is_document {
            Self::from_json_str(&text)
        } else {
            Self::from_ndjson_str(&text)
        }
    }

    /// Validates events, fills room IDs and, if requested, derives real event IDs.
    ///
    /// References to placeholders are rewritten before an event is hashed, so each
    /// emitted event verifies against its own ID.
    pub fn process(self, source: &dyn RuleSource) -> Result<Scenario, CoreError> {
        let rules = source.resolve(&self.room_version)?;
        let mut annotations = self.annotations;
        let mut placeholders: HashMap<String, String> = HashMap::new();
        let mut events = Vec::with_capacity(self.events.len());

        for (index, mut event) in self.events.into_iter().enumerate() {
            let placeholder = check_event(index, &event)?;

            if let (Some(room_id), Some(obj)) = (&self.room_id, event.as_object_mut()) {
                let missing = obj.get("room_id").map_or(true, is_blank);
                if missing {
                    obj.insert("room_id".to_string(), Value::String(room_id.clone()));
                }
            }

            if self.calculate_event_ids {
                rewrite_references(index, &mut event, &placeholders)?;
                let real = compute_event_id(&event, &rules)?.into_string();
                event["event_id"] = Value::String(real.clone());

                if let Some(annotations) = annotations.as_mut() {
                    if let Some(label) = annotations.events.get(&placeholder).cloned() {
                        annotations.events.insert(real.clone(), label);
                    }
                }
                debug!(%placeholder, %real, "assigned event ID");
                placeholders.insert(placeholder, real);
            }

            events.push(event);
        }

        let mut precalculated = self.precalculated_state_after;
        if self.calculate_event_ids {
            if let Some(state) = precalculated.as_mut() {
                remap_state_after(state, &placeholders);
            }
        }

        Ok(Scenario {
            events,
            room_version: RoomVersionId::new(self.room_version),
            precalculated_state_after: precalculated,
            annotations,
        })
    }
}

impl Scenario {
    /// Event IDs in processing order.
    pub fn event_ids(&self) -> Vec<EventId> {
        self.events
            .iter()
            .filter_map(|ev| ev.get("event_id").and_then(Value::as_str))
            .map(EventId::from)
            .collect()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        other => is_blank(other),
    }
}

/// Checks required fields and returns the event's placeholder ID.
fn check_event(index: usize, event: &Value) -> Result<String, CoreError> {
    let obj = event
        .as_object()
        .ok_or_else(|| CoreError::InvalidScenario(format!("event {index} is not an object")))?;

    for field in ["event_id", "type", "depth"] {
        if obj.get(field).map_or(true, is_falsy) {
            return Err(CoreError::InvalidScenario(format!(
                "event {index} is missing '{field}', got {event}"
            )));
        }
    }

    match obj.get("event_id") {
        Some(Value::String(id)) => Ok(id.clone()),
        _ => Err(CoreError::InvalidScenario(format!(
            "event {index} has a non-string 'event_id'"
        ))),
    }
}

fn rewrite_references(
    index: usize,
    event: &mut Value,
    placeholders: &HashMap<String, String>,
) -> Result<(), CoreError> {
    for key in REFERENCE_KEYS {
        let Some(refs) = event.get_mut(*key) else {
            continue;
        };
        let Value::Array(refs) = refs else {
            return Err(CoreError::InvalidScenario(format!(
                "event {index} has a non-array '{key}'"
            )));
        };
        for reference in refs.iter_mut() {
            let replacement = reference
                .as_str()
                .and_then(|id| placeholders.get(id))
                .cloned();
            if let Some(real) = replacement {
                *reference = Value::String(real);
            }
        }
    }
    Ok(())
}

fn remap_state_after(
    state: &mut BTreeMap<String, Vec<String>>,
    placeholders: &HashMap<String, String>,
) {
    let keys: Vec<String> = state.keys().cloned().collect();
    for fake_at in keys {
        let Some(real_at) = placeholders.get(&fake_at) else {
            warn!(
                event = %fake_at,
                "precalculated_state_after references an unknown event, skipping"
            );
            continue;
        };
        let Some(members) = state.remove(&fake_at) else {
            continue;
        };
        let remapped = members
            .into_iter()
            .filter_map(|fake| match placeholders.get(&fake) {
                Some(real) => Some(real.clone()),
                None => {
                    warn!(
                        at = %fake_at,
                        event = %fake,
                        "precalculated_state_after member references an unknown event, skipping"
                    );
                    None
                }
            })
            .collect();
        state.insert(real_at.clone(), remapped);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room_version::RoomVersionRegistry;
    use serde_json::json;

    #[test]
    fn ndjson_defaults_room_version_and_room_id() {
        let text = "{\"event_id\":\"$a\",\"type\":\"m.room.create\",\"depth\":1,\"room_id\":\"!r:x\"}\n\n{\"event_id\":\"$b\",\"type\":\"m.room.member\",\"depth\":2}\n";
        let file = ScenarioFile::from_ndjson_str(text).unwrap();
        assert_eq!(file.events.len(), 2);
        assert_eq!(file.room_version, DEFAULT_ROOM_VERSION);
        assert_eq!(file.room_id.as_deref(), Some("!r:x"));
        assert!(!file.calculate_event_ids);

        let scenario = file.process(RoomVersionRegistry::builtin()).unwrap();
        assert_eq!(scenario.events[1]["room_id"], json!("!r:x"));
        assert_eq!(
            scenario.event_ids(),
            vec![EventId::new("$a"), EventId::new("$b")]
        );
    }

    #[test]
    fn zero_depth_is_rejected() {
        let file = ScenarioFile::from_json_str(
            r#"{"tardis_version":1,"events":[{"event_id":"$a","type":"m.room.create","depth":0}]}"#,
        )
        .unwrap();
        let err = file.process(RoomVersionRegistry::builtin()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidScenario(msg) if msg.contains("depth")));
    }

    #[test]
    fn unknown_room_version_fails() {
        let file = ScenarioFile::from_json_str(
            r#"{"events":[],"room_version":"nope"}"#,
        )
        .unwrap();
        assert!(matches!(
            file.process(RoomVersionRegistry::builtin()),
            Err(CoreError::EventId(_))
        ));
    }

    #[test]
    fn state_after_keeps_unknown_keys() {
        let mut state = BTreeMap::new();
        state.insert("$fake".to_string(), vec!["$fake".to_string(), "$gone".to_string()]);
        state.insert("$stray".to_string(), vec![]);
        let placeholders = HashMap::from([("$fake".to_string(), "$real".to_string())]);

        remap_state_after(&mut state, &placeholders);

        assert_eq!(state.get("$real"), Some(&vec!["$real".to_string()]));
        assert!(state.contains_key("$stray"));
        assert!(!state.contains_key("$fake"));
    }
}
