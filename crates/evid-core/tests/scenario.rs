use evid_core::{
    compute_event_id, resolve, verify_event_id, CoreError, EventId, RoomVersionRegistry,
    RuleTableConfig, ScenarioFile,
};
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

fn scenario_document() -> Value {
    json!({
        "tardis_version": 1,
        "room_version": "10",
        "room_id": "!chat:example.org",
        "calculate_event_ids": true,
        "events": [
            {
                "event_id": "$CREATE",
                "type": "m.room.create",
                "state_key": "",
                "sender": "@alice:example.org",
                "depth": 1,
                "prev_events": [],
                "auth_events": [],
                "content": {"creator": "@alice:example.org"}
            },
            {
                "event_id": "$JOIN",
                "type": "m.room.member",
                "state_key": "@alice:example.org",
                "sender": "@alice:example.org",
                "depth": 2,
                "prev_events": ["$CREATE"],
                "auth_events": ["$CREATE"],
                "content": {"membership": "join"}
            },
            {
                "event_id": "$MSG",
                "type": "m.room.message",
                "sender": "@alice:example.org",
                "depth": 3,
                "prev_events": ["$JOIN"],
                "auth_events": ["$CREATE", "$JOIN", "$EXTERNAL"],
                "content": {"body": "hello"}
            }
        ],
        "precalculated_state_after": {
            "$JOIN": ["$CREATE", "$JOIN", "$MISSING"],
            "$NOPE": ["$CREATE"]
        },
        "annotations": {
            "title": "join then talk",
            "events": {"$MSG": "first message"}
        }
    })
}

fn process(doc: &Value) -> evid_core::Scenario {
    ScenarioFile::from_json_str(&doc.to_string())
        .unwrap()
        .process(RoomVersionRegistry::builtin())
        .unwrap()
}

#[test]
fn calculated_ids_replace_placeholders_and_references() {
    let scenario = process(&scenario_document());
    let ids = scenario.event_ids();
    assert_eq!(ids.len(), 3);
    for id in &ids {
        assert!(id.as_str().starts_with('$'));
        assert_eq!(id.as_str().len(), 44);
    }

    let (create, join, msg) = (&ids[0], &ids[1], &ids[2]);
    assert_eq!(scenario.events[1]["prev_events"], json!([create.as_str()]));
    assert_eq!(
        scenario.events[2]["auth_events"],
        json!([create.as_str(), join.as_str(), "$EXTERNAL"])
    );

    for event in &scenario.events {
        assert_eq!(event["room_id"], json!("!chat:example.org"));
    }

    let annotations = scenario.annotations.unwrap();
    assert_eq!(annotations.events[msg.as_str()], "first message");
}

#[test]
fn rewritten_events_verify_against_their_ids() {
    let scenario = process(&scenario_document());
    let rules = resolve("10").unwrap();
    for event in &scenario.events {
        let claimed = EventId::new(event["event_id"].as_str().unwrap());
        assert!(verify_event_id(event, &claimed, &rules).unwrap());
    }
}

#[test]
fn precalculated_state_is_remapped() {
    let scenario = process(&scenario_document());
    let ids = scenario.event_ids();
    let state = scenario.precalculated_state_after.unwrap();

    assert_eq!(
        state[ids[1].as_str()],
        vec![ids[0].as_str().to_string(), ids[1].as_str().to_string()]
    );
    assert!(!state.contains_key("$JOIN"));
    assert!(state.contains_key("$NOPE"));
}

#[test]
fn without_calculation_ids_are_untouched() {
    let mut doc = scenario_document();
    doc["calculate_event_ids"] = json!(false);
    let scenario = process(&doc);
    let ids: Vec<String> = scenario
        .event_ids()
        .into_iter()
        .map(EventId::into_string)
        .collect();
    assert_eq!(ids, vec!["$CREATE", "$JOIN", "$MSG"]);
    assert!(scenario
        .precalculated_state_after
        .unwrap()
        .contains_key("$JOIN"));
}

#[test]
fn legacy_scenarios_keep_their_ids() {
    let mut doc = scenario_document();
    doc["room_version"] = json!("1");
    let scenario = process(&doc);
    let rules = resolve("1").unwrap();
    assert_eq!(scenario.event_ids()[0].as_str(), "$CREATE");
    assert_eq!(
        compute_event_id(&scenario.events[2], &rules).unwrap().as_str(),
        "$MSG"
    );
}

#[test]
fn missing_fields_are_reported() {
    let mut doc = scenario_document();
    doc["events"][1]
        .as_object_mut()
        .unwrap()
        .remove("type");
    let err = ScenarioFile::from_json_str(&doc.to_string())
        .unwrap()
        .process(RoomVersionRegistry::builtin())
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidScenario(msg) if msg.contains("'type'")));
}

#[test]
fn load_dispatches_on_extension() {
    let temp_dir = TempDir::new().unwrap();

    let doc_path = temp_dir.path().join("room.json");
    fs::write(&doc_path, scenario_document().to_string()).unwrap();
    let doc = ScenarioFile::load(&doc_path).unwrap();
    assert!(doc.calculate_event_ids);

    let lines_path = temp_dir.path().join("room.ndjson");
    let lines: Vec<String> = scenario_document()["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(Value::to_string)
        .collect();
    fs::write(&lines_path, lines.join("\n")).unwrap();
    let ndjson = ScenarioFile::load(&lines_path).unwrap();
    assert_eq!(ndjson.events.len(), 3);
    assert!(!ndjson.calculate_event_ids);

    assert!(matches!(
        ScenarioFile::load(temp_dir.path().join("absent.json")),
        Err(CoreError::Io { .. })
    ));
}

#[test]
fn scenarios_can_use_configured_versions() {
    let registry = RuleTableConfig::from_toml_str(
        r#"
        [versions.custom]
        base = "3"
        "#,
    )
    .unwrap()
    .into_registry()
    .unwrap();

    let mut doc = scenario_document();
    doc["room_version"] = json!("custom");
    let scenario = ScenarioFile::from_json_str(&doc.to_string())
        .unwrap()
        .process(&registry)
        .unwrap();
    assert_eq!(scenario.room_version.as_str(), "custom");
    assert_ne!(scenario.event_ids()[0].as_str(), "$CREATE");
}
