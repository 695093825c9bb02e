//! Channel Store Integration Tests
//!
//! Tests for resolution, filtering and the two assignment paths.

use serde_json::{json, Value};
use snactor::core::{ChannelData, ChannelError, ChannelManager};
use snactor::domain::ChannelDecl;

fn data(value: Value) -> ChannelData {
    value.as_object().cloned().unwrap()
}

fn decls(names: &[&str]) -> Vec<ChannelDecl> {
    names.iter().map(|name| ChannelDecl::new(*name)).collect()
}

#[test]
fn test_literal_is_returned_unchanged() {
    let manager = ChannelManager::new();

    for literal in ["hello", "@leading", "trailing@", "", "a.b.c"] {
        assert_eq!(manager.resolve(literal).unwrap(), json!(literal));
    }
}

#[test]
fn test_resolve_returns_stored_value() {
    let manager = ChannelManager::with_data(data(json!({
        "facts": { "os": { "name": "fedora", "version": 40 } }
    })));

    assert_eq!(
        manager.resolve("@facts@").unwrap(),
        json!({ "os": { "name": "fedora", "version": 40 } })
    );
    assert_eq!(manager.resolve("@facts.os.version@").unwrap(), json!(40));
    assert!(matches!(
        manager.resolve("@missing@"),
        Err(ChannelError::Lookup { .. })
    ));
}

#[test]
fn test_assign_to_variable_then_resolve() {
    let mut manager = ChannelManager::new();

    manager
        .assign_to_variable("@b.a.b.c.d@", json!("b.a.b.c.d=value"))
        .unwrap();
    assert_eq!(manager.resolve("@b.a.b.c.d@").unwrap(), json!("b.a.b.c.d=value"));

    manager
        .assign_to_variable("@c@", json!({ "value": "value" }))
        .unwrap();
    assert_eq!(manager.resolve("@c.value@").unwrap(), json!("value"));
}

#[test]
fn test_assign_to_variable_discards_siblings() {
    let mut manager = ChannelManager::with_data(data(json!({
        "a": { "keep": 1, "b": { "old": true } }
    })));

    manager.assign_to_variable("@a.b.c@", json!("v")).unwrap();

    assert_eq!(manager.resolve("@a.b.c@").unwrap(), json!("v"));
    assert_eq!(manager.resolve("@a@").unwrap(), json!({ "b": { "c": "v" } }));
    assert!(manager.resolve("@a.keep@").is_err());
}

#[test]
fn test_assign_to_variable_rejects_bad_specs() {
    let mut manager = ChannelManager::new();

    for spec in ["@@", "@", "x@x", "no-markers"] {
        let result = manager.assign_to_variable(spec, Value::Null);
        assert!(
            matches!(result, Err(ChannelError::InvalidTarget(_))),
            "'{}' should be rejected",
            spec
        );
    }
    assert!(manager.data().is_empty());
}

#[test]
fn test_assign_filtered_is_write_once() {
    let mut manager = ChannelManager::with_data(data(json!({ "b": "existing" })));
    let incoming = data(json!({ "a": 1, "b": 2, "c": 3, "extra": 4 }));

    let result = manager.assign_filtered(&decls(&["a", "b", "c"]), &incoming);

    assert_eq!(result, Err(ChannelError::MutabilityViolation("b".to_string())));
    assert!(!result.unwrap_err().is_lookup());
    // "a" was declared before the conflict and stays, "c" after it is skipped
    assert_eq!(manager.resolve("@a@").unwrap(), json!(1));
    assert_eq!(manager.resolve("@b@").unwrap(), json!("existing"));
    assert!(manager.resolve("@c@").is_err());
    assert!(manager.resolve("@extra@").is_err());
}

#[test]
fn test_assign_filtered_follows_declaration_order() {
    let mut manager = ChannelManager::with_data(data(json!({ "a": "existing" })));
    let incoming = data(json!({ "a": 1, "b": 2, "z": 3 }));

    let result = manager.assign_filtered(&decls(&["z", "b", "a"]), &incoming);

    assert_eq!(result, Err(ChannelError::MutabilityViolation("a".to_string())));
    assert_eq!(manager.resolve("@z@").unwrap(), json!(3));
    assert_eq!(manager.resolve("@b@").unwrap(), json!(2));
    assert_eq!(manager.resolve("@a@").unwrap(), json!("existing"));
}

#[test]
fn test_assign_filtered_stops_at_conflict_in_declaration_order() {
    let mut manager = ChannelManager::with_data(data(json!({ "m": "existing" })));
    let incoming = data(json!({ "a": 1, "m": 2, "z": 3 }));

    let result = manager.assign_filtered(&decls(&["z", "m", "a"]), &incoming);

    assert_eq!(result, Err(ChannelError::MutabilityViolation("m".to_string())));
    assert_eq!(manager.resolve("@z@").unwrap(), json!(3));
    // "a" sorts first but was declared after the conflict
    assert!(manager.resolve("@a@").is_err());
}

#[test]
fn test_assign_filtered_duplicate_declaration() {
    let mut manager = ChannelManager::new();
    let incoming = data(json!({ "x": 1 }));

    manager.assign_filtered(&decls(&["x", "x"]), &incoming).unwrap();
    assert_eq!(manager.resolve("@x@").unwrap(), json!(1));
}

#[test]
fn test_assign_filtered_only_declared() {
    let mut manager = ChannelManager::new();
    let incoming = data(json!({ "wanted": [1, 2], "noise": "x" }));

    manager.assign_filtered(&decls(&["wanted"]), &incoming).unwrap();

    assert_eq!(manager.data().len(), 1);
    assert_eq!(manager.resolve("@wanted@").unwrap(), json!([1, 2]));
}

#[test]
fn test_filter_reports_every_missing_name() {
    let mut manager = ChannelManager::new();
    let incoming = data(json!({ "present": true }));

    let err = manager
        .assign_filtered(&decls(&["first", "present", "second"]), &incoming)
        .unwrap_err();

    assert_eq!(err.to_string(), "Missing channel(s) first,second");
    assert!(manager.data().is_empty());
}

#[test]
fn test_get_filtered() {
    let manager = ChannelManager::with_data(data(json!({ "x": 1, "y": 2, "z": 3 })));

    let filtered = manager.get_filtered(&decls(&["x", "z"])).unwrap();
    assert_eq!(Value::Object(filtered), json!({ "x": 1, "z": 3 }));

    match manager.get_filtered(&decls(&["x", "p", "q"])) {
        Err(ChannelError::MissingChannels(missing)) => {
            assert_eq!(missing, vec!["p".to_string(), "q".to_string()]);
        }
        other => panic!("Expected MissingChannels, got {:?}", other),
    }
}
