use serde_json::json;

use super::*;

#[test]
fn bad_states_file_is_invalid_states() {
    let err = parse_states("[{ \"entity_id\": ").unwrap_err();
    assert!(matches!(err, CliError::InvalidStates(_)));
    assert!(err.to_string().starts_with("invalid entity states"));
}

#[test]
fn states_file_parses() {
    let source = parse_states(r#"[{ "entity_id": "light.desk", "state": "on" }]"#).unwrap();
    assert_eq!(source.len(), 1);
}

#[test]
fn output_errors_have_their_own_message() {
    let cause = serde_json::from_str::<Value>("{").unwrap_err();
    let err = CliError::Output(cause);
    assert!(err.to_string().starts_with("failed to serialize output"));
}

#[test]
fn report_renders_pretty() {
    let rendered = render_json(&json!({ "supported": ["circle"] })).unwrap();
    assert!(rendered.contains("\n  \"supported\""));
}
