use droidclaw::llm::decision::{parse_decision, recover_decision, RecoveryStrategy, PARSE_FAILURE_REASON};
use droidclaw::llm::provider::collect_decision;
use futures_util::stream;

#[test]
fn fenced_reply_with_prose_is_recovered() {
    let reply = "Sure! Here is my answer:\n```json\n{\"action\": \"type\", \"text\": \"hello\", \"reason\": \"fill the field\"}\n```";
    let (decision, strategy) = recover_decision(reply).unwrap();
    assert_eq!(strategy, RecoveryStrategy::EmbeddedObject);
    assert_eq!(decision.action, "type");
    assert_eq!(decision.text.as_deref(), Some("hello"));
}

#[test]
fn raw_newlines_inside_strings_are_tolerated() {
    let reply = "{\"action\":\"tap\",\"coordinates\":[540,1200],\"reason\":\"open\nsettings\"}";
    let decision = parse_decision(reply);
    assert_eq!(decision.action, "tap");
    assert_eq!(decision.coordinates, Some([540.0, 1200.0]));
}

#[test]
fn garbage_becomes_wait() {
    let decision = parse_decision("I am not sure what to do next.");
    assert!(decision.is_wait());
    assert_eq!(decision.reason, PARSE_FAILURE_REASON);
}

#[test]
fn invalid_coordinates_are_dropped_not_fatal() {
    let decision = parse_decision(r#"{"action":"tap","coordinates":[-5,10],"reason":"x"}"#);
    assert_eq!(decision.action, "tap");
    assert_eq!(decision.coordinates, None);

    let decision = parse_decision(r#"{"action":"tap","coordinates":"540,1200","reason":"x"}"#);
    assert_eq!(decision.coordinates, None);
}

#[test]
fn serialized_decision_round_trips_unknown_fields() {
    let decision = parse_decision(r#"{"action":"swipe","direction":"up","reason":"more","confidence":0.9}"#);
    let json: serde_json::Value = serde_json::to_value(&decision).unwrap();
    assert_eq!(json["direction"], "up");
    assert_eq!(json["confidence"], 0.9);
    assert!(json.get("coordinates").is_none());
}

#[tokio::test]
async fn streamed_fragments_parse_like_a_single_reply() {
    let fragments = vec![
        Ok("{\"action\":\"launch\",".to_string()),
        Ok("\"package\":\"com.android.settings\",".to_string()),
        Ok("\"reason\":\"open settings\"}".to_string()),
    ];
    let decision = collect_decision(Box::pin(stream::iter(fragments))).await.unwrap();
    assert_eq!(decision.action, "launch");
    assert_eq!(decision.package.as_deref(), Some("com.android.settings"));
}
