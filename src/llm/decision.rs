use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::llm::schema;
use crate::llm::types::ActionDecision;

/// Upper bound on how much of an unparseable reply goes into the log.
const LOG_PREFIX_CHARS: usize = 200;

pub const PARSE_FAILURE_REASON: &str = "Failed to parse response, waiting";

/// Ways of pulling a decision out of free-form model text, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// The whole reply is a JSON object.
    Direct,
    /// The reply parses once raw newlines are flattened to spaces.
    NewlinesReplaced,
    /// The first `{` .. last `}` span parses after flattening newlines.
    EmbeddedObject,
}

const STRATEGIES: [RecoveryStrategy; 3] = [
    RecoveryStrategy::Direct,
    RecoveryStrategy::NewlinesReplaced,
    RecoveryStrategy::EmbeddedObject,
];

impl RecoveryStrategy {
    fn attempt(self, text: &str) -> Option<ActionDecision> {
        match self {
            RecoveryStrategy::Direct => decode_object(text),
            RecoveryStrategy::NewlinesReplaced => decode_object(&sanitize_json_text(text)),
            RecoveryStrategy::EmbeddedObject => {
                let span = object_span().find(text)?;
                decode_object(&sanitize_json_text(span.as_str()))
            }
        }
    }
}

fn object_span() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Models often put literal newlines inside JSON string values.
pub fn sanitize_json_text(raw: &str) -> String {
    raw.replace(['\n', '\r'], " ")
}

fn decode_object(text: &str) -> Option<ActionDecision> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => decision_from_object(map),
        _ => None,
    }
}

/// Converts a JSON object into a decision. Coordinates always pass through
/// [`sanitize_coordinates`] during deserialization.
pub(crate) fn decision_from_object(map: serde_json::Map<String, Value>) -> Option<ActionDecision> {
    serde_json::from_value(Value::Object(map)).ok()
}

/// Runs the recovery strategies in order and reports which one succeeded.
pub fn recover_decision(text: &str) -> Option<(ActionDecision, RecoveryStrategy)> {
    STRATEGIES
        .iter()
        .find_map(|s| s.attempt(text).map(|d| (d, *s)))
}

/// Best-effort decision recovery from raw model text. Never fails: when no
/// strategy yields an object the result is a `wait` decision.
pub fn parse_decision(text: &str) -> ActionDecision {
    match recover_decision(text) {
        Some((decision, strategy)) => {
            tracing::debug!(?strategy, action = %decision.action, "decision parsed");
            decision
        }
        None => {
            let prefix: String = text.chars().take(LOG_PREFIX_CHARS).collect();
            tracing::warn!(response = %prefix, "could not parse LLM response");
            ActionDecision::wait(PARSE_FAILURE_REASON)
        }
    }
}

/// Parses output of a schema-constrained backend. The text must be one JSON
/// object that validates against the action schema; no free-text recovery
/// is attempted.
pub fn parse_structured_decision(text: &str) -> ActionDecision {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "structured output is not valid JSON");
            return ActionDecision::wait(format!("Structured output was not valid JSON: {e}"));
        }
    };
    if let Err(violation) = schema::validate(&value) {
        tracing::warn!(%violation, "structured output failed schema validation");
        return ActionDecision::wait(format!("Structured output failed validation: {violation}"));
    }
    match value {
        Value::Object(map) => decision_from_object(map)
            .unwrap_or_else(|| ActionDecision::wait(PARSE_FAILURE_REASON)),
        _ => ActionDecision::wait(PARSE_FAILURE_REASON),
    }
}

/// Accepts only a pair of finite, non-negative numbers.
pub fn sanitize_coordinates(raw: Option<&Value>) -> Option<[f64; 2]> {
    let Some(Value::Array(items)) = raw else {
        return None;
    };
    let [x, y] = items.as_slice() else {
        return None;
    };
    let (x, y) = (x.as_f64()?, y.as_f64()?);
    (x.is_finite() && y.is_finite() && x >= 0.0 && y >= 0.0).then_some([x, y])
}
