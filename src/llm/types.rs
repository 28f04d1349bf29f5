use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::llm::decision::sanitize_coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation message. At most one `System` message per list, and
/// only in first position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Parts(parts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    /// Text segments joined by newlines; images are skipped.
    pub fn text_only(&self) -> String {
        match self {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { base64: String, mime_type: String },
}

impl ContentPart {
    pub fn data_url(base64: &str, mime_type: &str) -> String {
        format!("data:{mime_type};base64,{base64}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    pub kind: StreamChunkKind,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamChunkKind {
    Reasoning,
    Content,
    Done,
}

/// The single "next action" every backend resolves to.
///
/// `action` names a verb of the executor's closed vocabulary (`tap`, `type`,
/// `swipe`, `launch`, `wait`, `done`, ...). Fields the model emitted that are
/// not modelled here are preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDecision {
    pub action: String,
    #[serde(default, deserialize_with = "de_string_or_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub think: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_strings")]
    pub plan: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub plan_progress: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coordinates",
        deserialize_with = "de_coordinates"
    )]
    pub coordinates: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string_map")]
    pub extras: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub dest: Option<String>,
    /// Android keycode.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_i64")]
    pub code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_string")]
    pub setting: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ActionDecision {
    pub fn new(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reason: reason.into(),
            think: None,
            plan: None,
            plan_progress: None,
            coordinates: None,
            text: None,
            direction: None,
            package: None,
            activity: None,
            uri: None,
            extras: None,
            command: None,
            filename: None,
            query: None,
            url: None,
            path: None,
            source: None,
            dest: None,
            code: None,
            setting: None,
            extra: serde_json::Map::new(),
        }
    }

    /// No-op decision used whenever nothing usable came back from the model.
    pub fn wait(reason: impl Into<String>) -> Self {
        Self::new("wait", reason)
    }

    pub fn is_wait(&self) -> bool {
        self.action == "wait"
    }
}

// ── Lenient field decoding ─────────────────────────────────────────────────
// Models are sloppy with JSON types; optional fields coerce scalars to the
// expected type and drop anything else instead of failing the whole object.

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(scalar_to_string(&v))
}

fn de_string_or_empty<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(de_opt_string(d)?.unwrap_or_default())
}

fn de_opt_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Array(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
        _ => None,
    })
}

fn de_opt_string_map<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<HashMap<String, String>>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Object(map) => Some(
            map.iter()
                .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k.clone(), s)))
                .collect(),
        ),
        _ => None,
    })
}

fn de_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn de_coordinates<'de, D: Deserializer<'de>>(d: D) -> Result<Option<[f64; 2]>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(sanitize_coordinates(Some(&v)))
}

/// Whole-number coordinates go out as integers (`[540, 1200]`, not `[540.0, 1200.0]`).
fn ser_coordinates<S: Serializer>(coords: &Option<[f64; 2]>, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;

    let Some(pair) = coords else {
        return s.serialize_none();
    };
    let mut seq = s.serialize_seq(Some(2))?;
    for v in pair {
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            seq.serialize_element(&(*v as i64))?;
        } else {
            seq.serialize_element(v)?;
        }
    }
    seq.end()
}
