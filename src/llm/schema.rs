use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldType {
    String,
    StringArray,
    StringMap,
    Number,
    NumberPair,
}

struct Field {
    name: &'static str,
    ty: FieldType,
    required: bool,
    description: &'static str,
}

const fn field(name: &'static str, ty: FieldType, description: &'static str) -> Field {
    Field {
        name,
        ty,
        required: false,
        description,
    }
}

const fn required(name: &'static str, ty: FieldType, description: &'static str) -> Field {
    Field {
        name,
        ty,
        required: true,
        description,
    }
}

/// Wire schema of [`ActionDecision`](crate::llm::types::ActionDecision).
const FIELDS: &[Field] = &[
    field("think", FieldType::String, "Your reasoning about the current screen state and what to do next"),
    field("plan", FieldType::StringArray, "3-5 high-level steps to achieve the goal"),
    field("planProgress", FieldType::String, "Which plan step you are currently on"),
    required("action", FieldType::String, "The action to take, e.g. tap, type, scroll, enter, back, home, wait, done, longpress, launch, shell, open_url, keyevent, open_settings, find_and_tap"),
    field("coordinates", FieldType::NumberPair, "Target as [x, y], used by tap, longpress, type and paste"),
    field("text", FieldType::String, "Text to type, clipboard text, or email body"),
    field("direction", FieldType::String, "Scroll direction: up, down, left, right"),
    required("reason", FieldType::String, "Why you chose this action"),
    field("package", FieldType::String, "App package name for launch"),
    field("activity", FieldType::String, "Activity name for launch"),
    field("uri", FieldType::String, "URI for launch"),
    field("extras", FieldType::StringMap, "Intent extras for launch"),
    field("command", FieldType::String, "Shell command to run"),
    field("filename", FieldType::String, "Screenshot filename"),
    field("query", FieldType::String, "Email address, search term, or text filter"),
    field("url", FieldType::String, "URL to open"),
    field("path", FieldType::String, "Device file path for pull_file"),
    field("source", FieldType::String, "Local file path for push_file"),
    field("dest", FieldType::String, "Device destination path for push_file"),
    field("code", FieldType::Number, "Android keycode for keyevent"),
    field("setting", FieldType::String, "Settings page: wifi, bluetooth, display, sound, battery, location, apps, date, accessibility, developer"),
];

impl FieldType {
    fn json_schema(self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::StringArray => json!({ "type": "array", "items": { "type": "string" } }),
            FieldType::StringMap => json!({ "type": "object", "additionalProperties": { "type": "string" } }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::NumberPair => json!({
                "type": "array",
                "items": { "type": "number" },
                "minItems": 2,
                "maxItems": 2
            }),
        }
    }

    fn accepts(self, v: &Value) -> bool {
        match self {
            FieldType::String => v.is_string(),
            FieldType::StringArray => v
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            FieldType::StringMap => v
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
            FieldType::Number => v.is_number(),
            FieldType::NumberPair => v
                .as_array()
                .is_some_and(|items| items.len() == 2 && items.iter().all(Value::is_number)),
        }
    }
}

/// JSON Schema sent to structured-output backends.
pub fn action_decision_schema() -> Value {
    let properties: Map<String, Value> = FIELDS
        .iter()
        .map(|f| {
            let mut schema = f.ty.json_schema();
            schema["description"] = json!(f.description);
            (f.name.to_string(), schema)
        })
        .collect();
    let required: Vec<&str> = FIELDS.iter().filter(|f| f.required).map(|f| f.name).collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Checks a value against the schema. Unknown properties are allowed;
/// `null` counts as absent for optional fields.
pub fn validate(value: &Value) -> Result<(), String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    for f in FIELDS {
        match obj.get(f.name) {
            None | Some(Value::Null) if f.required => {
                return Err(format!("missing required field '{}'", f.name));
            }
            None | Some(Value::Null) => {}
            Some(v) if !f.ty.accepts(v) => {
                return Err(format!("field '{}' has the wrong type", f.name));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
