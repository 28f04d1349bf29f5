use serde::{Deserialize, Serialize};

/// The single action a node most plausibly supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryAction {
    Tap,
    Type,
    #[serde(rename = "longpress")]
    LongPress,
    Scroll,
    Read,
}

/// Derived geometry of a `[x1,y1][x2,y2]` rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub center: (i64, i64),
    pub size: (i64, i64),
}

/// One interactive or informative node of an accessibility dump.
///
/// Built once per extraction; `center` and `size` come from `bounds` and are
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UIElement {
    /// Raw `resource-id`, may be empty.
    pub id: String,
    /// Visible text, else content description.
    pub text: String,
    /// Trailing segment of the node's class name.
    #[serde(rename = "type")]
    pub class_name: String,
    pub bounds: String,
    pub center: (i64, i64),
    pub size: (i64, i64),
    pub clickable: bool,
    pub editable: bool,
    pub enabled: bool,
    pub checked: bool,
    pub focused: bool,
    pub selected: bool,
    pub scrollable: bool,
    pub long_clickable: bool,
    pub password: bool,
    pub hint: String,
    pub action: PrimaryAction,
    /// Label of the nearest ancestor carrying bounds, or `"root"`.
    pub parent: String,
    pub depth: u32,
}

/// Token-lean projection of a [`UIElement`] for the model.
///
/// Optional fields are emitted only when they differ from their default;
/// an absent field means: enabled, unchecked, unfocused, no hint, not
/// editable, not scrollable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactElement {
    pub text: String,
    pub center: [i64; 2],
    pub action: PrimaryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrollable: Option<bool>,
}

impl CompactElement {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn is_checked(&self) -> bool {
        self.checked.unwrap_or(false)
    }

    pub fn is_focused(&self) -> bool {
        self.focused.unwrap_or(false)
    }

    pub fn is_editable(&self) -> bool {
        self.editable.unwrap_or(false)
    }

    pub fn is_scrollable(&self) -> bool {
        self.scrollable.unwrap_or(false)
    }

    pub fn hint(&self) -> &str {
        self.hint.as_deref().unwrap_or("")
    }
}

impl From<&UIElement> for CompactElement {
    fn from(el: &UIElement) -> Self {
        Self {
            text: el.text.clone(),
            center: [el.center.0, el.center.1],
            action: el.action,
            enabled: (!el.enabled).then_some(false),
            checked: el.checked.then_some(true),
            focused: el.focused.then_some(true),
            hint: (!el.hint.is_empty()).then(|| el.hint.clone()),
            editable: el.editable.then_some(true),
            scrollable: el.scrollable.then_some(true),
        }
    }
}
