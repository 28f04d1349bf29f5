//! Android accessibility hierarchy extraction.
//!
//! Walks a `uiautomator dump` XML tree and returns every node that is either
//! interactive (clickable, editable, long-clickable, scrollable) or carries
//! visible text, with its geometry, state flags and inferred primary action.
use std::io::Cursor;

use xmltree::{Element, XMLNode};

use crate::perception::bounds::parse_bounds;
use crate::perception::types::{PrimaryAction, UIElement};

/// Parent context handed to top-level nodes.
const ROOT_CONTEXT: &str = "root";

const EDITABLE_CLASS_MARKERS: [&str; 2] = ["EditText", "AutoCompleteTextView"];

/// Result of one extraction pass. `warning` is set when the dump could not be
/// parsed; `elements` is then empty.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub elements: Vec<UIElement>,
    pub warning: Option<String>,
}

/// Parses hierarchy XML and collects interactive and textual nodes in
/// document order. Never fails: a malformed dump yields an empty list plus a
/// warning, since the screen may simply still be loading.
pub fn extract_elements(xml: &str) -> Extraction {
    let root = match Element::parse(Cursor::new(xml.as_bytes())) {
        Ok(root) => root,
        Err(e) => {
            let warning = format!(
                "accessibility XML parse failed; screen may still be loading ({e})"
            );
            tracing::warn!(error = %e, "accessibility XML parse failed");
            return Extraction {
                elements: Vec::new(),
                warning: Some(warning),
            };
        }
    };

    let mut elements = Vec::new();
    visit_node(&root, ROOT_CONTEXT, 0, &mut elements);
    tracing::debug!(count = elements.len(), "accessibility elements extracted");

    Extraction {
        elements,
        warning: None,
    }
}

fn visit_node(node: &Element, parent_ctx: &str, depth: u32, out: &mut Vec<UIElement>) {
    let Some(raw_bounds) = node.attributes.get("bounds").filter(|b| !b.is_empty()) else {
        // Wrapper nodes such as <hierarchy> and empty bounds don't count as a level.
        visit_children(node, parent_ctx, depth, out);
        return;
    };

    let attrs = NodeAttrs::read(node);
    let label = attrs.label();

    if attrs.is_interactive() || attrs.has_content() {
        if let Some(geometry) = parse_bounds(raw_bounds) {
            out.push(UIElement {
                id: attrs.resource_id.to_string(),
                text: if attrs.text.is_empty() {
                    attrs.desc.to_string()
                } else {
                    attrs.text.to_string()
                },
                class_name: attrs.type_name.to_string(),
                bounds: raw_bounds.clone(),
                center: geometry.center,
                size: geometry.size,
                clickable: attrs.clickable,
                editable: attrs.editable,
                enabled: attrs.enabled,
                checked: attrs.checked,
                focused: attrs.focused,
                selected: attrs.selected,
                scrollable: attrs.scrollable,
                long_clickable: attrs.long_clickable,
                password: attrs.password,
                hint: attrs.hint.to_string(),
                action: attrs.primary_action(),
                parent: parent_ctx.to_string(),
                depth,
            });
        }
    }

    visit_children(node, &label, depth + 1, out);
}

fn visit_children(node: &Element, parent_ctx: &str, depth: u32, out: &mut Vec<UIElement>) {
    for child in &node.children {
        if let XMLNode::Element(el) = child {
            if el.name == "node" || el.name == "hierarchy" {
                visit_node(el, parent_ctx, depth, out);
            }
        }
    }
}

fn attr<'a>(node: &'a Element, name: &str) -> &'a str {
    node.attributes.get(name).map(String::as_str).unwrap_or("")
}

/// Borrowed view over the attributes of one `<node>`.
struct NodeAttrs<'a> {
    text: &'a str,
    desc: &'a str,
    resource_id: &'a str,
    hint: &'a str,
    type_name: &'a str,
    clickable: bool,
    long_clickable: bool,
    scrollable: bool,
    editable: bool,
    enabled: bool,
    checked: bool,
    focused: bool,
    selected: bool,
    password: bool,
}

impl<'a> NodeAttrs<'a> {
    fn read(node: &'a Element) -> Self {
        let get = |name: &str| attr(node, name);
        let is_true = |name: &str| attr(node, name) == "true";

        let class = get("class");
        let editable = EDITABLE_CLASS_MARKERS.iter().any(|m| class.contains(m)) || is_true("editable");

        Self {
            text: get("text"),
            desc: get("content-desc"),
            resource_id: get("resource-id"),
            hint: get("hint"),
            type_name: class.rsplit('.').next().unwrap_or(""),
            clickable: is_true("clickable"),
            long_clickable: is_true("long-clickable"),
            scrollable: is_true("scrollable"),
            editable,
            // Enabled unless explicitly disabled.
            enabled: get("enabled") != "false",
            checked: is_true("checked"),
            focused: is_true("focused"),
            selected: is_true("selected"),
            password: is_true("password"),
        }
    }

    fn is_interactive(&self) -> bool {
        self.clickable || self.editable || self.long_clickable || self.scrollable
    }

    fn has_content(&self) -> bool {
        !self.text.is_empty() || !self.desc.is_empty()
    }

    /// Context label passed down to children.
    fn label(&self) -> String {
        let id_tail = self.resource_id.rsplit('/').next().unwrap_or("");
        [self.text, self.desc, id_tail, self.type_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .unwrap_or("")
            .to_string()
    }

    fn primary_action(&self) -> PrimaryAction {
        if self.editable {
            PrimaryAction::Type
        } else if self.long_clickable && !self.clickable {
            PrimaryAction::LongPress
        } else if self.scrollable && !self.clickable {
            PrimaryAction::Scroll
        } else if self.clickable {
            PrimaryAction::Tap
        } else {
            PrimaryAction::Read
        }
    }
}
