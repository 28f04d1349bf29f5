use std::fmt;

use crate::perception::types::UIElement;

/// Stable digest of an element list, used by callers to tell whether the
/// screen changed between two steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ScreenFingerprint(String);

impl ScreenFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `id|label|x,y|enabled|checked` per element in extraction order, joined by `;`.
pub fn screen_fingerprint(elements: &[UIElement]) -> ScreenFingerprint {
    let digest = elements
        .iter()
        .map(|e| {
            format!(
                "{}|{}|{},{}|{}|{}",
                e.id, e.text, e.center.0, e.center.1, e.enabled, e.checked
            )
        })
        .collect::<Vec<_>>()
        .join(";");
    ScreenFingerprint(digest)
}
