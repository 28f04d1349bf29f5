//! Screen context pipeline: turns one accessibility dump into the ranked,
//! compact element list that goes into a prompt, plus the fingerprint used
//! for change detection.
use crate::errors::DroidClawResult;
use crate::perception::accessibility::extract_elements;
use crate::perception::fingerprint::{screen_fingerprint, ScreenFingerprint};
use crate::perception::ranking::{filter_elements, RankingConfig};
use crate::perception::types::{CompactElement, UIElement};

#[derive(Debug, Clone)]
pub struct ScreenContext {
    /// Every extracted element, in document order.
    pub elements: Vec<UIElement>,
    /// Ranked, deduplicated projection, at most `limit` long.
    pub compact: Vec<CompactElement>,
    pub fingerprint: ScreenFingerprint,
    /// Set when the dump could not be parsed.
    pub warning: Option<String>,
}

impl ScreenContext {
    /// No usable elements; callers typically fall back to a screenshot.
    pub fn is_empty(&self) -> bool {
        self.compact.is_empty()
    }

    /// JSON array placed into the prompt.
    pub fn to_prompt_json(&self) -> DroidClawResult<String> {
        Ok(serde_json::to_string(&self.compact)?)
    }
}

/// Runs the full extraction flow:
///
/// 1. Parse the dump and extract elements.
/// 2. Fingerprint the raw element list.
/// 3. Deduplicate, rank and compact up to `limit` elements.
pub fn build_screen_context(xml: &str, ranking: &RankingConfig, limit: usize) -> ScreenContext {
    let extraction = extract_elements(xml);
    let fingerprint = screen_fingerprint(&extraction.elements);
    let compact = filter_elements(&extraction.elements, limit, ranking);

    tracing::debug!(
        extracted = extraction.elements.len(),
        compact = compact.len(),
        "screen context built"
    );

    ScreenContext {
        elements: extraction.elements,
        compact,
        fingerprint,
        warning: extraction.warning,
    }
}
