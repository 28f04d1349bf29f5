use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::perception::types::{CompactElement, UIElement};

/// Relevance weights and dedup grid used to pick which elements reach the
/// prompt. Defaults are the tuned constants; overrides come from
/// `[ranking]` in config.toml.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub enabled: i32,
    pub editable: i32,
    pub focused: i32,
    /// Clickable or long-clickable.
    pub actionable: i32,
    pub has_text: i32,
    /// Grid size in px used to snap element centers before deduplication.
    pub tolerance_px: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            enabled: 10,
            editable: 8,
            focused: 6,
            actionable: 5,
            has_text: 3,
            tolerance_px: 5,
        }
    }
}

pub fn relevance_score(el: &UIElement, cfg: &RankingConfig) -> i32 {
    let mut score = 0;
    if el.enabled {
        score += cfg.enabled;
    }
    if el.editable {
        score += cfg.editable;
    }
    if el.focused {
        score += cfg.focused;
    }
    if el.clickable || el.long_clickable {
        score += cfg.actionable;
    }
    if !el.text.is_empty() {
        score += cfg.has_text;
    }
    score
}

/// Snaps a center to the dedup grid, rounding half up on each axis.
fn grid_cell(center: (i64, i64), tolerance: i64) -> (i64, i64) {
    let tol = tolerance.max(1);
    let snap = |c: i64| ((c as f64 / tol as f64) + 0.5).floor() as i64 * tol;
    (snap(center.0), snap(center.1))
}

/// Deduplicates elements sharing a grid cell, ranks survivors by relevance
/// and returns at most `limit` compact elements, best first.
///
/// Within a cell the higher score wins; on a tie the first element seen is
/// kept. Equal scores keep first-seen cell order after sorting.
pub fn filter_elements(
    elements: &[UIElement],
    limit: usize,
    cfg: &RankingConfig,
) -> Vec<CompactElement> {
    // cell -> index into `kept`
    let mut by_cell: HashMap<(i64, i64), usize> = HashMap::new();
    let mut kept: Vec<(&UIElement, i32)> = Vec::new();

    for el in elements {
        let score = relevance_score(el, cfg);
        let cell = grid_cell(el.center, cfg.tolerance_px);
        match by_cell.get(&cell) {
            Some(&idx) => {
                if score > kept[idx].1 {
                    kept[idx] = (el, score);
                }
            }
            None => {
                by_cell.insert(cell, kept.len());
                kept.push((el, score));
            }
        }
    }

    let deduped = kept.len();
    // sort_by is stable
    kept.sort_by(|a, b| b.1.cmp(&a.1));
    kept.truncate(limit);

    tracing::debug!(
        input = elements.len(),
        deduped,
        output = kept.len(),
        limit,
        "elements ranked"
    );

    kept.into_iter().map(|(el, _)| compact_element(el)).collect()
}

/// Drops every field that still holds its default value.
pub fn compact_element(el: &UIElement) -> CompactElement {
    CompactElement::from(el)
}
