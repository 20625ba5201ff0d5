//! Match classification: raw oracle matches → typed, positioned issues.
//!
//! Pure over its inputs: the same response, text, toggles, and suppression
//! state always yield the same issue list, in the oracle's original match
//! order. Everything stateful (what was checked, what is suppressed) lives
//! with the callers.

pub mod filters;

use core_check::{CheckResponse, RawMatch};
use core_offsets::slice_chars;
use core_suppress::SuppressionStore;
use tracing::trace;

/// User-facing category of an issue, in decreasing specificity of the
/// signals that select it: misspelling/typo beats style/redundancy beats the
/// grammar default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueCategory {
    Spelling,
    Grammar,
    Style,
}

impl IssueCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::Spelling => "Spelling",
            IssueCategory::Grammar => "Grammar",
            IssueCategory::Style => "Style",
        }
    }
}

/// A flagged span over the current flattened text. Derived, never persisted;
/// the whole list is invalidated whenever the text changes.
///
/// Invariant: `0 ≤ start < end ≤ char_len(text)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub start: usize,
    pub end: usize,
    pub category: IssueCategory,
    /// The originating raw match, kept verbatim for the correction popup.
    pub source: RawMatch,
}

impl Issue {
    /// The flagged substring within `text`, if the span still resolves.
    pub fn word<'t>(&self, text: &'t str) -> Option<&'t str> {
        slice_chars(text, self.start, self.end)
    }
}

/// Independent per-category enablement, lifted from the config.
#[derive(Debug, Clone, Copy)]
pub struct CategoryToggles {
    pub spelling: bool,
    pub grammar: bool,
    pub style: bool,
}

impl CategoryToggles {
    pub fn all() -> Self {
        Self {
            spelling: true,
            grammar: true,
            style: true,
        }
    }

    fn enabled(&self, category: IssueCategory) -> bool {
        match category {
            IssueCategory::Spelling => self.spelling,
            IssueCategory::Grammar => self.grammar,
            IssueCategory::Style => self.style,
        }
    }
}

impl From<&core_config::Config> for CategoryToggles {
    fn from(cfg: &core_config::Config) -> Self {
        Self {
            spelling: cfg.check_spelling,
            grammar: cfg.check_grammar,
            style: cfg.show_style_suggestions,
        }
    }
}

fn classify(m: &RawMatch) -> IssueCategory {
    let issue_type = m
        .rule
        .as_ref()
        .and_then(|r| r.issue_type.as_deref())
        .unwrap_or("")
        .to_ascii_lowercase();
    let category_id = m
        .rule
        .as_ref()
        .and_then(|r| r.category.as_ref())
        .map(|c| c.id.to_ascii_uppercase())
        .unwrap_or_default();

    if issue_type.contains("misspelling")
        || issue_type.contains("typo")
        || category_id.contains("TYPO")
    {
        IssueCategory::Spelling
    } else if issue_type.contains("style")
        || issue_type.contains("redundancy")
        || category_id.contains("STYLE")
        || category_id.contains("REDUNDANCY")
    {
        IssueCategory::Style
    } else {
        IssueCategory::Grammar
    }
}

/// Convert a raw response into the ordered issue list for `text` — the exact
/// string that was submitted to the checker. Matches are dropped when they
/// fall on non-prose content, when their category is toggled off, or when
/// the flagged word is suppressed in either tier.
pub fn parse_matches(
    response: &CheckResponse,
    text: &str,
    toggles: &CategoryToggles,
    suppression: &SuppressionStore,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for m in &response.matches {
        if m.length == 0 {
            continue;
        }
        let start = m.offset;
        let end = m.offset + m.length;
        // A span that no longer fits the text is drift, not an error.
        let Some(word) = slice_chars(text, start, end) else {
            trace!(target: "classify", start, end, "span_out_of_range_skipped");
            continue;
        };
        if let Some(reason) = filters::exclusion_reason(text, start, word) {
            trace!(target: "classify", reason, "match_excluded");
            continue;
        }
        let category = classify(m);
        if !toggles.enabled(category) {
            continue;
        }
        if suppression.is_suppressed(word) {
            continue;
        }
        issues.push(Issue {
            start,
            end,
            category,
            source: m.clone(),
        });
    }
    issues
}
