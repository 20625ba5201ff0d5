//! Correction popup contents: the oracle's message, the category label, and
//! up to five ranked replacement candidates, each carrying a minimal-diff
//! split against the flagged word so the UI can emphasize only the changed
//! middle segment.

use core_classify::Issue;
use unicode_segmentation::UnicodeSegmentation;

/// Ranked candidates shown per issue; the oracle may send far more.
pub const MAX_CANDIDATES: usize = 5;

/// Minimal-diff split of original vs replacement: the grapheme-common
/// prefix and suffix render unstyled, the differing middles emphasized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegments {
    pub prefix: String,
    pub original_mid: String,
    pub replacement_mid: String,
    pub suffix: String,
}

/// Grapheme-aware common prefix/suffix factoring. The suffix never overlaps
/// the prefix, so `minimal_diff("aa", "aaa")` keeps the extra cluster in the
/// middle rather than double-counting.
pub fn minimal_diff(original: &str, replacement: &str) -> DiffSegments {
    let orig: Vec<&str> = original.graphemes(true).collect();
    let repl: Vec<&str> = replacement.graphemes(true).collect();

    let mut prefix = 0;
    while prefix < orig.len() && prefix < repl.len() && orig[prefix] == repl[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < orig.len() - prefix
        && suffix < repl.len() - prefix
        && orig[orig.len() - 1 - suffix] == repl[repl.len() - 1 - suffix]
    {
        suffix += 1;
    }

    DiffSegments {
        prefix: orig[..prefix].concat(),
        original_mid: orig[prefix..orig.len() - suffix].concat(),
        replacement_mid: repl[prefix..repl.len() - suffix].concat(),
        suffix: orig[orig.len() - suffix..].concat(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub diff: DiffSegments,
}

/// Everything the host needs to present the correction surface for one
/// issue. Pure data; presentation chrome is the host's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionPopup {
    /// Index into the session's current issue list.
    pub issue: usize,
    /// Viewport point the popup anchors near (the click position).
    pub anchor: (f32, f32),
    pub message: String,
    pub category_label: &'static str,
    pub candidates: Vec<Candidate>,
}

impl CorrectionPopup {
    pub fn build(index: usize, issue: &Issue, text: &str, anchor: (f32, f32)) -> Self {
        let word = issue.word(text).unwrap_or_default();
        let candidates = issue
            .source
            .replacements
            .iter()
            .take(MAX_CANDIDATES)
            .map(|r| Candidate {
                diff: minimal_diff(word, &r.value),
                value: r.value.clone(),
            })
            .collect();
        Self {
            issue: index,
            anchor,
            message: issue.source.message.clone(),
            category_label: issue.category.label(),
            candidates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_emphasizes_only_the_changed_middle() {
        let d = minimal_diff("Teh", "The");
        assert_eq!(d.prefix, "T");
        assert_eq!(d.original_mid, "eh");
        assert_eq!(d.replacement_mid, "he");
        assert_eq!(d.suffix, "");
    }

    #[test]
    fn diff_with_shared_prefix_and_suffix() {
        let d = minimal_diff("recieve", "receive");
        assert_eq!(d.prefix, "rec");
        assert_eq!(d.original_mid, "ie");
        assert_eq!(d.replacement_mid, "ei");
        assert_eq!(d.suffix, "ve");
    }

    #[test]
    fn diff_insertion_keeps_suffix_disjoint_from_prefix() {
        let d = minimal_diff("aa", "aaa");
        assert_eq!(d.prefix, "aa");
        assert_eq!(d.original_mid, "");
        assert_eq!(d.replacement_mid, "a");
        assert_eq!(d.suffix, "");
    }

    #[test]
    fn diff_is_grapheme_aware() {
        let d = minimal_diff("cafe\u{301}s", "cafes");
        assert_eq!(d.prefix, "caf");
        assert_eq!(d.original_mid, "e\u{301}");
        assert_eq!(d.replacement_mid, "e");
        assert_eq!(d.suffix, "s");
    }

    #[test]
    fn identical_strings_have_empty_middles() {
        let d = minimal_diff("same", "same");
        assert_eq!(d.prefix, "same");
        assert!(d.original_mid.is_empty() && d.replacement_mid.is_empty());
    }
}
