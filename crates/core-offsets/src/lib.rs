//! Offset model: absolute character offsets ↔ positions in an inline node tree.
//!
//! The composer surface hands us a tree of inline text-bearing nodes. The
//! checker, the classifier, and the renderer all speak in absolute character
//! offsets into the *flattened* text — the depth-first, document-order
//! concatenation of every text leaf. This crate is the single authority for
//! that correspondence. Any disagreement between the flattened snapshot and
//! the live tree (the surface mutated under us) must surface as a lookup
//! miss (`None`), never a panic: a skipped underline is recoverable, a crash
//! in the host is not.
//!
//! Offsets throughout are Unicode scalar value (char) offsets, matching the
//! unit the remote checker reports spans in. Byte conversions happen only at
//! the string-slicing helpers below.

pub mod layout;

/// One inline node of the composer's content tree. Only `Text` leaves carry
/// characters; `Span` exists because hosts wrap styled runs (bold, mention
/// chips, emoji shells) in nested containers that contribute no text of
/// their own beyond their children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineNode {
    Text(String),
    Span(Vec<InlineNode>),
}

/// Position of an absolute offset inside the tree: which text leaf (in
/// depth-first leaf order) and the char offset within that leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafPosition {
    pub leaf: usize,
    pub offset: usize,
}

/// A resolved half-open span `[start, end)` over the tree's flattened text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: LeafPosition,
    pub end: LeafPosition,
    pub char_start: usize,
    pub char_end: usize,
}

/// Snapshot of the composer's inline content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTree {
    roots: Vec<InlineNode>,
}

impl NodeTree {
    pub fn new(roots: Vec<InlineNode>) -> Self {
        Self { roots }
    }

    /// Single-leaf tree; the common case for plain-text composers and tests.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            roots: vec![InlineNode::Text(text.into())],
        }
    }

    /// Depth-first document-order text leaves. This order *defines* the
    /// flattened text; every other component inherits it from here.
    pub fn leaves(&self) -> Vec<&str> {
        fn walk<'a>(node: &'a InlineNode, out: &mut Vec<&'a str>) {
            match node {
                InlineNode::Text(t) => out.push(t.as_str()),
                InlineNode::Span(children) => {
                    for child in children {
                        walk(child, out);
                    }
                }
            }
        }
        let mut out = Vec::new();
        for root in &self.roots {
            walk(root, &mut out);
        }
        out
    }

    /// Concatenated text of all leaves.
    pub fn flatten(&self) -> String {
        self.leaves().concat()
    }

    /// Total char length of the flattened text.
    pub fn char_len(&self) -> usize {
        self.leaves().iter().map(|l| l.chars().count()).sum()
    }

    /// Map an absolute char offset to its leaf + intra-leaf offset.
    ///
    /// `offset == char_len()` resolves to the end of the final leaf so that
    /// half-open ranges ending at the text end stay resolvable. Anything
    /// beyond that, or an empty tree, is a miss.
    pub fn locate(&self, offset: usize) -> Option<LeafPosition> {
        let leaves = self.leaves();
        let mut consumed = 0usize;
        for (idx, leaf) in leaves.iter().enumerate() {
            let len = leaf.chars().count();
            if offset < consumed + len {
                return Some(LeafPosition {
                    leaf: idx,
                    offset: offset - consumed,
                });
            }
            consumed += len;
        }
        if offset == consumed && !leaves.is_empty() {
            let last = leaves.len() - 1;
            return Some(LeafPosition {
                leaf: last,
                offset: leaves[last].chars().count(),
            });
        }
        None
    }

    /// Resolve `[start, end)` to leaf positions. Degenerate or out-of-range
    /// spans are misses; callers treat a miss as "skip this annotation".
    pub fn resolve_range(&self, start: usize, end: usize) -> Option<TextRange> {
        if start >= end || end > self.char_len() {
            return None;
        }
        let start_pos = self.locate(start)?;
        let end_pos = self.locate(end)?;
        Some(TextRange {
            start: start_pos,
            end: end_pos,
            char_start: start,
            char_end: end,
        })
    }
}

/// Char length of a string (the unit all public offsets use).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte index of a char offset; `offset == char_len` maps to `s.len()`.
pub fn char_to_byte(s: &str, offset: usize) -> Option<usize> {
    if offset == 0 {
        return Some(0);
    }
    let mut seen = 0usize;
    for (byte, _) in s.char_indices() {
        if seen == offset {
            return Some(byte);
        }
        seen += 1;
    }
    // One past the final char is the end of the string.
    if offset == seen {
        return Some(s.len());
    }
    None
}

/// Slice by char offsets, `None` when out of range or inverted.
pub fn slice_chars(s: &str, start: usize, end: usize) -> Option<&str> {
    if start > end {
        return None;
    }
    let b_start = char_to_byte(s, start)?;
    let b_end = char_to_byte(s, end)?;
    Some(&s[b_start..b_end])
}

/// `text[..start] + replacement + text[end..]` in char offsets. Returns
/// `None` rather than clamping when the span does not lie inside `text`.
pub fn replace_span(text: &str, start: usize, end: usize, replacement: &str) -> Option<String> {
    let b_start = char_to_byte(text, start)?;
    let b_end = char_to_byte(text, end)?;
    if b_start > b_end {
        return None;
    }
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..b_start]);
    out.push_str(replacement);
    out.push_str(&text[b_end..]);
    Some(out)
}
