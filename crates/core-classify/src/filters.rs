//! Exclusion filters: matches that fall on non-natural-language content.
//!
//! The checker sees the raw composer text, markup and all, so it routinely
//! flags mention tokens, URLs, emoji shortcodes, and code. None of those are
//! prose; annotating them is noise. Each predicate here inspects either the
//! flagged substring itself or the surrounding text.

use core_offsets::slice_chars;

/// Chat markup characters; a span made purely of these is formatting.
fn is_markup_run(span: &str) -> bool {
    !span.is_empty() && span.chars().all(|c| matches!(c, '*' | '_' | '~' | '`' | '>'))
}

/// `<@id>`, `<@&id>`, `<#id>` — user, role, and channel mention tokens.
fn is_mention(span: &str) -> bool {
    let Some(inner) = span.strip_prefix('<').and_then(|s| s.strip_suffix('>')) else {
        return false;
    };
    let id = inner
        .strip_prefix("@&")
        .or_else(|| inner.strip_prefix('@'))
        .or_else(|| inner.strip_prefix('#'));
    match id {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// `<:name:id>` or `<a:name:id>` — custom emoji tokens.
fn is_custom_emoji(span: &str) -> bool {
    let Some(inner) = span.strip_prefix('<').and_then(|s| s.strip_suffix('>')) else {
        return false;
    };
    let inner = inner.strip_prefix('a').unwrap_or(inner);
    let Some(rest) = inner.strip_prefix(':') else {
        return false;
    };
    let mut parts = rest.splitn(2, ':');
    let (Some(name), Some(id)) = (parts.next(), parts.next()) else {
        return false;
    };
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !id.is_empty()
        && id.chars().all(|c| c.is_ascii_digit())
}

/// Syntactically valid absolute URL with a host.
fn is_url(span: &str) -> bool {
    url::Url::parse(span).map(|u| u.has_host()).unwrap_or(false)
}

/// Inside a fenced (triple-backtick) or inline (single-backtick) code span,
/// determined by delimiter parity in the text before the span. A span that
/// is itself a balanced backtick-delimited token also counts: its delimiters
/// are part of the flagged substring, so no backtick precedes it.
fn in_code_span(text: &str, start: usize, span: &str) -> bool {
    if span.chars().count() >= 2 && span.starts_with('`') && span.ends_with('`') {
        return true;
    }
    let Some(before) = slice_chars(text, 0, start) else {
        return false;
    };
    if before.matches("```").count() % 2 == 1 {
        return true;
    }
    before.chars().filter(|&c| c == '`').count() % 2 == 1
}

/// Reason a flagged span is excluded from annotation, or `None` to keep it.
/// Order matters only for the reported reason; the predicates are disjoint
/// in practice.
pub fn exclusion_reason(text: &str, start: usize, span: &str) -> Option<&'static str> {
    if is_markup_run(span) {
        Some("markup")
    } else if is_mention(span) {
        Some("mention")
    } else if is_custom_emoji(span) {
        Some("custom_emoji")
    } else if is_url(span) {
        Some("url")
    } else if in_code_span(text, start, span) {
        Some("code")
    } else {
        None
    }
}
