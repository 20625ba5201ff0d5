//! Underline renderer: project the filtered issue list onto screen geometry.
//!
//! Markers are transient, purely derived overlay data. Every repaint cycle
//! destroys the whole batch and rebuilds it from the current issues and
//! layout — no incremental diffing — which keeps the renderer stateless with
//! respect to history and immune to drift between paint cycles. A scroll or
//! resize re-projection is the same full rebuild.
//!
//! Markers never participate in hit-testing; pointer events belong to the
//! text beneath, and click resolution goes through the offset model instead.

pub mod wavy;

use core_classify::{Issue, IssueCategory};
use core_config::UnderlineStyle;
use core_offsets::NodeTree;
use core_offsets::layout::{LayoutMetrics, Rect, line_rects};
use tracing::warn;

pub use wavy::{CubicSegment, Point, WavyPath, wavy_path};

/// Marker paint color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub const SPELLING_RED: Color = Color { r: 237, g: 66, b: 69 };
pub const GRAMMAR_INDIGO: Color = Color { r: 88, g: 101, b: 242 };
pub const STYLE_AMBER: Color = Color { r: 245, g: 158, b: 11 };
/// Fallback for hosts painting a span with no resolved category.
pub const FALLBACK_GREY: Color = Color { r: 128, g: 128, b: 128 };

pub fn category_color(category: IssueCategory) -> Color {
    match category {
        IssueCategory::Spelling => SPELLING_RED,
        IssueCategory::Grammar => GRAMMAR_INDIGO,
        IssueCategory::Style => STYLE_AMBER,
    }
}

/// Gap between the glyph rect's bottom edge and the marker strip.
pub const UNDERLINE_PAD: f32 = 2.0;
/// Height of the marker strip itself.
pub const MARKER_HEIGHT: f32 = 3.0;

/// One rendered line-fragment of one issue. A multi-line span yields one
/// marker per visual line rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Strip rectangle in fixed viewport coordinates.
    pub rect: Rect,
    pub color: Color,
    pub style: UnderlineStyle,
    /// Curve geometry, present only for the wavy style.
    pub wave: Option<WavyPath>,
    /// Index into the issue list this marker was built from.
    pub issue: usize,
}

#[derive(Debug, Default)]
pub struct UnderlineRenderer {
    markers: Vec<Marker>,
}

impl UnderlineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroy all mounted markers and rebuild from scratch. An issue whose
    /// span no longer resolves against the live tree is skipped with a
    /// warning; the rest of the batch still renders.
    pub fn render(
        &mut self,
        issues: &[Issue],
        text: &str,
        tree: &NodeTree,
        metrics: &LayoutMetrics,
        style: UnderlineStyle,
    ) {
        self.markers.clear();
        for (index, issue) in issues.iter().enumerate() {
            if tree.resolve_range(issue.start, issue.end).is_none() {
                warn!(
                    target: "underline",
                    start = issue.start,
                    end = issue.end,
                    "range_resolution_failed_skipping_issue"
                );
                continue;
            }
            let color = category_color(issue.category);
            for line in line_rects(text, issue.start, issue.end, metrics) {
                if line.is_degenerate() {
                    continue;
                }
                let rect = Rect {
                    x: line.x,
                    y: line.y + line.h + UNDERLINE_PAD,
                    w: line.w,
                    h: MARKER_HEIGHT,
                };
                let wave = match style {
                    UnderlineStyle::Wavy => {
                        Some(wavy_path(rect.w, wavy::WAVE_PERIOD, wavy::WAVE_AMPLITUDE))
                    }
                    _ => None,
                };
                self.markers.push(Marker {
                    rect,
                    color,
                    style,
                    wave,
                    issue: index,
                });
            }
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Tear down every marker without rebuilding (empty text, teardown).
    pub fn clear(&mut self) {
        self.markers.clear();
    }
}
