//! Monospace glyph layout: project char spans onto screen rectangles and
//! screen points back onto caret offsets.
//!
//! The host paints the composer with a fixed cell grid (cell width × line
//! height), wrapping at a column budget. We reproduce that wrap here so a
//! flagged span can be turned into one rectangle per visual line it crosses,
//! and a pointer position can be turned back into the char offset under it.
//! Widths are terminal-cell widths of grapheme clusters; a cluster never
//! splits across a wrap.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0.0 || self.h <= 0.0
    }
}

/// Geometry of the composer surface as the host lays it out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutMetrics {
    /// Top-left corner of the first line, viewport coordinates.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Width of one terminal cell and height of one visual line.
    pub cell_width: f32,
    pub line_height: f32,
    /// Wrap budget in cells. Zero disables wrapping.
    pub wrap_cols: usize,
    /// Vertical scroll offset already applied by the host (subtracted from y).
    pub scroll_y: f32,
}

impl LayoutMetrics {
    pub fn unscrolled(cell_width: f32, line_height: f32, wrap_cols: usize) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            cell_width,
            line_height,
            wrap_cols,
            scroll_y: 0.0,
        }
    }
}

/// One laid-out grapheme cluster.
#[derive(Debug, Clone, Copy)]
struct Cell {
    char_start: usize,
    char_end: usize,
    line: usize,
    col: usize,
    width: usize,
}

/// Greedy wrap of the flattened text into cluster cells. Newlines advance the
/// line without occupying a cell.
fn layout_cells(text: &str, wrap_cols: usize) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut line = 0usize;
    let mut col = 0usize;
    let mut char_pos = 0usize;
    for cluster in text.graphemes(true) {
        let chars = cluster.chars().count();
        if cluster == "\n" || cluster == "\r\n" {
            line += 1;
            col = 0;
            char_pos += chars;
            continue;
        }
        let width = UnicodeWidthStr::width(cluster).max(1);
        if wrap_cols > 0 && col + width > wrap_cols && col > 0 {
            line += 1;
            col = 0;
        }
        cells.push(Cell {
            char_start: char_pos,
            char_end: char_pos + chars,
            line,
            col,
            width,
        });
        col += width;
        char_pos += chars;
    }
    cells
}

/// Rectangles covering the chars `[start, end)`, one per visual line the span
/// touches. Degenerate (zero-width) lines are omitted; an out-of-range span
/// simply yields whatever portion lies within the text.
pub fn line_rects(text: &str, start: usize, end: usize, m: &LayoutMetrics) -> Vec<Rect> {
    if start >= end {
        return Vec::new();
    }
    let cells = layout_cells(text, m.wrap_cols);
    // Per-line (first col, last col + width) over cells intersecting the span.
    let mut per_line: Vec<(usize, usize, usize)> = Vec::new(); // (line, min_col, max_col_end)
    for cell in &cells {
        if cell.char_end <= start || cell.char_start >= end {
            continue;
        }
        match per_line.iter_mut().find(|(l, _, _)| *l == cell.line) {
            Some((_, min_col, max_end)) => {
                *min_col = (*min_col).min(cell.col);
                *max_end = (*max_end).max(cell.col + cell.width);
            }
            None => per_line.push((cell.line, cell.col, cell.col + cell.width)),
        }
    }
    per_line
        .into_iter()
        .map(|(line, min_col, max_end)| Rect {
            x: m.origin_x + min_col as f32 * m.cell_width,
            y: m.origin_y + line as f32 * m.line_height - m.scroll_y,
            w: (max_end - min_col) as f32 * m.cell_width,
            h: m.line_height,
        })
        .filter(|r| !r.is_degenerate())
        .collect()
}

/// Char offset of the caret position nearest a viewport point, the
/// range-from-point equivalent. Points left of a line clamp to its first
/// cluster, points right of it to its end; a point outside every line is a
/// miss.
pub fn offset_at_point(text: &str, m: &LayoutMetrics, x: f32, y: f32) -> Option<usize> {
    if m.line_height <= 0.0 || m.cell_width <= 0.0 {
        return None;
    }
    let rel_y = y - m.origin_y + m.scroll_y;
    if rel_y < 0.0 {
        return None;
    }
    let target_line = (rel_y / m.line_height).floor() as usize;
    let cells = layout_cells(text, m.wrap_cols);
    let line_cells: Vec<&Cell> = cells.iter().filter(|c| c.line == target_line).collect();
    if line_cells.is_empty() {
        return None;
    }
    let col = ((x - m.origin_x) / m.cell_width).floor();
    if col < line_cells[0].col as f32 {
        return Some(line_cells[0].char_start);
    }
    let col = col as usize;
    for cell in &line_cells {
        if col >= cell.col && col < cell.col + cell.width {
            return Some(cell.char_start);
        }
    }
    // Past the last cluster on the line: caret at the line's end.
    line_cells.last().map(|c| c.char_end)
}
