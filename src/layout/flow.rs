//! Text flow: positioned fragments of a laid-out text element.
//!
//! Painter, link-zone aggregation and the coordinate mapper all need the
//! same answer to "where exactly does this run of characters land". This
//! module computes it once, from the element's formatted content, its
//! resolved style and the rectangle layout assigned to it.

use std::ops::Range;

use crate::render::{FormattedText, ResolvedStyle};
use crate::types::{Rect, StyleFlags, TextAlign};

use super::text_measure::{FontMetrics, wrap_ranges};

/// One styled, positioned piece of a single wrapped line.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// Char range into the element's visible text.
    pub chars: Range<usize>,
    /// Absolute (root-local) rectangle of this piece.
    pub rect: Rect,
    pub flags: StyleFlags,
    /// Link table index when the fragment is interactive.
    pub link: Option<u16>,
    /// Zero-based wrapped-line index.
    pub line: usize,
}

/// Flow a text element's content into positioned fragments.
///
/// Wrapping uses the same column math as the layout measure, so fragments
/// tile the element rect. Alignment shifts each line as a whole; under
/// RTL the `Right` alignment produced by auto-resolution anchors lines to
/// the element's right edge.
pub fn flow_text(content: &FormattedText, style: &ResolvedStyle, rect: Rect) -> Vec<TextFragment> {
    if content.text.is_empty() {
        return Vec::new();
    }

    let metrics = FontMetrics::new(style.font_size, style.line_height);
    let columns = metrics.columns(rect.width);
    let lines = wrap_ranges(&content.text, columns);

    let mut fragments = Vec::new();
    for (line_index, line) in lines.iter().enumerate() {
        let line_len = line.end - line.start;
        let line_width = line_len as f32 * metrics.advance;
        let x0 = match style.align {
            TextAlign::Left => rect.x,
            TextAlign::Center => rect.x + (rect.width - line_width) / 2.0,
            TextAlign::Right => rect.right() - line_width,
        };
        let y = rect.y + line_index as f32 * metrics.line_height;

        // Intersect the line with every style run crossing it.
        for run in &content.runs {
            let start = run.range.start.max(line.start);
            let end = run.range.end.min(line.end);
            if start >= end {
                continue;
            }
            let x = x0 + (start - line.start) as f32 * metrics.advance;
            fragments.push(TextFragment {
                chars: start..end,
                rect: Rect::new(
                    x,
                    y,
                    (end - start) as f32 * metrics.advance,
                    metrics.line_height,
                ),
                flags: run.flags,
                link: run.link,
                line: line_index,
            });
        }
    }
    fragments
}

/// Slice of the visible text a fragment covers.
pub fn fragment_text(content: &FormattedText, fragment: &TextFragment) -> String {
    content
        .text
        .chars()
        .skip(fragment.chars.start)
        .take(fragment.chars.end - fragment.chars.start)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
