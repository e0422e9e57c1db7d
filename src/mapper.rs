//! Coordinate and reference mapping.
//!
//! Bidirectional translation between document positions and render space:
//!
//! - source byte offset -> containing element / on-screen bounds
//! - heading anchor -> element / bounds (for `#fragment` navigation)
//! - render-space point -> source byte offset
//!
//! The same answers hold in both render modes: a raster is produced from
//! the laid-out element tree, so lookups always run against that tree and
//! its [`ComputedLayout`]. Horizontal math works on the positioned text
//! fragments, which already encode the resolved alignment of each line -
//! an auto-aligned element in an RTL document anchors its lines to the
//! right edge, and offsets measure from that anchor, not from raw visual
//! left.

use rustc_hash::FxHashMap;

use crate::document::{Document, DocumentNode, NodeKind};
use crate::layout::{ComputedLayout, FontMetrics, flow_text};
use crate::render::{ElementArena, ElementId, ElementKind};
use crate::types::{Point, Rect};

// =============================================================================
// Anchors
// =============================================================================

/// Slug for a heading, GitHub style: lowercase, alphanumerics kept,
/// spaces to dashes, the rest dropped.
pub fn heading_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase() {
                slug.push(lower);
            }
        } else if c.is_whitespace() || c == '-' {
            slug.push('-');
        }
    }
    slug
}

/// Anchor name -> parse-order index of the heading node.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    anchors: FxHashMap<String, u32>,
}

impl AnchorIndex {
    /// Build the index from a parsed document. Duplicate slugs get `-1`,
    /// `-2`, ... suffixes in document order.
    pub fn build(doc: &Document) -> Self {
        let mut anchors = FxHashMap::default();
        let mut seen: FxHashMap<String, u32> = FxHashMap::default();

        // Iterative walk: anchors are built before any depth bound has
        // been applied to the document.
        let mut stack: Vec<&DocumentNode> = doc.blocks.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if let NodeKind::Heading { .. } = node.kind {
                let base = heading_slug(&node.plain_text());
                let n = seen.entry(base.clone()).or_insert(0);
                let slug = if *n == 0 { base } else { format!("{base}-{n}") };
                *n += 1;
                anchors.entry(slug).or_insert(node.span.start);
            }
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        Self { anchors }
    }

    /// Parse-order index of an anchor, accepting a leading `#`.
    pub fn resolve(&self, anchor: &str) -> Option<u32> {
        self.anchors.get(anchor.trim_start_matches('#')).copied()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

// =============================================================================
// Offset -> element / bounds
// =============================================================================

/// Deepest element whose source range contains the byte offset.
pub fn element_at_offset(
    arena: &ElementArena,
    root: ElementId,
    offset: usize,
) -> Option<ElementId> {
    let mut best: Option<(ElementId, usize)> = None;
    arena.walk(root, &mut |id, element| {
        if element.source.contains(&offset) {
            let width = element.source.len();
            if best.is_none_or(|(_, best_width)| width <= best_width) {
                best = Some((id, width));
            }
        }
    });
    best.map(|(id, _)| id)
}

/// Deepest element whose parse-order span contains the index.
pub fn element_at_parse_index(
    arena: &ElementArena,
    root: ElementId,
    index: u32,
) -> Option<ElementId> {
    let mut best: Option<(ElementId, u32)> = None;
    arena.walk(root, &mut |id, element| {
        if element.span.contains(index) {
            let width = element.span.len();
            if best.is_none_or(|(_, best_width)| width <= best_width) {
                best = Some((id, width));
            }
        }
    });
    best.map(|(id, _)| id)
}

/// On-screen bounds for a source byte offset.
pub fn region_for_offset(
    arena: &ElementArena,
    root: ElementId,
    layout: &ComputedLayout,
    offset: usize,
) -> Option<Rect> {
    let id = element_at_offset(arena, root, offset)?;
    layout.rect(id)
}

/// On-screen bounds for a heading anchor.
pub fn region_for_anchor(
    arena: &ElementArena,
    root: ElementId,
    layout: &ComputedLayout,
    anchors: &AnchorIndex,
    anchor: &str,
) -> Option<Rect> {
    let index = anchors.resolve(anchor)?;
    let id = element_at_parse_index(arena, root, index)?;
    layout.rect(id)
}

// =============================================================================
// Point -> source offset
// =============================================================================

/// Source byte offset behind a render-space point.
///
/// Finds the text fragment under the point, converts the horizontal
/// distance from the fragment's origin into characters, and maps that
/// through the fragment's style run back to document bytes. Points over
/// non-text elements resolve to the element's source start.
pub fn source_offset_at(
    arena: &ElementArena,
    root: ElementId,
    layout: &ComputedLayout,
    source: &str,
    point: Point,
) -> Option<usize> {
    // Deepest element under the point.
    let mut best: Option<(ElementId, f32)> = None;
    arena.walk(root, &mut |id, _| {
        if let Some(rect) = layout.rect(id) {
            if rect.contains(point) {
                let area = rect.width * rect.height;
                if best.is_none_or(|(_, best_area)| area <= best_area) {
                    best = Some((id, area));
                }
            }
        }
    });
    let (id, _) = best?;
    let element = arena.get(id)?;
    let rect = layout.rect(id)?;

    let ElementKind::Text(content) = &element.kind else {
        return Some(element.source.start);
    };

    let metrics = FontMetrics::new(element.style.font_size, element.style.line_height);
    for fragment in flow_text(content, &element.style, rect) {
        if !fragment.rect.contains(point) {
            continue;
        }
        let cols = ((point.x - fragment.rect.x) / metrics.advance).floor() as usize;
        let char_index = (fragment.chars.start + cols).min(fragment.chars.end.saturating_sub(1));

        let run = content.run_at(char_index)?;
        let chars_into_run = char_index - run.range.start;
        let run_text = source.get(run.source.clone())?;
        let byte = run_text
            .char_indices()
            .nth(chars_into_run)
            .map(|(b, _)| b)
            .unwrap_or(run_text.len());
        return Some(run.source.start + byte);
    }

    // Inside the element but between lines: report the element start.
    Some(element.source.start)
}

// =============================================================================
// Tests
// =============================================================================
