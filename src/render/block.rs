//! Block renderer.
//!
//! Walks the block-level document tree and produces the rendered element
//! tree. Dispatch over node kinds is total: anything without a dedicated
//! rendering is represented by an empty placeholder element rather than an
//! error. One malformed node degrades locally and never aborts the build.
//!
//! Descent is depth-bounded. Past the configured limit a node and its
//! descendants collapse into a single placeholder element, so pathological
//! nesting cannot exhaust the stack.

use log::debug;

use crate::document::{ColumnAlign, Document, DocumentNode, NodeKind, NodeSpan};
use crate::style::StyleSheet;
use crate::types::{Alignment, Direction, Rgba, StyleFlags};

use super::element::{
    ElementArena, ElementId, ElementKind, ElementRole, RenderedElement, ResolvedStyle,
};
use super::inline::{FormattedText, TextRun, render_inlines};

// =============================================================================
// Renderer
// =============================================================================

/// Statistics of one build, fed to the render-mode heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub element_count: usize,
    pub max_depth: usize,
    /// True when the nesting limit cut at least one subtree.
    pub truncated: bool,
}

/// Result of rendering a document: the root element plus build stats.
#[derive(Debug, Clone, Copy)]
pub struct BuildResult {
    pub root: ElementId,
    pub stats: BuildStats,
}

/// Document tree -> element tree conversion.
pub struct BlockRenderer {
    /// Maximum element-tree depth before placeholder cutoff.
    pub nesting_limit: usize,
}

pub const DEFAULT_NESTING_LIMIT: usize = 64;

impl Default for BlockRenderer {
    fn default() -> Self {
        Self {
            nesting_limit: DEFAULT_NESTING_LIMIT,
        }
    }
}

struct Ctx<'a> {
    sheet: &'a StyleSheet,
    direction: Direction,
    arena: &'a mut ElementArena,
    limit: usize,
    max_depth: usize,
    truncated: bool,
}

impl BlockRenderer {
    pub fn new(nesting_limit: usize) -> Self {
        Self { nesting_limit }
    }

    /// Build a fresh element tree for the document.
    ///
    /// The caller owns arena lifecycle: rebuilds clear it first so stale
    /// handles die with the old tree.
    pub fn build(
        &self,
        doc: &Document,
        sheet: &StyleSheet,
        direction: Direction,
        arena: &mut ElementArena,
    ) -> BuildResult {
        let mut ctx = Ctx {
            sheet,
            direction,
            arena,
            limit: self.nesting_limit.max(1),
            max_depth: 0,
            truncated: false,
        };

        let mut children = Vec::with_capacity(doc.blocks.len());
        for block in &doc.blocks {
            children.push(build_block(&mut ctx, block, 1, 0));
        }

        let mut root = RenderedElement::new(ElementKind::Scroll, ElementRole::Root);
        root.children = children;
        root.span = NodeSpan {
            start: 0,
            end: doc.node_count,
        };
        root.source = 0..doc
            .blocks
            .last()
            .map(|b| b.source.end)
            .unwrap_or_default();
        root.style = resolve_style(sheet, ElementRole::Root, direction, 0.0);
        let root_id = ctx.arena.insert(root);

        if ctx.truncated {
            debug!(
                "element tree truncated at nesting limit {}",
                self.nesting_limit
            );
        }

        BuildResult {
            root: root_id,
            stats: BuildStats {
                element_count: ctx.arena.len(),
                max_depth: ctx.max_depth.max(1),
                truncated: ctx.truncated,
            },
        }
    }
}

// =============================================================================
// Style resolution
// =============================================================================

/// Resolve the visual attributes for an element role against the sheet.
pub fn resolve_style(
    sheet: &StyleSheet,
    role: ElementRole,
    direction: Direction,
    indent: f32,
) -> ResolvedStyle {
    let font_size = match role {
        ElementRole::Heading(level) => sheet.heading_font_size(level),
        ElementRole::CodeBlock => sheet.code_font_size(),
        _ => sheet.base_font_size,
    };

    // Code pins its palette and stays left-aligned regardless of the
    // sheet-wide alignment and direction.
    let (fg, bg, align_choice) = match role {
        ElementRole::CodeBlock => (
            sheet.code_text_color,
            sheet.code_background,
            Alignment::Left,
        ),
        ElementRole::Rule => (sheet.quote_bar_color, Rgba::TRANSPARENT, sheet.alignment),
        _ => (sheet.text_color, Rgba::TRANSPARENT, sheet.alignment),
    };

    ResolvedStyle {
        font_size,
        line_height: sheet.line_height(font_size),
        fg,
        bg,
        align: align_choice.resolve(direction),
        align_choice,
        direction,
        indent,
        spacing_after: sheet.block_spacing,
        style_version: sheet.version,
    }
}

// =============================================================================
// Block dispatch
// =============================================================================

fn build_block(ctx: &mut Ctx<'_>, node: &DocumentNode, depth: usize, list_level: usize) -> ElementId {
    ctx.max_depth = ctx.max_depth.max(depth);
    if depth >= ctx.limit {
        ctx.truncated = true;
        return placeholder(ctx, node);
    }

    match &node.kind {
        NodeKind::Heading { level } => {
            text_element(ctx, node, ElementRole::Heading(*level), render_inlines(&node.children))
        }
        NodeKind::Paragraph => build_paragraph(ctx, node),
        NodeKind::CodeBlock { code, .. } => {
            text_element(ctx, node, ElementRole::CodeBlock, code_text(code, node))
        }
        NodeKind::BlockQuote => {
            let children: Vec<ElementId> = node
                .children
                .iter()
                .map(|child| build_block(ctx, child, depth + 1, list_level))
                .collect();
            container(ctx, node, ElementRole::Quote, children, ctx.sheet.indent_unit)
        }
        NodeKind::List { ordered, start } => {
            build_list(ctx, node, *ordered, *start, depth, list_level)
        }
        NodeKind::ListItem { .. } => {
            // An item outside a list is malformed; render its content as a
            // plain one-item grouping.
            build_list_item(ctx, node, "- ", depth, list_level)
        }
        NodeKind::Table { alignments } => build_table(ctx, node, alignments, depth),
        NodeKind::TableRow { .. } | NodeKind::TableCell => {
            // Row or cell adrift outside a table: nothing to render.
            placeholder(ctx, node)
        }
        NodeKind::ThematicBreak => {
            container(ctx, node, ElementRole::Rule, Vec::new(), 0.0)
        }
        // Inline content at block position renders as an anonymous
        // paragraph so it stays visible.
        NodeKind::Bold
        | NodeKind::Italic
        | NodeKind::Strike
        | NodeKind::InlineCode { .. }
        | NodeKind::Link { .. }
        | NodeKind::Text { .. } => text_element(
            ctx,
            node,
            ElementRole::Paragraph,
            render_inlines(std::slice::from_ref(node)),
        ),
        NodeKind::Image { src, alt } => image_element(ctx, node, src, alt),
    }
}

/// A paragraph whose sole child is an image becomes an image element; any
/// other paragraph is a text element.
fn build_paragraph(ctx: &mut Ctx<'_>, node: &DocumentNode) -> ElementId {
    if node.children.len() == 1 {
        if let NodeKind::Image { src, alt } = &node.children[0].kind {
            return image_element(ctx, node, src, alt);
        }
    }
    text_element(ctx, node, ElementRole::Paragraph, render_inlines(&node.children))
}

// =============================================================================
// Lists
// =============================================================================

/// Unordered markers cycle with nesting depth; the ASCII set keeps the
/// raster backend's bitmap fonts sufficient.
const BULLETS: [&str; 3] = ["- ", "* ", "+ "];

fn build_list(
    ctx: &mut Ctx<'_>,
    node: &DocumentNode,
    ordered: bool,
    start: u64,
    depth: usize,
    list_level: usize,
) -> ElementId {
    // Marker state machine: one counter per list element. A nested list is
    // built inside an item, so the outer counter naturally resumes when
    // the inner list closes.
    let mut counter = start;
    let mut items = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let marker = if matches!(child.kind, NodeKind::ListItem { .. }) {
            if ordered {
                let m = format!("{counter}. ");
                counter += 1;
                m
            } else {
                BULLETS[list_level % BULLETS.len()].to_string()
            }
        } else {
            // A non-item child of a list is malformed; render it bare.
            items.push(build_block(ctx, child, depth + 1, list_level));
            continue;
        };
        items.push(build_list_item(ctx, child, &marker, depth, list_level));
    }

    container(ctx, node, ElementRole::List, items, ctx.sheet.indent_unit)
}

fn build_list_item(
    ctx: &mut Ctx<'_>,
    item: &DocumentNode,
    marker: &str,
    depth: usize,
    list_level: usize,
) -> ElementId {
    let mut marker_text = marker.to_string();
    if let NodeKind::ListItem { checked: Some(done) } = item.kind {
        marker_text.push_str(if done { "[x] " } else { "[ ] " });
    }

    // Marker element: its span is the item node itself, the content
    // elements own the children's slice of parse order.
    let mut marker_el = RenderedElement::new(
        ElementKind::Text(plain_text(&marker_text, item)),
        ElementRole::ListMarker,
    );
    marker_el.span = NodeSpan {
        start: item.span.start,
        end: item.span.start + 1,
    };
    marker_el.source = item.source.start..item.source.start;
    marker_el.style = resolve_style(ctx.sheet, ElementRole::ListMarker, ctx.direction, 0.0);
    marker_el.style.spacing_after = 0.0;
    let marker_id = ctx.arena.insert(marker_el);

    // Leading inline children fuse into one text element; block children
    // (paragraphs, nested lists) follow as siblings.
    let mut children = vec![marker_id];
    let mut inline_run: Vec<DocumentNode> = Vec::new();
    for child in &item.children {
        if child.kind.is_block() {
            if !inline_run.is_empty() {
                children.push(inline_chunk(ctx, &inline_run));
                inline_run.clear();
            }
            children.push(build_block(ctx, child, depth + 2, list_level + 1));
        } else {
            inline_run.push(child.clone());
        }
    }
    if !inline_run.is_empty() {
        children.push(inline_chunk(ctx, &inline_run));
    }

    let mut el = RenderedElement::new(ElementKind::Container, ElementRole::ListItem);
    el.children = children;
    el.span = item.span;
    el.source = item.source.clone();
    el.style = resolve_style(ctx.sheet, ElementRole::ListItem, ctx.direction, 0.0);
    el.style.spacing_after = ctx.sheet.block_spacing * 0.25;
    ctx.arena.insert(el)
}

fn inline_chunk(ctx: &mut Ctx<'_>, nodes: &[DocumentNode]) -> ElementId {
    let mut el = RenderedElement::new(
        ElementKind::Text(render_inlines(nodes)),
        ElementRole::Paragraph,
    );
    if let (Some(first), Some(last)) = (nodes.first(), nodes.last()) {
        el.span = NodeSpan {
            start: first.span.start,
            end: last.span.end,
        };
        el.source = first.source.start..last.source.end;
    }
    el.style = resolve_style(ctx.sheet, ElementRole::Paragraph, ctx.direction, 0.0);
    el.style.spacing_after = 0.0;
    ctx.arena.insert(el)
}

// =============================================================================
// Tables
// =============================================================================

fn build_table(
    ctx: &mut Ctx<'_>,
    node: &DocumentNode,
    alignments: &[ColumnAlign],
    depth: usize,
) -> ElementId {
    // The header row fixes the grid width; alignment metadata is the
    // fallback when the header is missing.
    let columns = node
        .children
        .iter()
        .find(|row| matches!(row.kind, NodeKind::TableRow { header: true }))
        .map(|row| row.children.len())
        .unwrap_or(alignments.len())
        .max(1);

    let mut rows = Vec::with_capacity(node.children.len());
    for row in &node.children {
        let NodeKind::TableRow { header } = row.kind else {
            rows.push(build_block(ctx, row, depth + 1, 0));
            continue;
        };

        let mut cells = Vec::with_capacity(columns);
        for col in 0..columns {
            let role = ElementRole::TableCell { header };
            let align = alignments.get(col).copied().unwrap_or_default();
            // Short rows pad with empty cells; long rows truncate at the
            // grid width.
            let cell_id = match row.children.get(col) {
                Some(cell) => {
                    let id = text_element(ctx, cell, role, render_inlines(&cell.children));
                    apply_column_align(ctx, id, align);
                    id
                }
                None => {
                    let mut el =
                        RenderedElement::new(ElementKind::Text(FormattedText::default()), role);
                    el.span = NodeSpan {
                        start: row.span.end,
                        end: row.span.end,
                    };
                    el.source = row.source.end..row.source.end;
                    el.style = resolve_style(ctx.sheet, role, ctx.direction, 0.0);
                    el.style.spacing_after = 0.0;
                    let id = ctx.arena.insert(el);
                    apply_column_align(ctx, id, align);
                    id
                }
            };
            cells.push(cell_id);
        }

        let mut row_el = RenderedElement::new(ElementKind::Container, ElementRole::TableRow);
        row_el.children = cells;
        row_el.span = row.span;
        row_el.source = row.source.clone();
        row_el.style = resolve_style(ctx.sheet, ElementRole::TableRow, ctx.direction, 0.0);
        row_el.style.spacing_after = 0.0;
        rows.push(ctx.arena.insert(row_el));
    }

    container(ctx, node, ElementRole::Table, rows, 0.0)
}

/// Header-row alignment propagates to every cell in the column; `Default`
/// keeps the sheet-wide choice (and so stays direction-sensitive).
fn apply_column_align(ctx: &mut Ctx<'_>, id: ElementId, align: ColumnAlign) {
    let choice = match align {
        ColumnAlign::Default => return,
        ColumnAlign::Left => Alignment::Left,
        ColumnAlign::Center => Alignment::Center,
        ColumnAlign::Right => Alignment::Right,
    };
    if let Some(el) = ctx.arena.get_mut(id) {
        el.style.align_choice = choice;
        el.style.align = choice.resolve(el.style.direction);
    }
}

// =============================================================================
// Element helpers
// =============================================================================

fn text_element(
    ctx: &mut Ctx<'_>,
    node: &DocumentNode,
    role: ElementRole,
    content: FormattedText,
) -> ElementId {
    let mut el = RenderedElement::new(ElementKind::Text(content), role);
    el.span = node.span;
    el.source = node.source.clone();
    el.style = resolve_style(ctx.sheet, role, ctx.direction, 0.0);
    if matches!(role, ElementRole::TableCell { .. }) {
        el.style.spacing_after = 0.0;
    }
    ctx.arena.insert(el)
}

fn image_element(ctx: &mut Ctx<'_>, node: &DocumentNode, src: &str, alt: &str) -> ElementId {
    let mut el = RenderedElement::new(
        ElementKind::Image {
            src: src.to_string(),
            alt: alt.to_string(),
        },
        ElementRole::Image,
    );
    el.span = node.span;
    el.source = node.source.clone();
    el.style = resolve_style(ctx.sheet, ElementRole::Image, ctx.direction, 0.0);
    ctx.arena.insert(el)
}

fn container(
    ctx: &mut Ctx<'_>,
    node: &DocumentNode,
    role: ElementRole,
    children: Vec<ElementId>,
    indent: f32,
) -> ElementId {
    let mut el = RenderedElement::new(ElementKind::Container, role);
    el.children = children;
    el.span = node.span;
    el.source = node.source.clone();
    el.style = resolve_style(ctx.sheet, role, ctx.direction, indent);
    ctx.arena.insert(el)
}

fn placeholder(ctx: &mut Ctx<'_>, node: &DocumentNode) -> ElementId {
    let mut el = RenderedElement::new(ElementKind::Container, ElementRole::Placeholder);
    el.span = node.span;
    el.source = node.source.clone();
    el.style = resolve_style(ctx.sheet, ElementRole::Placeholder, ctx.direction, 0.0);
    ctx.arena.insert(el)
}

/// Single-run formatted text for generated content (markers, padding).
fn plain_text(text: &str, node: &DocumentNode) -> FormattedText {
    FormattedText {
        markup: text.to_string(),
        text: text.to_string(),
        runs: vec![TextRun {
            range: 0..text.chars().count(),
            flags: StyleFlags::empty(),
            link: None,
            source: node.source.start..node.source.start,
        }],
        links: Vec::new(),
    }
}

/// Code block content: one CODE run, markup-escaped.
fn code_text(code: &str, node: &DocumentNode) -> FormattedText {
    let mut ft = render_inlines(&[DocumentNode::new(
        NodeKind::InlineCode {
            code: code.trim_end_matches('\n').to_string(),
        },
        node.source.clone(),
    )]);
    // Code blocks are not interactive.
    ft.links.clear();
    ft
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ParserCaps, parse};
    use crate::types::TextAlign;

    fn build(text: &str) -> (ElementArena, BuildResult) {
        let doc = parse(text, ParserCaps::default());
        let sheet = StyleSheet::light();
        let mut arena = ElementArena::new();
        let result =
            BlockRenderer::default().build(&doc, &sheet, Direction::Ltr, &mut arena);
        (arena, result)
    }

    fn marker_texts(arena: &ElementArena, root: ElementId) -> Vec<String> {
        let mut out = Vec::new();
        arena.walk(root, &mut |_, el| {
            if el.role == ElementRole::ListMarker {
                out.push(el.formatted().unwrap().text.clone());
            }
        });
        out
    }

    #[test]
    fn test_scenario_heading_and_paragraph() {
        let (arena, result) = build("# Title\n\nSome **bold** text.");
        let root = arena.get(result.root).unwrap();
        assert_eq!(root.children.len(), 2);

        let heading = arena.get(root.children[0]).unwrap();
        assert_eq!(heading.role, ElementRole::Heading(1));
        assert_eq!(heading.formatted().unwrap().markup, "Title");

        let para = arena.get(root.children[1]).unwrap();
        assert_eq!(para.role, ElementRole::Paragraph);
        assert_eq!(para.formatted().unwrap().markup, "Some <b>bold</b> text.");
    }

    #[test]
    fn test_output_order_matches_source_order() {
        let (arena, result) = build("# one\n\ntwo\n\n---\n\nfour");
        let root = arena.get(result.root).unwrap();
        let roles: Vec<_> = root
            .children
            .iter()
            .map(|&id| arena.get(id).unwrap().role)
            .collect();
        assert_eq!(
            roles,
            vec![
                ElementRole::Heading(1),
                ElementRole::Paragraph,
                ElementRole::Rule,
                ElementRole::Paragraph,
            ]
        );
    }

    #[test]
    fn test_scenario_nested_list_markers() {
        let (arena, result) = build("1. a\n2. b\n   1. nested\n3. c");
        assert_eq!(
            marker_texts(&arena, result.root),
            vec!["1. ", "2. ", "1. ", "3. "]
        );
    }

    #[test]
    fn test_ordered_list_seeds_from_start() {
        let (arena, result) = build("5. five\n6. six");
        assert_eq!(marker_texts(&arena, result.root), vec!["5. ", "6. "]);
    }

    #[test]
    fn test_bullet_markers_cycle_by_level() {
        let (arena, result) = build("- a\n  - b\n    - c");
        assert_eq!(
            marker_texts(&arena, result.root),
            vec!["- ", "* ", "+ "]
        );
    }

    #[test]
    fn test_task_markers() {
        let (arena, result) = build("- [x] done\n- [ ] open");
        assert_eq!(
            marker_texts(&arena, result.root),
            vec!["- [x] ", "- [ ] "]
        );
    }

    #[test]
    fn test_table_pads_short_rows() {
        let (arena, result) = build("| a | b | c |\n|---|---|---|\n| 1 |");
        let root = arena.get(result.root).unwrap();
        let table = arena.get(root.children[0]).unwrap();
        assert_eq!(table.role, ElementRole::Table);
        for &row_id in &table.children {
            let row = arena.get(row_id).unwrap();
            assert_eq!(row.children.len(), 3, "every row matches the grid");
        }
    }

    #[test]
    fn test_table_column_alignment_propagates() {
        let (arena, result) = build("| a | b |\n|:-:|--:|\n| 1 | 2 |");
        let root = arena.get(result.root).unwrap();
        let table = arena.get(root.children[0]).unwrap();
        for &row_id in &table.children {
            let row = arena.get(row_id).unwrap();
            let aligns: Vec<_> = row
                .children
                .iter()
                .map(|&id| arena.get(id).unwrap().style.align)
                .collect();
            assert_eq!(aligns, vec![TextAlign::Center, TextAlign::Right]);
        }
    }

    #[test]
    fn test_nesting_cutoff_produces_placeholder() {
        let mut text = String::new();
        for _ in 0..500 {
            text.push_str("> ");
        }
        text.push_str("deep");

        let doc = parse(&text, ParserCaps::default());
        let sheet = StyleSheet::light();
        let mut arena = ElementArena::new();
        let result = BlockRenderer::new(16).build(&doc, &sheet, Direction::Ltr, &mut arena);

        assert!(result.stats.truncated);
        assert!(result.stats.max_depth <= 16);
        let mut placeholders = 0;
        arena.walk(result.root, &mut |_, el| {
            if el.role == ElementRole::Placeholder {
                placeholders += 1;
            }
        });
        assert_eq!(placeholders, 1, "cut subtree collapses to one placeholder");
    }

    #[test]
    fn test_code_block_pins_palette() {
        let (arena, result) = build("```rust\nlet x = 1;\n```");
        let root = arena.get(result.root).unwrap();
        let code = arena.get(root.children[0]).unwrap();
        assert_eq!(code.role, ElementRole::CodeBlock);
        let sheet = StyleSheet::light();
        assert_eq!(code.style.bg, sheet.code_background);
        assert_eq!(code.style.fg, sheet.code_text_color);
        assert_eq!(code.style.align_choice, Alignment::Left);
    }

    #[test]
    fn test_image_paragraph_becomes_image_element() {
        let (arena, result) = build("![alt text](pic.png)");
        let root = arena.get(result.root).unwrap();
        let image = arena.get(root.children[0]).unwrap();
        assert_eq!(image.role, ElementRole::Image);
        let ElementKind::Image { ref src, ref alt } = image.kind else {
            panic!("expected image kind");
        };
        assert_eq!(src, "pic.png");
        assert_eq!(alt, "alt text");
    }

    #[test]
    fn test_spans_contiguous_non_overlapping() {
        let (arena, result) = build(
            "# h\n\npara **bold**\n\n- a\n- b\n  - c\n\n| x | y |\n|---|---|\n| 1 | 2 |\n\n> quote",
        );
        // For every container, children spans must be non-overlapping and
        // in order within the parent's span.
        arena.walk(result.root, &mut |_, el| {
            let mut cursor = el.span.start;
            for &child_id in &el.children {
                let child = arena.get(child_id).unwrap();
                assert!(child.span.start >= cursor, "overlap in {:?}", el.role);
                assert!(child.span.end <= el.span.end, "escape in {:?}", el.role);
                cursor = child.span.end.max(child.span.start);
            }
        });
    }

    #[test]
    fn test_empty_document() {
        let (arena, result) = build("");
        let root = arena.get(result.root).unwrap();
        assert!(root.children.is_empty());
        assert_eq!(result.stats.element_count, 1);
    }
}
