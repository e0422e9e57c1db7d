//! Layout: element tree -> per-element rectangles.
//!
//! Bridges the rendered element tree into Taffy, runs flexbox layout, and
//! extracts absolute (root-local) rectangles. The painter, the link
//! zones and the coordinate mapper all consume the same
//! [`ComputedLayout`], so every render-space answer agrees.

pub mod flow;
pub mod text_measure;

pub use flow::{TextFragment, flow_text, fragment_text};
pub use text_measure::{FontMetrics, font_for, measure_lines, text_width, wrap_ranges, wrap_text};

use rustc_hash::FxHashMap;
use taffy::{
    AvailableSpace, Dimension as TaffyDimension, FlexDirection, LengthPercentage,
    LengthPercentageAuto, NodeId, Rect as TaffyRect, Size, Style, TaffyTree,
};

use crate::render::{ElementArena, ElementId, ElementKind, ElementRole};
use crate::types::{Direction, Rect};

// =============================================================================
// Computed layout
// =============================================================================

/// Absolute rectangles for every element of one build.
#[derive(Debug, Clone, Default)]
pub struct ComputedLayout {
    rects: FxHashMap<ElementId, Rect>,
    pub content_width: f32,
    pub content_height: f32,
}

impl ComputedLayout {
    /// Root-local rectangle of an element, if it was laid out.
    pub fn rect(&self, id: ElementId) -> Option<Rect> {
        self.rects.get(&id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

// Placeholder box the host swaps for the loaded image.
const IMAGE_PLACEHOLDER_WIDTH: f32 = 240.0;
const IMAGE_PLACEHOLDER_HEIGHT: f32 = 135.0;
const RULE_THICKNESS: f32 = 2.0;

// =============================================================================
// Bridge
// =============================================================================

enum MeasureCtx {
    Text {
        text: String,
        metrics: FontMetrics,
    },
    Image,
}

/// Lay out the element tree at the given viewport width.
pub fn compute_layout(
    arena: &ElementArena,
    root: ElementId,
    viewport_width: f32,
) -> ComputedLayout {
    let viewport_width = if viewport_width.is_finite() && viewport_width >= 1.0 {
        viewport_width
    } else {
        1.0
    };

    let mut tree: TaffyTree<MeasureCtx> = TaffyTree::new();
    let mut node_to_element: FxHashMap<NodeId, ElementId> = FxHashMap::default();

    let Some(root_node) = build_node(&mut tree, arena, root, &mut node_to_element, false) else {
        return ComputedLayout::default();
    };

    // Root takes the viewport width; height grows with content.
    if let Ok(mut style) = tree.style(root_node).cloned() {
        style.size.width = TaffyDimension::Length(viewport_width);
        let _ = tree.set_style(root_node, style);
    }

    let available = Size {
        width: AvailableSpace::Definite(viewport_width),
        height: AvailableSpace::MaxContent,
    };

    let _ = tree.compute_layout_with_measure(
        root_node,
        available,
        |known, available_space, _node, context, _style| {
            measure(known, available_space, context)
        },
    );

    // Extract absolute rects, walking the Taffy tree (it may contain
    // anonymous wrapper nodes with no element behind them).
    let mut layout = ComputedLayout::default();
    extract(&tree, root_node, 0.0, 0.0, &node_to_element, &mut layout);

    if let Some(rect) = layout.rect(root) {
        layout.content_width = rect.width;
        layout.content_height = rect.height;
    }
    layout
}

fn measure(
    known: Size<Option<f32>>,
    available: Size<AvailableSpace>,
    context: Option<&mut MeasureCtx>,
) -> Size<f32> {
    let Some(context) = context else {
        return Size::ZERO;
    };
    match context {
        MeasureCtx::Text { text, metrics } => {
            let budget = known.width.or(match available.width {
                AvailableSpace::Definite(w) => Some(w),
                AvailableSpace::MinContent => Some(metrics.advance),
                AvailableSpace::MaxContent => None,
            });
            let columns = match budget {
                Some(w) => metrics.columns(w),
                // Unconstrained: only explicit newlines break.
                None => usize::MAX / 2,
            };
            let lines = wrap_ranges(text, columns);
            let widest = lines.iter().map(|r| r.len()).max().unwrap_or(0);
            Size {
                width: widest as f32 * metrics.advance,
                height: lines.len() as f32 * metrics.line_height,
            }
        }
        MeasureCtx::Image => {
            let width = match available.width {
                AvailableSpace::Definite(w) => IMAGE_PLACEHOLDER_WIDTH.min(w),
                _ => IMAGE_PLACEHOLDER_WIDTH,
            };
            Size {
                width,
                height: IMAGE_PLACEHOLDER_HEIGHT,
            }
        }
    }
}

fn build_node(
    tree: &mut TaffyTree<MeasureCtx>,
    arena: &ElementArena,
    id: ElementId,
    node_to_element: &mut FxHashMap<NodeId, ElementId>,
    in_table_row: bool,
) -> Option<NodeId> {
    let element = arena.get(id)?;
    let style = base_style(element, in_table_row);

    let node = match &element.kind {
        ElementKind::Text(content) => {
            let metrics = FontMetrics::new(element.style.font_size, element.style.line_height);
            tree.new_leaf_with_context(
                style,
                MeasureCtx::Text {
                    text: content.text.clone(),
                    metrics,
                },
            )
            .ok()?
        }
        ElementKind::Image { .. } => tree.new_leaf_with_context(style, MeasureCtx::Image).ok()?,
        ElementKind::Container | ElementKind::Scroll => {
            let child_row = matches!(element.role, ElementRole::TableRow);
            let mut children = Vec::with_capacity(element.children.len());
            for &child in &element.children {
                if let Some(node) = build_node(tree, arena, child, node_to_element, child_row) {
                    children.push(node);
                }
            }

            // A list item lays out as marker + body column.
            if element.role == ElementRole::ListItem && children.len() > 1 {
                let body = children.split_off(1);
                let body_style = Style {
                    display: taffy::Display::Flex,
                    flex_direction: FlexDirection::Column,
                    flex_grow: 1.0,
                    flex_shrink: 1.0,
                    min_size: Size {
                        width: TaffyDimension::Length(0.0),
                        height: TaffyDimension::Auto,
                    },
                    ..Style::default()
                };
                let wrapper = tree.new_with_children(body_style, &body).ok()?;
                children.push(wrapper);
            }

            tree.new_with_children(style, &children).ok()?
        }
    };

    node_to_element.insert(node, id);
    Some(node)
}

fn base_style(element: &crate::render::RenderedElement, in_table_row: bool) -> Style {
    let s = &element.style;

    // Indent lands on the side the text flows from.
    let (pad_left, pad_right) = match s.direction {
        Direction::Ltr => (s.indent, 0.0),
        Direction::Rtl => (0.0, s.indent),
    };

    let mut style = Style {
        display: taffy::Display::Flex,
        flex_direction: match element.role {
            ElementRole::ListItem | ElementRole::TableRow => FlexDirection::Row,
            _ => FlexDirection::Column,
        },
        padding: TaffyRect {
            left: LengthPercentage::Length(pad_left),
            right: LengthPercentage::Length(pad_right),
            top: LengthPercentage::Length(0.0),
            bottom: LengthPercentage::Length(0.0),
        },
        margin: TaffyRect {
            left: LengthPercentageAuto::Length(0.0),
            right: LengthPercentageAuto::Length(0.0),
            top: LengthPercentageAuto::Length(0.0),
            bottom: LengthPercentageAuto::Length(s.spacing_after),
        },
        ..Style::default()
    };

    match element.role {
        // Equal-width grid columns.
        _ if in_table_row => {
            style.flex_grow = 1.0;
            style.flex_basis = TaffyDimension::Length(0.0);
            style.min_size.width = TaffyDimension::Length(0.0);
        }
        ElementRole::ListMarker => {
            style.flex_shrink = 0.0;
        }
        ElementRole::Rule => {
            style.size.height = TaffyDimension::Length(RULE_THICKNESS);
        }
        _ => {}
    }

    style
}

fn extract(
    tree: &TaffyTree<MeasureCtx>,
    node: NodeId,
    parent_x: f32,
    parent_y: f32,
    node_to_element: &FxHashMap<NodeId, ElementId>,
    out: &mut ComputedLayout,
) {
    let Ok(layout) = tree.layout(node) else { return };
    let x = parent_x + layout.location.x;
    let y = parent_y + layout.location.y;

    if let Some(&id) = node_to_element.get(&node) {
        out.rects
            .insert(id, Rect::new(x, y, layout.size.width, layout.size.height));
    }

    if let Ok(children) = tree.children(node) {
        for child in children {
            extract(tree, child, x, y, node_to_element, out);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
