//! Render mode control.
//!
//! Decides between the live element tree and the flattened raster, keeps
//! exactly one of them live, aggregates link zones, and falls back to the
//! element tree whenever raster generation fails. The Auto heuristics are
//! tuning parameters, configurable and deliberately unexciting: big or
//! deep trees raster, everything else stays live.

use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::layout::{ComputedLayout, flow_text};
use crate::raster::{Pixmap, paint_tree};
use crate::render::{BuildStats, ElementArena, ElementId, ElementKind};
use crate::style::StyleSheet;
use crate::types::{Point, Rect, RenderMode};

// =============================================================================
// Link zones
// =============================================================================

/// A render-space region bound to a reference target.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkZone {
    pub target: String,
    pub rect: Rect,
}

/// Collect link zones from the laid-out tree, in paint order.
pub fn collect_link_zones(
    arena: &ElementArena,
    root: ElementId,
    layout: &ComputedLayout,
) -> Vec<LinkZone> {
    let mut zones = Vec::new();
    arena.walk(root, &mut |id, element| {
        let ElementKind::Text(content) = &element.kind else {
            return;
        };
        if content.links.is_empty() {
            return;
        }
        let Some(rect) = layout.rect(id) else { return };
        for fragment in flow_text(content, &element.style, rect) {
            if let Some(link) = fragment.link {
                if let Some(target) = content.links.get(link as usize) {
                    zones.push(LinkZone {
                        target: target.clone(),
                        rect: fragment.rect,
                    });
                }
            }
        }
    });
    merge_zones(zones)
}

/// Merge overlapping/adjacent zones that share a target.
///
/// Zone order stays the paint order of each group's first fragment, so
/// hit-test tie-breaking remains deterministic after merging.
fn merge_zones(zones: Vec<LinkZone>) -> Vec<LinkZone> {
    let mut merged: Vec<LinkZone> = Vec::with_capacity(zones.len());
    let mut by_target: FxHashMap<String, Vec<usize>> = FxHashMap::default();

    for zone in zones {
        let indices = by_target.entry(zone.target.clone()).or_default();
        if let Some(&i) = indices
            .iter()
            .find(|&&i| merged[i].rect.touches(&zone.rect))
        {
            merged[i].rect = merged[i].rect.union(&zone.rect);
        } else {
            indices.push(merged.len());
            merged.push(zone);
        }
    }
    merged
}

/// Resolve the target under a point.
///
/// Ties between overlapping zones go to the most recently painted one:
/// reverse paint order, deterministic for identical input.
pub fn hit_test<'a>(zones: &'a [LinkZone], point: Point) -> Option<&'a str> {
    zones
        .iter()
        .rev()
        .find(|zone| zone.rect.contains(point))
        .map(|zone| zone.target.as_str())
}

// =============================================================================
// Output
// =============================================================================

/// The live output: exactly one of the two forms exists at a time.
#[derive(Debug)]
pub enum RenderOutput {
    /// The element tree itself is the product; the host mounts it.
    ElementTree { root: ElementId },
    /// Flattened image plus the zones hit-testing needs.
    Raster {
        pixmap: Pixmap,
        zones: Vec<LinkZone>,
    },
}

impl RenderOutput {
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Raster { .. })
    }
}

// =============================================================================
// Controller
// =============================================================================

pub const DEFAULT_RASTER_ELEMENT_LIMIT: usize = 512;
pub const DEFAULT_RASTER_DEPTH_LIMIT: usize = 24;

/// Chooses and produces the output form.
#[derive(Debug, Clone)]
pub struct ModeController {
    pub mode: RenderMode,
    /// Auto mode: raster when the tree has more elements than this.
    pub raster_element_limit: usize,
    /// Auto mode: raster when the tree is deeper than this.
    pub raster_depth_limit: usize,
}

impl Default for ModeController {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            raster_element_limit: DEFAULT_RASTER_ELEMENT_LIMIT,
            raster_depth_limit: DEFAULT_RASTER_DEPTH_LIMIT,
        }
    }
}

impl ModeController {
    /// The concrete form Auto resolves to for a given build.
    pub fn effective_mode(&self, stats: &BuildStats) -> RenderMode {
        match self.mode {
            RenderMode::Auto => {
                if stats.element_count > self.raster_element_limit
                    || stats.max_depth > self.raster_depth_limit
                {
                    RenderMode::Raster
                } else {
                    RenderMode::ElementTree
                }
            }
            mode => mode,
        }
    }

    /// Produce the output for the current tree.
    ///
    /// Raster failures (degenerate or over-budget surface) log and fall
    /// back to the element tree; they never propagate.
    pub fn produce(
        &self,
        arena: &ElementArena,
        root: ElementId,
        layout: &ComputedLayout,
        sheet: &StyleSheet,
        stats: &BuildStats,
    ) -> RenderOutput {
        match self.effective_mode(stats) {
            RenderMode::Raster => match paint_tree(arena, root, layout, sheet) {
                Ok(pixmap) => {
                    let zones = collect_link_zones(arena, root, layout);
                    debug!(
                        "raster output {}x{}, {} link zones",
                        pixmap.width(),
                        pixmap.height(),
                        zones.len()
                    );
                    RenderOutput::Raster { pixmap, zones }
                }
                Err(error) => {
                    warn!("raster generation failed ({error}); falling back to element tree");
                    RenderOutput::ElementTree { root }
                }
            },
            _ => RenderOutput::ElementTree { root },
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ParserCaps, parse};
    use crate::layout::compute_layout;
    use crate::render::BlockRenderer;
    use crate::types::Direction;

    fn built(text: &str) -> (ElementArena, ElementId, ComputedLayout, BuildStats) {
        let doc = parse(text, ParserCaps::default());
        let sheet = StyleSheet::light();
        let mut arena = ElementArena::new();
        let result = BlockRenderer::default().build(&doc, &sheet, Direction::Ltr, &mut arena);
        let layout = compute_layout(&arena, result.root, 400.0);
        (arena, result.root, layout, result.stats)
    }

    #[test]
    fn test_element_tree_mode_passthrough() {
        let (arena, root, layout, stats) = built("plain");
        let controller = ModeController::default();
        let output = controller.produce(&arena, root, &layout, &StyleSheet::light(), &stats);
        assert!(matches!(output, RenderOutput::ElementTree { root: r } if r == root));
    }

    #[test]
    fn test_raster_mode_produces_pixmap_and_zones() {
        let (arena, root, layout, stats) = built("a [link](https://x.example) here");
        let controller = ModeController {
            mode: RenderMode::Raster,
            ..ModeController::default()
        };
        let output = controller.produce(&arena, root, &layout, &StyleSheet::light(), &stats);
        let RenderOutput::Raster { pixmap, zones } = output else {
            panic!("expected raster output");
        };
        assert!(pixmap.width() > 0);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].target, "https://x.example");
    }

    #[test]
    fn test_raster_failure_falls_back() {
        // Empty document -> zero-height content -> degenerate surface.
        let (arena, root, layout, stats) = built("");
        let controller = ModeController {
            mode: RenderMode::Raster,
            ..ModeController::default()
        };
        let output = controller.produce(&arena, root, &layout, &StyleSheet::light(), &stats);
        assert!(
            matches!(output, RenderOutput::ElementTree { .. }),
            "degenerate raster must fall back, not fail"
        );
    }

    #[test]
    fn test_auto_prefers_tree_for_small_documents() {
        let controller = ModeController {
            mode: RenderMode::Auto,
            ..ModeController::default()
        };
        let stats = BuildStats {
            element_count: 10,
            max_depth: 3,
            truncated: false,
        };
        assert_eq!(controller.effective_mode(&stats), RenderMode::ElementTree);
    }

    #[test]
    fn test_auto_rasters_large_or_deep() {
        let controller = ModeController {
            mode: RenderMode::Auto,
            raster_element_limit: 100,
            raster_depth_limit: 8,
        };
        let large = BuildStats {
            element_count: 101,
            max_depth: 2,
            truncated: false,
        };
        let deep = BuildStats {
            element_count: 5,
            max_depth: 9,
            truncated: false,
        };
        assert_eq!(controller.effective_mode(&large), RenderMode::Raster);
        assert_eq!(controller.effective_mode(&deep), RenderMode::Raster);
    }

    #[test]
    fn test_hit_test_reverse_paint_order_tie() {
        let zones = vec![
            LinkZone {
                target: "first".into(),
                rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            },
            LinkZone {
                target: "second".into(),
                rect: Rect::new(50.0, 0.0, 100.0, 20.0),
            },
        ];
        let p = Point::new(75.0, 10.0);
        // Overlap resolves to the most recently painted, repeatably.
        for _ in 0..10 {
            assert_eq!(hit_test(&zones, p), Some("second"));
        }
        assert_eq!(hit_test(&zones, Point::new(10.0, 10.0)), Some("first"));
        assert_eq!(hit_test(&zones, Point::new(500.0, 10.0)), None);
    }

    #[test]
    fn test_zone_merging_same_target() {
        let zones = vec![
            LinkZone {
                target: "t".into(),
                rect: Rect::new(0.0, 0.0, 50.0, 20.0),
            },
            LinkZone {
                target: "t".into(),
                rect: Rect::new(50.0, 0.0, 50.0, 20.0),
            },
            LinkZone {
                target: "other".into(),
                rect: Rect::new(50.0, 0.0, 10.0, 20.0),
            },
        ];
        let merged = merge_zones(zones);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].target, "t");
        assert_eq!(merged[0].rect, Rect::new(0.0, 0.0, 100.0, 20.0));
        assert_eq!(merged[1].target, "other");
    }

    #[test]
    fn test_wrapped_link_produces_zones() {
        let (arena, root, layout, _) = built(
            "[a very long link label that will certainly wrap across lines](https://wrap.example)",
        );
        let zones = collect_link_zones(&arena, root, &layout);
        assert!(!zones.is_empty());
        assert!(zones.iter().all(|z| z.target == "https://wrap.example"));
    }
}
