//! The markdown view widget.
//!
//! One widget instance owns the whole pipeline: parsed document, style
//! sheet, element arena, layout, and the produced output. Composition
//! over inheritance: the widget delegates to three parts - the
//! classifier/scheduler pair, the block renderer, and the render-mode
//! controller - and funnels every mutation through [`MarkdownView::set_attr`].
//!
//! Everything runs on the caller's thread. The only deferred work is the
//! coalesced rebuild, which executes inside [`MarkdownView::pump`] (the
//! cooperative tick) or [`MarkdownView::flush`] (force-now).

pub mod mode;

pub use mode::{
    DEFAULT_RASTER_DEPTH_LIMIT, DEFAULT_RASTER_ELEMENT_LIMIT, LinkZone, ModeController,
    RenderOutput, collect_link_zones, hit_test,
};

use log::debug;

use crate::document::{Document, ParserCaps, parse, serialize};
use crate::layout::{ComputedLayout, compute_layout};
use crate::mapper::{self, AnchorIndex};
use crate::render::{
    BlockRenderer, BuildStats, ElementArena, ElementId, ElementRole, RenderedElement,
};
use crate::schedule::{SchedulerState, UpdateScheduler};
use crate::style::{Attr, PropertyClass, PropertyClassifier, StyleSheet};
use crate::types::{Alignment, Direction, DirectionChoice, Point, Rect, RenderMode, Rgba};

type ContentChanged = Box<dyn FnMut()>;
type LinkActivated = Box<dyn FnMut(&str)>;

// =============================================================================
// Widget
// =============================================================================

/// Markdown rendering widget: live document + style attributes in, element
/// tree or raster out.
pub struct MarkdownView {
    // Inputs
    source: String,
    caps: ParserCaps,
    sheet: StyleSheet,

    // Components
    classifier: PropertyClassifier,
    scheduler: UpdateScheduler,
    renderer: BlockRenderer,
    controller: ModeController,

    // Derived state, replaced wholesale on rebuild
    document: Document,
    direction: Direction,
    arena: ElementArena,
    root: ElementId,
    stats: BuildStats,
    layout: ComputedLayout,
    output: RenderOutput,
    anchors: AnchorIndex,

    // Host events
    on_content_changed: Option<ContentChanged>,
    on_link_activated: Option<LinkActivated>,
}

impl MarkdownView {
    /// Build a widget over initial document text, with default capability
    /// flags and the light style preset.
    pub fn new(source: impl Into<String>) -> Self {
        Self::with_style(source, StyleSheet::light())
    }

    /// Build a widget with an explicit style sheet.
    pub fn with_style(source: impl Into<String>, sheet: StyleSheet) -> Self {
        let source = source.into();
        let caps = ParserCaps::default();
        let document = parse(&source, caps);
        let direction = sheet.direction.resolve(&document.plain_text());
        let renderer = BlockRenderer::default();
        let controller = ModeController::default();

        let mut arena = ElementArena::new();
        let build = renderer.build(&document, &sheet, direction, &mut arena);
        let layout = compute_layout(&arena, build.root, sheet.viewport_width);
        let anchors = AnchorIndex::build(&document);
        let output = controller.produce(&arena, build.root, &layout, &sheet, &build.stats);

        Self {
            source,
            caps,
            sheet,
            classifier: PropertyClassifier::new(),
            scheduler: UpdateScheduler::new(),
            renderer,
            controller,
            document,
            direction,
            arena,
            root: build.root,
            stats: build.stats,
            layout,
            output,
            anchors,
            on_content_changed: None,
            on_link_activated: None,
        }
    }

    // =========================================================================
    // Mutation entry point
    // =========================================================================

    /// Apply one attribute mutation.
    ///
    /// Every setter routes through here. STYLE-class attributes patch the
    /// live tree synchronously; STRUCTURE-class attributes record the new
    /// value and arm the coalesced deferred rebuild.
    pub fn set_attr(&mut self, attr: Attr) {
        let kind = attr.kind();
        match self.classifier.classify(kind) {
            PropertyClass::Style => {
                self.apply_style(attr);
                self.refresh_presentation();
                self.notify_content_changed();
            }
            PropertyClass::Structure => {
                self.record_structure(attr);
                self.scheduler.schedule(kind);
            }
        }
    }

    // Convenience setters, one per configurable attribute.

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.set_attr(Attr::Source(source.into()));
    }

    pub fn set_parser_caps(&mut self, caps: ParserCaps) {
        self.set_attr(Attr::Caps(caps));
    }

    pub fn set_nesting_limit(&mut self, limit: usize) {
        self.set_attr(Attr::NestingLimit(limit));
    }

    pub fn set_raster_element_limit(&mut self, limit: usize) {
        self.set_attr(Attr::RasterElementLimit(limit));
    }

    pub fn set_raster_depth_limit(&mut self, limit: usize) {
        self.set_attr(Attr::RasterDepthLimit(limit));
    }

    pub fn set_viewport_width(&mut self, width: f32) {
        self.set_attr(Attr::ViewportWidth(width));
    }

    pub fn set_base_font_size(&mut self, size: f32) {
        self.set_attr(Attr::BaseFontSize(size));
    }

    pub fn set_line_spacing(&mut self, factor: f32) {
        self.set_attr(Attr::LineSpacing(factor));
    }

    pub fn set_block_spacing(&mut self, pixels: f32) {
        self.set_attr(Attr::BlockSpacing(pixels));
    }

    pub fn set_indent_unit(&mut self, pixels: f32) {
        self.set_attr(Attr::IndentUnit(pixels));
    }

    pub fn set_text_color(&mut self, color: Rgba) {
        self.set_attr(Attr::TextColor(color));
    }

    pub fn set_background(&mut self, color: Rgba) {
        self.set_attr(Attr::Background(color));
    }

    pub fn set_link_color(&mut self, color: Rgba) {
        self.set_attr(Attr::LinkColor(color));
    }

    pub fn set_quote_bar_color(&mut self, color: Rgba) {
        self.set_attr(Attr::QuoteBarColor(color));
    }

    pub fn set_code_text_color(&mut self, color: Rgba) {
        self.set_attr(Attr::CodeTextColor(color));
    }

    pub fn set_code_background(&mut self, color: Rgba) {
        self.set_attr(Attr::CodeBackground(color));
    }

    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.set_attr(Attr::Alignment(alignment));
    }

    pub fn set_direction(&mut self, direction: DirectionChoice) {
        self.set_attr(Attr::Direction(direction));
    }

    /// Select the output form. Applies immediately against the existing
    /// tree; no rebuild, identities unchanged.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.controller.mode = mode;
        self.output = self
            .controller
            .produce(&self.arena, self.root, &self.layout, &self.sheet, &self.stats);
        self.notify_content_changed();
    }

    // =========================================================================
    // Scheduling
    // =========================================================================

    /// Cooperative tick: execute the pending rebuild, if any.
    ///
    /// Returns true when a rebuild ran.
    pub fn pump(&mut self) -> bool {
        match self.scheduler.begin_rebuild() {
            Some(request) => {
                debug!(
                    "rebuild executing (generation {}, changed {:?})",
                    request.generation, request.changed
                );
                self.rebuild();
                self.scheduler.finish_rebuild(request.generation);
                self.notify_content_changed();
                true
            }
            None => false,
        }
    }

    /// Force-now escape hatch for synchronous call sites. A call with no
    /// pending rebuild is a no-op.
    pub fn flush(&mut self) -> bool {
        self.pump()
    }

    fn record_structure(&mut self, attr: Attr) {
        match attr {
            Attr::Source(source) => self.source = source,
            Attr::Caps(caps) => self.caps = caps,
            Attr::NestingLimit(limit) => self.renderer.nesting_limit = limit.max(1),
            Attr::RasterElementLimit(limit) => self.controller.raster_element_limit = limit,
            Attr::RasterDepthLimit(limit) => self.controller.raster_depth_limit = limit,
            // STYLE attrs never reach here; the classifier routed them.
            _ => debug_assert!(false, "style attribute recorded as structure"),
        }
    }

    /// Full regeneration: parse, build, lay out, produce. Discards the
    /// previous element tree wholesale; every old handle dies.
    fn rebuild(&mut self) {
        self.document = parse(&self.source, self.caps);
        self.direction = self.sheet.direction.resolve(&self.document.plain_text());

        self.arena.clear();
        let build = self
            .renderer
            .build(&self.document, &self.sheet, self.direction, &mut self.arena);
        self.root = build.root;
        self.stats = build.stats;
        self.layout = compute_layout(&self.arena, self.root, self.sheet.viewport_width);
        self.anchors = AnchorIndex::build(&self.document);
        self.output = self
            .controller
            .produce(&self.arena, self.root, &self.layout, &self.sheet, &self.stats);
    }

    // =========================================================================
    // Style patching
    // =========================================================================

    /// Patch a STYLE attribute onto the sheet and the live tree. No
    /// element is created or destroyed; identities and count stay as they
    /// are.
    fn apply_style(&mut self, attr: Attr) {
        self.sheet.version += 1;
        match attr {
            Attr::ViewportWidth(width) => {
                self.sheet.viewport_width = width;
            }
            Attr::BaseFontSize(size) => {
                self.sheet.base_font_size = size;
                self.patch_fonts();
            }
            Attr::LineSpacing(factor) => {
                self.sheet.line_spacing = factor;
                self.patch_fonts();
            }
            Attr::BlockSpacing(pixels) => {
                let old = self.sheet.block_spacing;
                self.sheet.block_spacing = pixels;
                self.patch_scaled(old, pixels, |el| &mut el.style.spacing_after);
            }
            Attr::IndentUnit(pixels) => {
                let old = self.sheet.indent_unit;
                self.sheet.indent_unit = pixels;
                self.patch_scaled(old, pixels, |el| &mut el.style.indent);
            }
            Attr::TextColor(color) => {
                self.sheet.text_color = color;
                self.patch_each(|el| {
                    // Code pins its palette; rules use the bar color.
                    if !matches!(el.role, ElementRole::CodeBlock | ElementRole::Rule) {
                        el.style.fg = color;
                    }
                });
            }
            Attr::Background(color) => {
                // Page background lives on the sheet; elements carry only
                // pinned backgrounds.
                self.sheet.background = color;
            }
            Attr::LinkColor(color) => {
                // Resolved at paint time from the sheet.
                self.sheet.link_color = color;
            }
            Attr::QuoteBarColor(color) => {
                self.sheet.quote_bar_color = color;
                self.patch_each(|el| {
                    if el.role == ElementRole::Rule {
                        el.style.fg = color;
                    }
                });
            }
            Attr::CodeTextColor(color) => {
                self.sheet.code_text_color = color;
                self.patch_each(|el| {
                    if el.role == ElementRole::CodeBlock {
                        el.style.fg = color;
                    }
                });
            }
            Attr::CodeBackground(color) => {
                self.sheet.code_background = color;
                self.patch_each(|el| {
                    if el.role == ElementRole::CodeBlock {
                        el.style.bg = color;
                    }
                });
            }
            Attr::Alignment(alignment) => {
                let old = self.sheet.alignment;
                self.sheet.alignment = alignment;
                let direction = self.direction;
                self.patch_each(|el| {
                    // Elements still following the sheet-wide choice move
                    // with it; explicit overrides (table columns, pinned
                    // code) keep theirs.
                    if el.style.align_choice == old && el.role != ElementRole::CodeBlock {
                        el.style.align_choice = alignment;
                        el.style.align = alignment.resolve(direction);
                    }
                });
            }
            Attr::Direction(choice) => {
                self.sheet.direction = choice;
                self.direction = choice.resolve(&self.document.plain_text());
                let direction = self.direction;
                self.patch_each(|el| {
                    el.style.direction = direction;
                    // Only automatic alignment re-resolves; explicit
                    // alignment is never altered by a direction change.
                    if el.style.align_choice.is_auto() {
                        el.style.align = Alignment::Auto.resolve(direction);
                    }
                });
            }
            // STRUCTURE attrs never reach here.
            _ => debug_assert!(false, "structure attribute patched as style"),
        }
    }

    /// Re-resolve font size and line height on every element, preserving
    /// the per-role multipliers.
    fn patch_fonts(&mut self) {
        let sheet = self.sheet.clone();
        self.patch_each(|el| {
            let size = match el.role {
                ElementRole::Heading(level) => sheet.heading_font_size(level),
                ElementRole::CodeBlock => sheet.code_font_size(),
                _ => sheet.base_font_size,
            };
            el.style.font_size = size;
            el.style.line_height = sheet.line_height(size);
        });
    }

    /// Scale a pixel field on every element by the ratio of new to old,
    /// keeping zeros at zero.
    fn patch_scaled(&mut self, old: f32, new: f32, field: impl Fn(&mut RenderedElement) -> &mut f32) {
        self.patch_each(|el| {
            let value = field(el);
            if *value != 0.0 {
                *value = if old > 0.0 { *value / old * new } else { new };
            }
        });
    }

    fn patch_each(&mut self, mut patch: impl FnMut(&mut RenderedElement)) {
        let version = self.sheet.version;
        for id in self.arena.ids() {
            if let Some(element) = self.arena.get_mut(id) {
                patch(element);
                element.style.style_version = version;
            }
        }
    }

    /// Recompute geometry and refresh a live raster after a style patch.
    /// The element tree itself is untouched.
    fn refresh_presentation(&mut self) {
        self.layout = compute_layout(&self.arena, self.root, self.sheet.viewport_width);
        if self.output.is_raster() {
            self.output = self
                .controller
                .produce(&self.arena, self.root, &self.layout, &self.sheet, &self.stats);
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Register the "content changed" notification.
    pub fn on_content_changed(&mut self, callback: impl FnMut() + 'static) {
        self.on_content_changed = Some(Box::new(callback));
    }

    /// Register the "interactive reference activated" event.
    pub fn on_link_activated(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_link_activated = Some(Box::new(callback));
    }

    fn notify_content_changed(&mut self) {
        if let Some(mut callback) = self.on_content_changed.take() {
            callback();
            self.on_content_changed = Some(callback);
        }
    }

    /// Hit-test a root-local point and fire the link event on a hit.
    /// Returns the activated target.
    pub fn activate(&mut self, point: Point) -> Option<String> {
        let target = self.link_at(point)?.to_string();
        if let Some(mut callback) = self.on_link_activated.take() {
            callback(&target);
            self.on_link_activated = Some(callback);
        }
        Some(target)
    }

    /// The reference target under a point, in either render mode.
    pub fn link_at(&self, point: Point) -> Option<&str> {
        match &self.output {
            RenderOutput::Raster { zones, .. } => hit_test(zones, point),
            RenderOutput::ElementTree { .. } => {
                // Tree mode computes zones on demand from the same layout.
                let zones = collect_link_zones(&self.arena, self.root, &self.layout);
                zones
                    .iter()
                    .rev()
                    .find(|zone| zone.rect.contains(point))
                    .map(|zone| zone.target.as_str())
                    // The borrow ends with the local vec; return an owned
                    // lookup against the arena instead.
                    .and_then(|target| self.find_link_str(target))
            }
        }
    }

    /// Find the canonical &str for a target inside the arena, so the
    /// returned borrow outlives the temporary zone list.
    fn find_link_str(&self, target: &str) -> Option<&str> {
        let mut found: Option<&str> = None;
        for (_, element) in self.arena.iter() {
            if let Some(content) = element.formatted() {
                if let Some(link) = content.links.iter().find(|l| l.as_str() == target) {
                    found = Some(link.as_str());
                    break;
                }
            }
        }
        found
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    /// On-screen bounds for a source byte offset.
    pub fn region_for_offset(&self, offset: usize) -> Option<Rect> {
        mapper::region_for_offset(&self.arena, self.root, &self.layout, offset)
    }

    /// On-screen bounds for a heading anchor (`"intro"` or `"#intro"`).
    pub fn region_for_anchor(&self, anchor: &str) -> Option<Rect> {
        mapper::region_for_anchor(&self.arena, self.root, &self.layout, &self.anchors, anchor)
    }

    /// Element behind a source byte offset.
    pub fn element_at_offset(&self, offset: usize) -> Option<ElementId> {
        mapper::element_at_offset(&self.arena, self.root, offset)
    }

    /// Source byte offset behind a render-space point.
    pub fn source_offset_at(&self, point: Point) -> Option<usize> {
        mapper::source_offset_at(&self.arena, self.root, &self.layout, &self.source, point)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Serialize the current document tree back to markdown.
    pub fn serialize(&self) -> String {
        serialize(&self.document)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn sheet(&self) -> &StyleSheet {
        &self.sheet
    }

    pub fn render_mode(&self) -> RenderMode {
        self.controller.mode
    }

    pub fn output(&self) -> &RenderOutput {
        &self.output
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn arena(&self) -> &ElementArena {
        &self.arena
    }

    pub fn layout(&self) -> &ComputedLayout {
        &self.layout
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn element_count(&self) -> usize {
        self.arena.len()
    }

    /// Live element identities, for identity-preservation checks.
    pub fn element_ids(&self) -> Vec<ElementId> {
        self.arena.ids()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_initial_build() {
        let view = MarkdownView::new("# Title\n\nSome **bold** text.");
        let root = view.arena().get(view.root()).unwrap();
        assert_eq!(root.children.len(), 2);
        assert!(matches!(view.output(), RenderOutput::ElementTree { .. }));
    }

    #[test]
    fn test_style_mutation_preserves_identities() {
        let mut view = MarkdownView::new("# T\n\npara\n\n- a\n- b");
        let before = view.element_ids();

        view.set_text_color(Rgba::RED);
        view.set_base_font_size(20.0);
        view.set_alignment(Alignment::Center);
        view.set_indent_unit(32.0);

        let after = view.element_ids();
        assert_eq!(before, after, "style-only mutations keep identities");
        assert_eq!(before.len(), view.element_count());
    }

    #[test]
    fn test_style_idempotence() {
        let mut view = MarkdownView::new("hello **world**");
        view.set_text_color(Rgba::BLUE);
        let ids_once = view.element_ids();
        let colors_once: Vec<Rgba> = ids_once
            .iter()
            .map(|&id| view.arena().get(id).unwrap().style.fg)
            .collect();

        view.set_text_color(Rgba::BLUE);
        let ids_twice = view.element_ids();
        let colors_twice: Vec<Rgba> = ids_twice
            .iter()
            .map(|&id| view.arena().get(id).unwrap().style.fg)
            .collect();

        assert_eq!(ids_once, ids_twice);
        assert_eq!(colors_once, colors_twice);
    }

    #[test]
    fn test_structure_mutation_defers() {
        let mut view = MarkdownView::new("first");
        view.set_source("# second");
        // Not rebuilt yet: old tree still live.
        assert_eq!(view.scheduler_state(), SchedulerState::PendingRebuild);
        let root = view.arena().get(view.root()).unwrap();
        let first_child = view.arena().get(root.children[0]).unwrap();
        assert_eq!(first_child.role, ElementRole::Paragraph);

        assert!(view.pump());
        let root = view.arena().get(view.root()).unwrap();
        let child = view.arena().get(root.children[0]).unwrap();
        assert_eq!(child.role, ElementRole::Heading(1));
        assert_eq!(view.scheduler_state(), SchedulerState::Idle);
    }

    #[test]
    fn test_scenario_two_sets_one_rebuild() {
        let rebuilds = Rc::new(RefCell::new(0));
        let counter = rebuilds.clone();

        let mut view = MarkdownView::new("initial");
        view.on_content_changed(move || {
            *counter.borrow_mut() += 1;
        });

        view.set_source("# interim");
        view.set_source("# final");
        assert_eq!(*rebuilds.borrow(), 0, "no notification before the tick");

        assert!(view.pump());
        assert!(!view.pump(), "second tick has nothing to do");

        assert_eq!(*rebuilds.borrow(), 1, "exactly one rebuild");
        assert_eq!(view.document().blocks[0].plain_text(), "final");
    }

    #[test]
    fn test_rebuild_changes_identities() {
        let mut view = MarkdownView::new("alpha");
        let before = view.element_ids();
        view.set_source("alpha beta");
        view.flush();
        let after = view.element_ids();
        assert!(
            before.iter().all(|old| !view.arena().contains(*old)),
            "old handles die with the old tree"
        );
        assert!(!after.is_empty());
    }

    #[test]
    fn test_flush_without_pending_is_noop() {
        let mut view = MarkdownView::new("steady");
        let before = view.element_ids();
        assert!(!view.flush());
        assert_eq!(before, view.element_ids());
    }

    #[test]
    fn test_scenario_font_scale_preserves_multipliers() {
        let mut view = MarkdownView::new("# Big\n\nbody text\n\n### Small");
        let ids = view.element_ids();

        let sizes_at = |view: &MarkdownView| -> Vec<(ElementRole, f32)> {
            ids.iter()
                .map(|&id| {
                    let el = view.arena().get(id).unwrap();
                    (el.role, el.style.font_size)
                })
                .collect()
        };

        let before = sizes_at(&view);
        view.set_base_font_size(24.0);
        let after = sizes_at(&view);

        assert_eq!(view.element_ids(), ids, "identities unchanged");
        for ((role_a, size_a), (role_b, size_b)) in before.iter().zip(&after) {
            assert_eq!(role_a, role_b);
            // Every element scales by exactly 24/16.
            assert!(
                (size_b / size_a - 1.5).abs() < 1e-6,
                "{role_a:?}: {size_a} -> {size_b}"
            );
        }
    }

    #[test]
    fn test_generation_strictly_increases_before_rebuild() {
        let mut view = MarkdownView::new("x");
        let g0 = view.generation();
        view.set_source("y");
        let g1 = view.generation();
        view.set_parser_caps(ParserCaps::default() - ParserCaps::TABLES);
        let g2 = view.generation();
        assert!(g0 < g1 && g1 < g2);
        view.flush();
        assert_eq!(view.generation(), g2);
    }

    #[test]
    fn test_raster_mode_switch_without_rebuild() {
        let mut view = MarkdownView::new("some [link](https://z.example) text");
        let ids = view.element_ids();

        view.set_render_mode(RenderMode::Raster);
        assert!(view.output().is_raster());
        assert_eq!(view.element_ids(), ids, "mode switch keeps the tree");

        view.set_render_mode(RenderMode::ElementTree);
        assert!(!view.output().is_raster());
    }

    #[test]
    fn test_exactly_one_output_live() {
        let mut view = MarkdownView::new("text");
        assert!(matches!(view.output(), RenderOutput::ElementTree { .. }));
        view.set_render_mode(RenderMode::Raster);
        assert!(matches!(view.output(), RenderOutput::Raster { .. }));
    }

    #[test]
    fn test_link_activation_event() {
        let activated = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = activated.clone();

        let mut view = MarkdownView::new("a [link](https://hit.example) b");
        view.on_link_activated(move |target| {
            sink.borrow_mut().push(target.to_string());
        });

        // Probe the middle of the link's bounds.
        let zones = collect_link_zones(view.arena(), view.root(), view.layout());
        assert_eq!(zones.len(), 1);
        let z = &zones[0];
        let point = Point::new(z.rect.x + z.rect.width / 2.0, z.rect.y + z.rect.height / 2.0);

        let hit = view.activate(point);
        assert_eq!(hit.as_deref(), Some("https://hit.example"));
        assert_eq!(activated.borrow().as_slice(), ["https://hit.example"]);

        // A miss fires nothing.
        assert!(view.activate(Point::new(-5.0, -5.0)).is_none());
        assert_eq!(activated.borrow().len(), 1);
    }

    #[test]
    fn test_hit_test_works_in_raster_mode() {
        let mut view = MarkdownView::new("a [link](https://r.example) b");
        view.set_render_mode(RenderMode::Raster);
        let RenderOutput::Raster { zones, .. } = view.output() else {
            panic!("raster expected");
        };
        let z = zones[0].rect;
        let point = Point::new(z.x + 1.0, z.y + 1.0);
        assert_eq!(view.link_at(point), Some("https://r.example"));
    }

    #[test]
    fn test_direction_change_reresolves_auto_only() {
        let mut view = MarkdownView::new("| a | b |\n|:--|---|\n| 1 | 2 |\n\npara");
        view.set_direction(DirectionChoice::Rtl);

        for id in view.element_ids() {
            let el = view.arena().get(id).unwrap();
            match el.style.align_choice {
                Alignment::Auto => assert_eq!(
                    el.style.align,
                    crate::types::TextAlign::Right,
                    "{:?} should follow direction",
                    el.role
                ),
                Alignment::Left => {
                    assert_eq!(el.style.align, crate::types::TextAlign::Left)
                }
                _ => {}
            }
        }
    }

    #[test]
    fn test_viewport_width_is_style_class() {
        let mut view = MarkdownView::new("a paragraph that wraps at narrow widths for sure");
        let ids = view.element_ids();
        let tall_before = view.layout().content_height;

        view.set_viewport_width(120.0);
        assert_eq!(view.element_ids(), ids);
        assert!(view.layout().content_height > tall_before);
        assert_eq!(view.scheduler_state(), SchedulerState::Idle);
    }

    #[test]
    fn test_serialize_round_trip_through_widget() {
        let text = "# Title\n\nSome **bold** text.\n\n- a\n- b";
        let view = MarkdownView::new(text);
        let emitted = view.serialize();
        let second = MarkdownView::new(emitted);
        assert_eq!(
            view.document().blocks.len(),
            second.document().blocks.len()
        );
    }

    #[test]
    fn test_anchor_region() {
        let view = MarkdownView::new("# Intro\n\nbody\n\n## Usage\n\nmore");
        assert!(view.region_for_anchor("intro").is_some());
        assert!(view.region_for_anchor("#usage").is_some());
        assert!(view.region_for_anchor("nope").is_none());
    }

    #[test]
    fn test_deep_nesting_with_low_limit() {
        let mut source = String::new();
        for _ in 0..500 {
            source.push_str("> ");
        }
        source.push_str("bottom");

        let mut view = MarkdownView::new("placeholder");
        view.set_nesting_limit(12);
        view.set_source(source);
        view.flush();

        let mut placeholders = 0;
        view.arena().walk(view.root(), &mut |_, el| {
            if el.role == ElementRole::Placeholder {
                placeholders += 1;
            }
        });
        assert_eq!(placeholders, 1);
    }
}
