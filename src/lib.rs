//! # markview
//!
//! Reactive Markdown rendering widget for Rust.
//!
//! Parses a live markdown document and keeps a rendered output - a tree
//! of host-framework UI primitives, or a single flattened raster image -
//! synchronized with the document text and a set of style attributes,
//! while minimizing redundant reconstruction work.
//!
//! ## Architecture
//!
//! The pipeline is rebuild-minimal: configurable attributes are
//! statically classified as STYLE (patched onto the live element tree in
//! place, identities preserved) or STRUCTURE (coalesced into one deferred
//! rebuild per scheduling quantum):
//!
//! ```text
//! source text ─ parse ─> DocumentNode tree ─ block/inline render ─> element arena
//!                                                       │
//!                 StyleSheet ── STYLE patch ────────────┤
//!                              STRUCTURE rebuild ───────┤
//!                                                       ▼
//!                                    layout ─> ElementTree | Raster (+ LinkZones)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core types (Rgba, Rect, alignment, direction, flags)
//! - [`document`] - Structure tree, parser adapter, serializer
//! - [`render`] - Inline renderer, element arena, block renderer
//! - [`style`] - Style attribute set and STYLE/STRUCTURE classification
//! - [`schedule`] - Coalescing deferred-rebuild scheduler
//! - [`layout`] - Taffy bridge, text measurement, text flow
//! - [`raster`] - Offscreen pixmap surface and painter
//! - [`view`] - The widget: composition, events, render-mode control
//! - [`mapper`] - Coordinate/reference mapping for navigation

pub mod document;
pub mod layout;
pub mod mapper;
pub mod raster;
pub mod render;
pub mod schedule;
pub mod style;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use types::*;

pub use document::{
    ColumnAlign, Document, DocumentNode, NodeKind, NodeSpan, ParserCaps, parse, serialize,
};

pub use render::{
    BlockRenderer, BuildResult, BuildStats, ElementArena, ElementId, ElementKind, ElementRole,
    FormattedText, RenderedElement, ResolvedStyle, TextRun,
};

pub use style::{Attr, AttrKind, PropertyClass, PropertyClassifier, StyleSheet};

pub use schedule::{RebuildRequest, SchedulerState, UpdateScheduler};

pub use layout::{ComputedLayout, FontMetrics, TextFragment, compute_layout, flow_text};

pub use raster::{MAX_SURFACE_PIXELS, Pixmap, RasterError, paint_tree};

pub use view::{
    LinkZone, MarkdownView, ModeController, RenderOutput, collect_link_zones, hit_test,
};

pub use mapper::{
    AnchorIndex, element_at_offset, heading_slug, region_for_anchor, region_for_offset,
    source_offset_at,
};
