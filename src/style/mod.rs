//! Style attribute set.
//!
//! A [`StyleSheet`] is the full, versioned set of configurable visual
//! attributes applied to the rendered output. Built-in presets follow the
//! usual light/dark pair; everything is adjustable afterwards through the
//! widget's attribute entry point.

pub mod classify;

pub use classify::{Attr, AttrKind, PropertyClass, PropertyClassifier};

use crate::types::{Alignment, DirectionChoice, Rgba};

// =============================================================================
// StyleSheet
// =============================================================================

/// The complete set of configurable visual attributes.
///
/// `version` increments on every mutation; rendered elements remember the
/// version they were resolved against, which makes stale-style detection
/// in tests and debugging trivial.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    pub version: u64,

    // Geometry
    pub viewport_width: f32,
    pub base_font_size: f32,
    /// Heading font-size multipliers for levels 1-6, relative to base.
    pub heading_scales: [f32; 6],
    /// Extra leading as a multiple of the line height.
    pub line_spacing: f32,
    /// Vertical gap between sibling blocks, in pixels.
    pub block_spacing: f32,
    /// Horizontal indent per nesting level (lists, quotes), in pixels.
    pub indent_unit: f32,

    // Colors
    pub text_color: Rgba,
    pub background: Rgba,
    pub link_color: Rgba,
    pub quote_bar_color: Rgba,
    /// Code spans and blocks pin these two regardless of the general
    /// text/background colors.
    pub code_text_color: Rgba,
    pub code_background: Rgba,

    // Text flow
    pub alignment: Alignment,
    pub direction: DirectionChoice,
}

impl StyleSheet {
    /// Light preset: dark text on white.
    pub fn light() -> Self {
        Self {
            version: 0,
            viewport_width: 640.0,
            base_font_size: 16.0,
            heading_scales: [2.0, 1.5, 1.25, 1.0, 0.875, 0.85],
            line_spacing: 1.25,
            block_spacing: 8.0,
            indent_unit: 24.0,
            text_color: Rgba::rgb(36, 41, 47),
            background: Rgba::WHITE,
            link_color: Rgba::rgb(9, 105, 218),
            quote_bar_color: Rgba::rgb(208, 215, 222),
            code_text_color: Rgba::rgb(36, 41, 47),
            code_background: Rgba::rgb(246, 248, 250),
            alignment: Alignment::Auto,
            direction: DirectionChoice::Auto,
        }
    }

    /// Dark preset: light text on near-black.
    pub fn dark() -> Self {
        Self {
            text_color: Rgba::rgb(230, 237, 243),
            background: Rgba::rgb(13, 17, 23),
            link_color: Rgba::rgb(88, 166, 255),
            quote_bar_color: Rgba::rgb(48, 54, 61),
            code_text_color: Rgba::rgb(230, 237, 243),
            code_background: Rgba::rgb(22, 27, 34),
            ..Self::light()
        }
    }

    /// Resolved font size for a heading level (1-6). Out-of-range levels
    /// clamp to 6.
    pub fn heading_font_size(&self, level: u8) -> f32 {
        let idx = (level.clamp(1, 6) - 1) as usize;
        self.base_font_size * self.heading_scales[idx]
    }

    /// Code font size: pinned to the base size, unaffected by heading
    /// scaling.
    pub fn code_font_size(&self) -> f32 {
        self.base_font_size
    }

    /// Line height for a font size, including configured leading.
    pub fn line_height(&self, font_size: f32) -> f32 {
        font_size * self.line_spacing
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::light()
    }
}

// =============================================================================
// Tests
// =============================================================================
