//! STYLE / STRUCTURE attribute classification.
//!
//! Every configurable attribute belongs to exactly one of two classes:
//!
//! - STYLE: patched onto the existing element tree in place. No elements
//!   are created or destroyed, identities and count are unchanged.
//! - STRUCTURE: invalidates the tree shape; handled by scheduling one
//!   coalesced deferred rebuild.
//!
//! The partition is static data. [`PropertyClassifier::new`] asserts
//! completeness and disjointness against [`AttrKind::ALL`], so a variant
//! added to one table but not the other is caught the first time any
//! widget is constructed, not discovered in production behavior.

use crate::document::ParserCaps;
use crate::types::{Alignment, DirectionChoice, Rgba};

// =============================================================================
// Attributes
// =============================================================================

/// A configurable-attribute mutation, carrying its new value.
///
/// This is the payload of the widget's single mutation entry point; every
/// public setter routes through it.
#[derive(Debug, Clone, PartialEq)]
pub enum Attr {
    // STYLE class
    ViewportWidth(f32),
    BaseFontSize(f32),
    LineSpacing(f32),
    BlockSpacing(f32),
    IndentUnit(f32),
    TextColor(Rgba),
    Background(Rgba),
    LinkColor(Rgba),
    QuoteBarColor(Rgba),
    CodeTextColor(Rgba),
    CodeBackground(Rgba),
    Alignment(Alignment),
    Direction(DirectionChoice),

    // STRUCTURE class
    Source(String),
    Caps(ParserCaps),
    NestingLimit(usize),
    RasterElementLimit(usize),
    RasterDepthLimit(usize),
}

/// Value-free attribute identity, used for classification and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    ViewportWidth,
    BaseFontSize,
    LineSpacing,
    BlockSpacing,
    IndentUnit,
    TextColor,
    Background,
    LinkColor,
    QuoteBarColor,
    CodeTextColor,
    CodeBackground,
    Alignment,
    Direction,
    Source,
    Caps,
    NestingLimit,
    RasterElementLimit,
    RasterDepthLimit,
}

impl AttrKind {
    /// Every configurable attribute. The classifier's completeness
    /// assertion runs against this list.
    pub const ALL: [AttrKind; 18] = [
        AttrKind::ViewportWidth,
        AttrKind::BaseFontSize,
        AttrKind::LineSpacing,
        AttrKind::BlockSpacing,
        AttrKind::IndentUnit,
        AttrKind::TextColor,
        AttrKind::Background,
        AttrKind::LinkColor,
        AttrKind::QuoteBarColor,
        AttrKind::CodeTextColor,
        AttrKind::CodeBackground,
        AttrKind::Alignment,
        AttrKind::Direction,
        AttrKind::Source,
        AttrKind::Caps,
        AttrKind::NestingLimit,
        AttrKind::RasterElementLimit,
        AttrKind::RasterDepthLimit,
    ];
}

impl Attr {
    pub fn kind(&self) -> AttrKind {
        match self {
            Attr::ViewportWidth(_) => AttrKind::ViewportWidth,
            Attr::BaseFontSize(_) => AttrKind::BaseFontSize,
            Attr::LineSpacing(_) => AttrKind::LineSpacing,
            Attr::BlockSpacing(_) => AttrKind::BlockSpacing,
            Attr::IndentUnit(_) => AttrKind::IndentUnit,
            Attr::TextColor(_) => AttrKind::TextColor,
            Attr::Background(_) => AttrKind::Background,
            Attr::LinkColor(_) => AttrKind::LinkColor,
            Attr::QuoteBarColor(_) => AttrKind::QuoteBarColor,
            Attr::CodeTextColor(_) => AttrKind::CodeTextColor,
            Attr::CodeBackground(_) => AttrKind::CodeBackground,
            Attr::Alignment(_) => AttrKind::Alignment,
            Attr::Direction(_) => AttrKind::Direction,
            Attr::Source(_) => AttrKind::Source,
            Attr::Caps(_) => AttrKind::Caps,
            Attr::NestingLimit(_) => AttrKind::NestingLimit,
            Attr::RasterElementLimit(_) => AttrKind::RasterElementLimit,
            Attr::RasterDepthLimit(_) => AttrKind::RasterDepthLimit,
        }
    }
}

// =============================================================================
// Classification
// =============================================================================

/// The two mutation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyClass {
    /// In-place patch of the live tree.
    Style,
    /// Coalesced deferred rebuild.
    Structure,
}

/// Attributes patched in place.
static STYLE_CLASS: &[AttrKind] = &[
    AttrKind::ViewportWidth,
    AttrKind::BaseFontSize,
    AttrKind::LineSpacing,
    AttrKind::BlockSpacing,
    AttrKind::IndentUnit,
    AttrKind::TextColor,
    AttrKind::Background,
    AttrKind::LinkColor,
    AttrKind::QuoteBarColor,
    AttrKind::CodeTextColor,
    AttrKind::CodeBackground,
    AttrKind::Alignment,
    AttrKind::Direction,
];

/// Attributes that invalidate the tree shape.
static STRUCTURE_CLASS: &[AttrKind] = &[
    AttrKind::Source,
    AttrKind::Caps,
    AttrKind::NestingLimit,
    AttrKind::RasterElementLimit,
    AttrKind::RasterDepthLimit,
];

/// Validated view over the classification tables.
#[derive(Debug, Clone, Copy)]
pub struct PropertyClassifier {
    _checked: (),
}

impl PropertyClassifier {
    /// Build the classifier, asserting the tables partition
    /// [`AttrKind::ALL`]: every attribute in exactly one class, no
    /// stragglers, no duplicates.
    pub fn new() -> Self {
        for kind in AttrKind::ALL {
            let in_style = STYLE_CLASS.contains(&kind);
            let in_structure = STRUCTURE_CLASS.contains(&kind);
            assert!(
                in_style != in_structure,
                "attribute {kind:?} must be in exactly one class (style: {in_style}, structure: {in_structure})"
            );
        }
        assert_eq!(
            STYLE_CLASS.len() + STRUCTURE_CLASS.len(),
            AttrKind::ALL.len(),
            "classification tables list an attribute more than once"
        );
        Self { _checked: () }
    }

    /// Look up the class of an attribute.
    pub fn classify(&self, kind: AttrKind) -> PropertyClass {
        if STYLE_CLASS.contains(&kind) {
            PropertyClass::Style
        } else {
            PropertyClass::Structure
        }
    }

    pub fn style_attrs(&self) -> &'static [AttrKind] {
        STYLE_CLASS
    }

    pub fn structure_attrs(&self) -> &'static [AttrKind] {
        STRUCTURE_CLASS
    }
}

impl Default for PropertyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
