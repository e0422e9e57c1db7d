//! Rendering: inline formatting, element storage, block conversion.

pub mod block;
pub mod element;
pub mod inline;

pub use block::{BlockRenderer, BuildResult, BuildStats, DEFAULT_NESTING_LIMIT, resolve_style};
pub use element::{
    ElementArena, ElementId, ElementKind, ElementRole, RenderedElement, ResolvedStyle,
};
pub use inline::{FormattedText, TextRun, render_inline_children, render_inlines};
