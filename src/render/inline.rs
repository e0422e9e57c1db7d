//! Inline renderer.
//!
//! Converts a sequence of inline document nodes into one [`FormattedText`]:
//! a single markup string for a text-bearing element, plus the flat style
//! runs the painter and hit-tester work from.
//!
//! The markup uses a small closed tag set (`<b> <i> <s> <c> <a>`), and all
//! literal text is entity-escaped on the way in, so user content can never
//! be interpreted as markup. Malformed or unknown inline structure
//! degrades to plain escaped text.

use std::ops::Range;

use crate::document::{DocumentNode, NodeKind};
use crate::types::StyleFlags;

// =============================================================================
// Formatted text
// =============================================================================

/// One styled run of visible text.
///
/// `range` is a char range into [`FormattedText::text`]; `source` is the
/// byte range of the document text the run came from.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub range: Range<usize>,
    pub flags: StyleFlags,
    /// Index into [`FormattedText::links`] when the LINK flag is set.
    pub link: Option<u16>,
    pub source: Range<usize>,
}

/// The inline renderer's output for one text-bearing element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedText {
    /// Tagged, escaped markup: `Some <b>bold</b> text.`
    pub markup: String,
    /// Visible text with markup stripped, addressed by the runs.
    pub text: String,
    /// Style runs in visual order, covering `text` without overlap.
    pub runs: Vec<TextRun>,
    /// Reference targets, indexed by [`TextRun::link`].
    pub links: Vec<String>,
}

impl FormattedText {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Char count of the visible text.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The run containing a visible-text char index.
    pub fn run_at(&self, char_index: usize) -> Option<&TextRun> {
        self.runs
            .iter()
            .find(|run| char_index >= run.range.start && char_index < run.range.end)
    }
}

// =============================================================================
// Rendering
// =============================================================================

struct InlineBuilder {
    out: FormattedText,
    flags: StyleFlags,
    link: Option<u16>,
    chars: usize,
}

impl InlineBuilder {
    fn new() -> Self {
        Self {
            out: FormattedText::default(),
            flags: StyleFlags::empty(),
            link: None,
            chars: 0,
        }
    }

    /// Append literal text under the current flags.
    fn push_text(&mut self, text: &str, source: Range<usize>) {
        if text.is_empty() {
            return;
        }
        escape_into(&mut self.out.markup, text);
        self.out.text.push_str(text);

        let added = text.chars().count();
        let range = self.chars..self.chars + added;
        self.chars += added;

        // Merge with the previous run when nothing about it changed.
        if let Some(last) = self.out.runs.last_mut() {
            if last.flags == self.flags
                && last.link == self.link
                && last.range.end == range.start
            {
                last.range.end = range.end;
                last.source.end = source.end.max(last.source.end);
                return;
            }
        }
        self.out.runs.push(TextRun {
            range,
            flags: self.flags,
            link: self.link,
            source,
        });
    }

    fn node(&mut self, node: &DocumentNode) {
        match &node.kind {
            NodeKind::Text { text } => self.push_text(text, node.source.clone()),

            NodeKind::Bold => self.wrapped(node, "b", StyleFlags::BOLD),
            NodeKind::Italic => self.wrapped(node, "i", StyleFlags::ITALIC),
            NodeKind::Strike => self.wrapped(node, "s", StyleFlags::STRIKE),

            NodeKind::InlineCode { code } => {
                self.out.markup.push_str("<c>");
                let saved = self.flags;
                self.flags |= StyleFlags::CODE;
                self.push_text(code, node.source.clone());
                self.flags = saved;
                self.out.markup.push_str("</c>");
            }

            NodeKind::Link { href, .. } => {
                // Both the style tag and the position-trackable reference:
                // the <a> tag carries the target, and every run under it
                // records the link index for hit-testing.
                let index = self.out.links.len() as u16;
                self.out.links.push(href.clone());
                self.out.markup.push_str("<a href=\"");
                escape_into(&mut self.out.markup, href);
                self.out.markup.push_str("\">");

                let saved_flags = self.flags;
                let saved_link = self.link;
                self.flags |= StyleFlags::LINK;
                self.link = Some(index);
                self.children(node);
                self.flags = saved_flags;
                self.link = saved_link;

                self.out.markup.push_str("</a>");
            }

            NodeKind::Image { alt, .. } => {
                // Inline image inside a text run: alt text stands in.
                self.push_text(alt, node.source.clone());
            }

            // Block kinds reaching the inline renderer are malformed
            // nesting: degrade to their plain text, escaped.
            _ => {
                let text = node.plain_text();
                self.push_text(&text, node.source.clone());
            }
        }
    }

    fn wrapped(&mut self, node: &DocumentNode, tag: &str, flag: StyleFlags) {
        self.out.markup.push('<');
        self.out.markup.push_str(tag);
        self.out.markup.push('>');

        let saved = self.flags;
        self.flags |= flag;
        self.children(node);
        self.flags = saved;

        self.out.markup.push_str("</");
        self.out.markup.push_str(tag);
        self.out.markup.push('>');
    }

    fn children(&mut self, node: &DocumentNode) {
        for child in &node.children {
            self.node(child);
        }
    }
}

/// Render a sequence of inline nodes into one formatted string.
pub fn render_inlines(nodes: &[DocumentNode]) -> FormattedText {
    let mut b = InlineBuilder::new();
    for node in nodes {
        b.node(node);
    }
    b.out
}

/// Render the inline children of a text-bearing block node.
pub fn render_inline_children(node: &DocumentNode) -> FormattedText {
    render_inlines(&node.children)
}

/// Entity-escape literal text so it can never read as markup.
fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
