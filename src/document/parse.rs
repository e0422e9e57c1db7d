//! Structure parser adapter.
//!
//! Wraps pulldown-cmark behind the crate's node model. The grammar itself
//! is the parser's business; this module folds its event stream into a
//! [`Document`] tree, capturing source byte ranges along the way.
//!
//! The adapter never fails: arbitrary input produces a best-effort tree,
//! and any event it does not understand is preserved as literal text.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use super::node::{ColumnAlign, Document, DocumentNode, NodeKind};

// =============================================================================
// Capability flags
// =============================================================================

bitflags::bitflags! {
    /// Grammar extensions the parser is asked to honor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParserCaps: u8 {
        const TABLES        = 1 << 0;
        const STRIKETHROUGH = 1 << 1;
        const TASK_LISTS    = 1 << 2;
        const FOOTNOTES     = 1 << 3;
    }
}

impl Default for ParserCaps {
    fn default() -> Self {
        Self::TABLES | Self::STRIKETHROUGH | Self::TASK_LISTS
    }
}

impl ParserCaps {
    fn to_options(self) -> Options {
        let mut options = Options::empty();
        if self.contains(Self::TABLES) {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.contains(Self::STRIKETHROUGH) {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.contains(Self::TASK_LISTS) {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.contains(Self::FOOTNOTES) {
            options.insert(Options::ENABLE_FOOTNOTES);
        }
        options
    }
}

// =============================================================================
// Event folding
// =============================================================================

/// A container being assembled; closed by the matching End event.
struct Frame {
    kind: FrameKind,
    children: Vec<DocumentNode>,
    source: Range<usize>,
}

enum FrameKind {
    /// Becomes a node of this kind.
    Node(NodeKind),
    /// Unsupported container: its children splice into the parent.
    Transparent,
}

struct Builder {
    blocks: Vec<DocumentNode>,
    stack: Vec<Frame>,
}

impl Builder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn open(&mut self, kind: NodeKind, source: Range<usize>) {
        self.stack.push(Frame {
            kind: FrameKind::Node(kind),
            children: Vec::new(),
            source,
        });
    }

    fn open_transparent(&mut self, source: Range<usize>) {
        self.stack.push(Frame {
            kind: FrameKind::Transparent,
            children: Vec::new(),
            source,
        });
    }

    fn attach(&mut self, node: DocumentNode) {
        match self.stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => self.blocks.push(node),
        }
    }

    /// Close the innermost frame. A stray End with nothing open is dropped.
    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else { return };
        match frame.kind {
            FrameKind::Node(kind) => {
                // Image frames collapse their children into the alt text.
                let node = if let NodeKind::Image { src, .. } = kind {
                    let mut alt = String::new();
                    for child in &frame.children {
                        alt.push_str(&child.plain_text());
                    }
                    DocumentNode::new(NodeKind::Image { src, alt }, frame.source)
                } else {
                    let mut node = DocumentNode::new(kind, frame.source);
                    node.children = frame.children;
                    node
                };
                self.attach(node);
            }
            FrameKind::Transparent => {
                for child in frame.children {
                    self.attach(child);
                }
            }
        }
    }

    /// Append literal text, merging with a trailing text sibling.
    fn push_text(&mut self, text: &str, source: Range<usize>) {
        // Text inside a code block accumulates into the block itself.
        if let Some(Frame {
            kind: FrameKind::Node(NodeKind::CodeBlock { code, .. }),
            ..
        }) = self.stack.last_mut()
        {
            code.push_str(text);
            return;
        }

        let siblings = match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.blocks,
        };
        if let Some(DocumentNode {
            kind: NodeKind::Text { text: prev },
            source: prev_source,
            ..
        }) = siblings.last_mut()
        {
            prev.push_str(text);
            prev_source.end = source.end.max(prev_source.end);
            return;
        }
        self.attach(DocumentNode::text(text, source));
    }

    /// Record the task-list checkbox on the innermost list item.
    fn mark_task(&mut self, done: bool) {
        for frame in self.stack.iter_mut().rev() {
            if let FrameKind::Node(NodeKind::ListItem { checked }) = &mut frame.kind {
                *checked = Some(done);
                return;
            }
        }
    }
}

/// Parse document text into a structure tree.
///
/// Deterministic in (text, caps). Never fails: unrecognized constructs
/// degrade to literal text nodes, unbalanced markup is tolerated, and the
/// worst possible input yields a flat sequence of paragraphs.
pub fn parse(text: &str, caps: ParserCaps) -> Document {
    let parser = Parser::new_ext(text, caps.to_options());
    let mut b = Builder::new();

    for (event, range) in parser.into_offset_iter() {
        match event {
            Event::Start(tag) => start_tag(&mut b, tag, range),
            Event::End(_) => b.close(),

            Event::Text(t) => b.push_text(&t, range),
            Event::Code(code) => b.attach(DocumentNode::new(
                NodeKind::InlineCode {
                    code: code.into_string(),
                },
                range,
            )),

            Event::SoftBreak => b.push_text(" ", range),
            Event::HardBreak => b.push_text("\n", range),
            Event::Rule => b.attach(DocumentNode::new(NodeKind::ThematicBreak, range)),
            Event::TaskListMarker(done) => b.mark_task(done),

            // Raw HTML and anything else the grammar may grow: keep the
            // literal text so nothing silently disappears.
            Event::Html(raw) | Event::InlineHtml(raw) => b.push_text(&raw, range),
            Event::FootnoteReference(name) => {
                b.push_text(&format!("[{name}]"), range);
            }
            _ => {
                if let Some(raw) = text.get(range.clone()) {
                    b.push_text(raw, range);
                }
            }
        }
    }

    // Unbalanced input can leave frames open; close them all.
    while !b.stack.is_empty() {
        b.close();
    }

    let mut doc = Document {
        blocks: b.blocks,
        node_count: 0,
    };
    doc.number_spans();
    doc
}

fn start_tag(b: &mut Builder, tag: Tag<'_>, range: Range<usize>) {
    match tag {
        Tag::Paragraph => b.open(NodeKind::Paragraph, range),
        Tag::Heading { level, .. } => b.open(
            NodeKind::Heading {
                level: heading_level(level),
            },
            range,
        ),
        Tag::BlockQuote(_) => b.open(NodeKind::BlockQuote, range),
        Tag::CodeBlock(kind) => {
            let language = match kind {
                CodeBlockKind::Fenced(lang) => {
                    let lang = lang.into_string();
                    if lang.is_empty() { None } else { Some(lang) }
                }
                CodeBlockKind::Indented => None,
            };
            b.open(
                NodeKind::CodeBlock {
                    language,
                    code: String::new(),
                },
                range,
            );
        }
        Tag::List(first) => b.open(
            NodeKind::List {
                ordered: first.is_some(),
                start: first.unwrap_or(1),
            },
            range,
        ),
        Tag::Item => b.open(NodeKind::ListItem { checked: None }, range),
        Tag::Table(alignments) => b.open(
            NodeKind::Table {
                alignments: alignments.iter().map(column_align).collect(),
            },
            range,
        ),
        Tag::TableHead => b.open(NodeKind::TableRow { header: true }, range),
        Tag::TableRow => b.open(NodeKind::TableRow { header: false }, range),
        Tag::TableCell => b.open(NodeKind::TableCell, range),

        Tag::Emphasis => b.open(NodeKind::Italic, range),
        Tag::Strong => b.open(NodeKind::Bold, range),
        Tag::Strikethrough => b.open(NodeKind::Strike, range),
        Tag::Link { dest_url, title, .. } => b.open(
            NodeKind::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
            },
            range,
        ),
        Tag::Image { dest_url, .. } => b.open(
            NodeKind::Image {
                src: dest_url.into_string(),
                alt: String::new(),
            },
            range,
        ),

        // Footnote definitions, HTML blocks, metadata and future container
        // tags: contents flow through to the parent.
        _ => b.open_transparent(range),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn column_align(a: &pulldown_cmark::Alignment) -> ColumnAlign {
    match a {
        pulldown_cmark::Alignment::None => ColumnAlign::Default,
        pulldown_cmark::Alignment::Left => ColumnAlign::Left,
        pulldown_cmark::Alignment::Center => ColumnAlign::Center,
        pulldown_cmark::Alignment::Right => ColumnAlign::Right,
    }
}

// =============================================================================
// Tests
// =============================================================================
