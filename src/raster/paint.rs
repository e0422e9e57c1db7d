//! Element tree painter.
//!
//! Flattens a laid-out element tree onto a [`Pixmap`]. Paint order is the
//! tree's pre-order walk, which matches source order: later elements draw
//! over earlier ones, and the hit-tester resolves overlap ties by that
//! same order, reversed.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::layout::{ComputedLayout, flow_text, font_for, fragment_text};
use crate::render::{ElementArena, ElementId, ElementKind, ElementRole, RenderedElement};
use crate::style::StyleSheet;
use crate::types::{Direction, Rect, Rgba, StyleFlags};

use super::{Pixmap, RasterError, flatten};

/// Width of the block-quote bar, in pixels.
const QUOTE_BAR_WIDTH: f32 = 4.0;

/// Render the element tree to an offscreen surface sized to content.
pub fn paint_tree(
    arena: &ElementArena,
    root: ElementId,
    layout: &ComputedLayout,
    sheet: &StyleSheet,
) -> Result<Pixmap, RasterError> {
    let width = layout.content_width.ceil() as u32;
    let height = layout.content_height.ceil() as u32;
    let mut pixmap = Pixmap::new(width, height)?;
    pixmap.fill(sheet.background);

    arena.walk(root, &mut |id, element| {
        if let Some(rect) = layout.rect(id) {
            paint_element(&mut pixmap, element, rect, sheet);
        }
    });

    Ok(pixmap)
}

fn paint_element(pixmap: &mut Pixmap, element: &RenderedElement, rect: Rect, sheet: &StyleSheet) {
    // Element background first (code blocks pin one).
    if !element.style.bg.is_transparent() {
        fill_rect(pixmap, rect, element.style.bg, sheet.background);
    }

    match element.role {
        ElementRole::Quote => {
            // Bar on the text-flow side.
            let bar = match element.style.direction {
                Direction::Ltr => Rect::new(rect.x, rect.y, QUOTE_BAR_WIDTH, rect.height),
                Direction::Rtl => Rect::new(
                    rect.right() - QUOTE_BAR_WIDTH,
                    rect.y,
                    QUOTE_BAR_WIDTH,
                    rect.height,
                ),
            };
            fill_rect(pixmap, bar, sheet.quote_bar_color, sheet.background);
        }
        ElementRole::Rule => {
            fill_rect(pixmap, rect, element.style.fg, sheet.background);
        }
        _ => {}
    }

    match &element.kind {
        ElementKind::Text(content) => paint_text(pixmap, element, content, rect, sheet),
        ElementKind::Image { alt, .. } => paint_image_placeholder(pixmap, element, alt, rect, sheet),
        ElementKind::Container | ElementKind::Scroll => {}
    }
}

fn paint_text(
    pixmap: &mut Pixmap,
    element: &RenderedElement,
    content: &crate::render::FormattedText,
    rect: Rect,
    sheet: &StyleSheet,
) {
    let is_code_block = element.role == ElementRole::CodeBlock;

    for fragment in flow_text(content, &element.style, rect) {
        // Inline code spans get the pinned code palette; links the link
        // color; everything else the element's resolved foreground.
        let fg = if fragment.flags.contains(StyleFlags::CODE) && !is_code_block {
            sheet.code_text_color
        } else if fragment.flags.contains(StyleFlags::LINK) {
            sheet.link_color
        } else {
            element.style.fg
        };

        if fragment.flags.contains(StyleFlags::CODE) && !is_code_block {
            fill_rect(pixmap, fragment.rect, sheet.code_background, sheet.background);
        }

        let font = font_for(element.style.font_size, fragment.flags);
        let style = MonoTextStyle::new(font, flatten(fg, sheet.background));
        let text = fragment_text(content, &fragment);
        let origin = Point::new(fragment.rect.x.round() as i32, fragment.rect.y.round() as i32);
        // Drawing into an owned pixmap cannot fail.
        let _ = Text::with_baseline(&text, origin, style, Baseline::Top).draw(pixmap);

        if fragment.flags.contains(StyleFlags::LINK) {
            let underline = Rect::new(
                fragment.rect.x,
                fragment.rect.bottom() - 2.0,
                fragment.rect.width,
                1.0,
            );
            fill_rect(pixmap, underline, sheet.link_color, sheet.background);
        }
        if fragment.flags.contains(StyleFlags::STRIKE) {
            let strike = Rect::new(
                fragment.rect.x,
                fragment.rect.y + fragment.rect.height / 2.0,
                fragment.rect.width,
                1.0,
            );
            fill_rect(pixmap, strike, fg, sheet.background);
        }
    }
}

/// Images raster as a framed placeholder carrying the alt text.
fn paint_image_placeholder(
    pixmap: &mut Pixmap,
    element: &RenderedElement,
    alt: &str,
    rect: Rect,
    sheet: &StyleSheet,
) {
    let frame = Rectangle::new(
        Point::new(rect.x.round() as i32, rect.y.round() as i32),
        Size::new(rect.width.max(0.0) as u32, rect.height.max(0.0) as u32),
    );
    let stroke = PrimitiveStyle::with_stroke(flatten(sheet.quote_bar_color, sheet.background), 1);
    let _ = frame.into_styled(stroke).draw(pixmap);

    if !alt.is_empty() {
        let font = font_for(element.style.font_size, StyleFlags::empty());
        let style = MonoTextStyle::new(font, flatten(element.style.fg, sheet.background));
        let origin = Point::new(rect.x.round() as i32 + 4, rect.y.round() as i32 + 4);
        let _ = Text::with_baseline(alt, origin, style, Baseline::Top).draw(pixmap);
    }
}

fn fill_rect(pixmap: &mut Pixmap, rect: Rect, color: Rgba, background: Rgba) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let shape = Rectangle::new(
        Point::new(rect.x.round() as i32, rect.y.round() as i32),
        Size::new(rect.width.round() as u32, rect.height.round() as u32),
    );
    let _ = shape
        .into_styled(PrimitiveStyle::with_fill(flatten(color, background)))
        .draw(pixmap);
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

    fn raster(text: &str, width: f32) -> Pixmap {
        let doc = parse(text, ParserCaps::default());
        let sheet = StyleSheet::light();
        let mut arena = ElementArena::new();
        let result = BlockRenderer::default().build(&doc, &sheet, Direction::Ltr, &mut arena);
        let layout = compute_layout(&arena, result.root, width);
        paint_tree(&arena, result.root, &layout, &sheet).expect("paintable")
    }

    fn count_not_background(pm: &Pixmap, background: Rgba) -> usize {
        let mut n = 0;
        for y in 0..pm.height() {
            for x in 0..pm.width() {
                if pm.pixel(x, y) != background {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn test_paints_text_pixels() {
        let pm = raster("hello world", 300.0);
        let background = StyleSheet::light().background;
        assert!(count_not_background(&pm, background) > 0, "glyphs drawn");
    }

    #[test]
    fn test_surface_sized_to_content() {
        let short = raster("one line", 300.0);
        let tall = raster("# h\n\np1\n\np2\n\np3\n\np4", 300.0);
        assert_eq!(short.width(), 300);
        assert!(tall.height() > short.height());
    }

    #[test]
    fn test_empty_document_fails_degenerate() {
        let doc = parse("", ParserCaps::default());
        let sheet = StyleSheet::light();
        let mut arena = ElementArena::new();
        let result = BlockRenderer::default().build(&doc, &sheet, Direction::Ltr, &mut arena);
        let layout = compute_layout(&arena, result.root, 300.0);
        // Zero content height: the surface cannot exist; callers fall
        // back to the element tree.
        assert!(matches!(
            paint_tree(&arena, result.root, &layout, &sheet),
            Err(RasterError::DegenerateSize { .. })
        ));
    }

    #[test]
    fn test_code_block_background_painted() {
        let pm = raster("```\ncode\n```", 300.0);
        let sheet = StyleSheet::light();
        let mut found = false;
        'scan: for y in 0..pm.height() {
            for x in 0..pm.width() {
                if pm.pixel(x, y) == sheet.code_background {
                    found = true;
                    break 'scan;
                }
            }
        }
        assert!(found, "code background visible");
    }

    #[test]
    fn test_quote_bar_painted() {
        let pm = raster("> words", 300.0);
        let sheet = StyleSheet::light();
        // Bar hugs the left edge.
        let mut found = false;
        for y in 0..pm.height() {
            if pm.pixel(1, y) == sheet.quote_bar_color {
                found = true;
            }
        }
        assert!(found, "quote bar on the left edge");
    }

    #[test]
    fn test_deterministic_output() {
        let a = raster("# T\n\nsome **text** here", 240.0);
        let b = raster("# T\n\nsome **text** here", 240.0);
        assert_eq!(a.data(), b.data());
    }
}
