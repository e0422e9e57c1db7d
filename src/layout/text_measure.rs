//! Text measurement.
//!
//! The raster backend draws with fixed-cell bitmap fonts, so measurement
//! reduces to font selection plus character counting. Layout and painting
//! share this module: whatever the measure says, the painter draws.

use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{
    FONT_6X10, FONT_6X13, FONT_6X13_BOLD, FONT_6X13_ITALIC, FONT_7X14, FONT_7X14_BOLD, FONT_9X15,
    FONT_9X15_BOLD, FONT_9X18, FONT_9X18_BOLD, FONT_10X20,
};

use crate::types::StyleFlags;

// =============================================================================
// Font selection
// =============================================================================

/// Pick the bitmap font nearest a resolved font size, honoring bold and
/// italic variants where the font family has them.
pub fn font_for(size: f32, flags: StyleFlags) -> &'static MonoFont<'static> {
    let bold = flags.contains(StyleFlags::BOLD);
    let italic = flags.contains(StyleFlags::ITALIC);

    if size <= 11.0 {
        // Smallest tier has no variants.
        &FONT_6X10
    } else if size <= 13.5 {
        if bold {
            &FONT_6X13_BOLD
        } else if italic {
            &FONT_6X13_ITALIC
        } else {
            &FONT_6X13
        }
    } else if size <= 14.5 {
        if bold { &FONT_7X14_BOLD } else { &FONT_7X14 }
    } else if size <= 16.5 {
        if bold { &FONT_9X15_BOLD } else { &FONT_9X15 }
    } else if size <= 19.0 {
        if bold { &FONT_9X18_BOLD } else { &FONT_9X18 }
    } else {
        &FONT_10X20
    }
}

/// Metrics the layout pass needs: one advance per character, one line
/// height per wrapped line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub advance: f32,
    pub line_height: f32,
}

impl FontMetrics {
    /// Metrics for a resolved font size and configured line height.
    pub fn new(font_size: f32, line_height: f32) -> Self {
        let font = font_for(font_size, StyleFlags::empty());
        let glyph_w = (font.character_size.width + font.character_spacing) as f32;
        Self {
            advance: glyph_w,
            line_height: line_height.max(font.character_size.height as f32),
        }
    }

    /// Columns that fit in a pixel width (at least one).
    pub fn columns(&self, width: f32) -> usize {
        ((width / self.advance).floor() as usize).max(1)
    }
}

// =============================================================================
// Width and wrapping
// =============================================================================

/// Display width of a string in character cells.
///
/// Control characters are zero-width; everything else is one cell. The
/// bitmap fonts render a fallback glyph for characters outside their
/// coverage, still one cell wide.
pub fn text_width(s: &str) -> usize {
    s.chars().filter(|c| !c.is_control()).count()
}

/// Word-wrap text to a column budget, returning char-index line ranges.
///
/// Explicit newlines always break. Lines break at the last space that
/// fits; a single word wider than the budget hard-breaks. Ranges address
/// chars of the input and never include the break character itself.
pub fn wrap_ranges(text: &str, columns: usize) -> Vec<std::ops::Range<usize>> {
    let columns = columns.max(1);
    let mut lines = Vec::new();

    let chars: Vec<char> = text.chars().collect();
    let mut line_start = 0;
    let mut last_space: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            lines.push(line_start..i);
            line_start = i + 1;
            last_space = None;
            i += 1;
            continue;
        }
        if c == ' ' {
            last_space = Some(i);
        }

        let line_len = i - line_start + 1;
        if line_len > columns {
            match last_space {
                Some(space) if space >= line_start => {
                    // Break at the space; it is consumed by the break.
                    lines.push(line_start..space);
                    line_start = space + 1;
                }
                _ => {
                    // Hard break inside an over-long word.
                    lines.push(line_start..i);
                    line_start = i;
                }
            }
            last_space = None;
        }
        i += 1;
    }

    if line_start < chars.len() || lines.is_empty() {
        lines.push(line_start..chars.len());
    }
    lines
}

/// Wrapped line strings (measurement result in text form).
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    wrap_ranges(text, columns)
        .into_iter()
        .map(|range| chars[range].iter().collect())
        .collect()
}

/// Height in lines of text wrapped to a column budget.
pub fn measure_lines(text: &str, columns: usize) -> usize {
    wrap_ranges(text, columns).len()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_ignores_control() {
        assert_eq!(text_width("hello"), 5);
        assert_eq!(text_width("a\tb"), 2);
        assert_eq!(text_width(""), 0);
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        assert_eq!(wrap_text("short", 10), vec!["short"]);
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        assert_eq!(
            wrap_text("the quick brown fox", 10),
            vec!["the quick", "brown fox"]
        );
    }

    #[test]
    fn test_wrap_hard_breaks_long_words() {
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_honors_newlines() {
        assert_eq!(wrap_text("a\nb", 10), vec!["a", "b"]);
        assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
    }

    #[test]
    fn test_wrap_empty_is_one_line() {
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(measure_lines("", 10), 1);
    }

    #[test]
    fn test_wrap_ranges_address_chars() {
        let text = "the quick brown fox";
        let ranges = wrap_ranges(text, 10);
        let chars: Vec<char> = text.chars().collect();
        let first: String = chars[ranges[0].clone()].iter().collect();
        assert_eq!(first, "the quick");
    }

    #[test]
    fn test_font_tiers_monotonic() {
        let small = font_for(10.0, StyleFlags::empty());
        let base = font_for(16.0, StyleFlags::empty());
        let big = font_for(32.0, StyleFlags::empty());
        assert!(small.character_size.height <= base.character_size.height);
        assert!(base.character_size.height <= big.character_size.height);
    }

    #[test]
    fn test_bold_variant_same_tier_height() {
        let regular = font_for(13.0, StyleFlags::empty());
        let bold = font_for(13.0, StyleFlags::BOLD);
        assert_eq!(regular.character_size.height, bold.character_size.height);
    }

    #[test]
    fn test_metrics_columns() {
        let m = FontMetrics::new(16.0, 20.0);
        assert!(m.advance > 0.0);
        assert_eq!(m.columns(m.advance * 10.0 + 0.5), 10);
        assert_eq!(m.columns(0.0), 1);
    }
}
