//! Height measurement for the headless sandbox.

use std::sync::LazyLock;

use regex::Regex;

use crate::typeset::TypesetBody;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&[#a-zA-Z0-9]+;").unwrap());

/// Which of the two post-typeset measurements is being taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePhase {
    First,
    Second,
}

/// Measures the total rendered height of a typeset body, in CSS pixels.
pub trait LayoutEngine: Send + Sync {
    fn measure(&self, body: &TypesetBody, font_size: f32, phase: SettlePhase) -> f64;
}

/// Line-box estimate from font metrics and a fixed viewport width.
///
/// Every paragraph is split at `<br>`, each line wraps at
/// `viewport_width / (font_size * char_width)` characters, and display math
/// blocks add extra vertical room. Both phases give the same answer.
#[derive(Debug, Clone, PartialEq)]
pub struct HeuristicLayout {
    pub viewport_width: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
    /// Average glyph advance as a multiple of the font size.
    pub char_width: f32,
    /// Gap between paragraphs as a multiple of the font size.
    pub paragraph_gap: f32,
    /// Extra height per display math block as a multiple of the font size.
    pub display_extra: f32,
}

impl Default for HeuristicLayout {
    fn default() -> Self {
        Self {
            viewport_width: 360.0,
            line_height: 1.5,
            char_width: 0.5,
            paragraph_gap: 0.5,
            display_extra: 1.5,
        }
    }
}

impl HeuristicLayout {
    pub fn with_viewport_width(viewport_width: f32) -> Self {
        Self {
            viewport_width,
            ..Default::default()
        }
    }

    fn chars_per_line(&self, font_size: f32) -> usize {
        let advance = (font_size * self.char_width).max(1.0);
        ((self.viewport_width / advance).floor() as usize).max(1)
    }
}

impl LayoutEngine for HeuristicLayout {
    fn measure(&self, body: &TypesetBody, font_size: f32, _phase: SettlePhase) -> f64 {
        let font_size = f64::from(font_size);
        let per_line = self.chars_per_line(font_size as f32);

        let paragraphs: Vec<&str> = body
            .html
            .split("</p>")
            .filter(|p| !p.trim().is_empty())
            .collect();
        let paragraph_count = paragraphs.len().max(1);

        let lines: usize = paragraphs
            .iter()
            .flat_map(|p| p.split("<br>"))
            .map(|line| {
                let visible = visible_chars(line);
                visible.div_ceil(per_line).max(1)
            })
            .sum::<usize>()
            .max(1);

        let line_px = font_size * f64::from(self.line_height);
        let gaps = (paragraph_count - 1) as f64 * font_size * f64::from(self.paragraph_gap);
        let display = body.display_blocks as f64 * font_size * f64::from(self.display_extra);

        lines as f64 * line_px + gaps + display
    }
}

fn visible_chars(html: &str) -> usize {
    let text = TAG_RE.replace_all(html, "");
    let text = ENTITY_RE.replace_all(&text, "x");
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measure(html: &str) -> f64 {
        HeuristicLayout::default().measure(&TypesetBody::untypeset(html), 16.0, SettlePhase::First)
    }

    #[test]
    fn single_short_line() {
        assert_eq!(measure("<p>Hello world</p>"), 24.0);
    }

    #[test]
    fn long_lines_wrap() {
        // 45 chars per line at 16px in a 360px viewport.
        let text = "a".repeat(100);
        assert_eq!(measure(&format!("<p>{text}</p>")), 3.0 * 24.0);
    }

    #[test]
    fn breaks_and_paragraphs_add_height() {
        assert_eq!(measure("<p>one<br>two</p><p>three</p>"), 3.0 * 24.0 + 8.0);
    }

    #[test]
    fn entities_count_as_one_glyph() {
        let text = "&lt;".repeat(45);
        assert_eq!(measure(&format!("<p>{text}</p>")), 24.0);
    }

    #[test]
    fn display_math_gets_extra_room() {
        let body = TypesetBody {
            html: "<p><math display=\"block\"><mi>x</mi></math></p>".into(),
            display_blocks: 1,
            ..Default::default()
        };
        let height = HeuristicLayout::default().measure(&body, 16.0, SettlePhase::Second);
        assert_eq!(height, 24.0 + 24.0);
    }
}
