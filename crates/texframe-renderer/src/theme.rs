use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

// Hex, functional notation (rgb/hsl/...) or a bare keyword. Anything that
// could close the style block or the declaration is rejected.
static CSS_COLOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#[0-9a-fA-F]{3,8}|[a-zA-Z]+\([0-9a-zA-Z.,%/ +-]*\)|[a-zA-Z]+)$").unwrap()
});

/// Display parameters for one rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Base font size in CSS pixels.
    pub font_size: f32,
    /// Body text color. `None` uses the palette default.
    pub text_color: Option<SmolStr>,
    /// Accent color for links and code. `None` uses the palette default.
    pub accent_color: Option<SmolStr>,
    pub dark_mode: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            text_color: None,
            accent_color: None,
            dark_mode: false,
        }
    }
}

impl RenderOptions {
    /// Font size used in the stylesheet; non-finite or non-positive sizes fall back to 16px.
    pub fn effective_font_size(&self) -> f32 {
        if self.font_size.is_finite() && self.font_size > 0.0 {
            self.font_size
        } else {
            16.0
        }
    }

    /// Resolve caller colors against the palette for the current mode.
    pub fn resolve_colors(&self) -> ColorScheme {
        let palette = if self.dark_mode {
            ColorScheme::dark()
        } else {
            ColorScheme::light()
        };
        ColorScheme {
            text: pick_color(self.text_color.as_ref(), palette.text),
            accent: pick_color(self.accent_color.as_ref(), palette.accent),
            background: palette.background,
            surface: palette.surface,
        }
    }
}

fn pick_color(requested: Option<&SmolStr>, fallback: SmolStr) -> SmolStr {
    match requested {
        Some(color) if is_css_color(color) => color.clone(),
        Some(color) => {
            tracing::warn!(
                target: "texframe::render",
                color = %color,
                "rejecting unsafe color, using palette default"
            );
            fallback
        }
        None => fallback,
    }
}

pub fn is_css_color(color: &str) -> bool {
    CSS_COLOR_RE.is_match(color.trim())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorScheme {
    pub text: SmolStr,
    pub accent: SmolStr,
    pub background: SmolStr,
    pub surface: SmolStr,
}

impl ColorScheme {
    pub fn light() -> Self {
        Self {
            text: SmolStr::new("#2b303b"),
            accent: SmolStr::new("#286983"),
            background: SmolStr::new("transparent"),
            surface: SmolStr::new("#f2e9e1"),
        }
    }

    pub fn dark() -> Self {
        Self {
            text: SmolStr::new("#e0def4"),
            accent: SmolStr::new("#9ccfd8"),
            background: SmolStr::new("transparent"),
            surface: SmolStr::new("#26233a"),
        }
    }
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::light()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_color_notations() {
        for color in ["#fff", "#1a2b3c", "#1a2b3c80", "rebeccapurple", "rgb(1, 2, 3)", "hsl(120 50% 50% / 0.5)"] {
            assert!(is_css_color(color), "{color}");
        }
    }

    #[test]
    fn rejects_style_breakouts() {
        for color in ["red;}</style><script>", "url(x)}", "#fff;", "red blue", ""] {
            assert!(!is_css_color(color), "{color}");
        }
    }

    #[test]
    fn invalid_colors_fall_back_to_palette() {
        let options = RenderOptions {
            text_color: Some("red;}".into()),
            accent_color: Some("#00ff00".into()),
            dark_mode: true,
            ..Default::default()
        };
        let colors = options.resolve_colors();
        assert_eq!(colors.text, ColorScheme::dark().text);
        assert_eq!(colors.accent, "#00ff00");
    }

    #[test]
    fn bogus_font_size_falls_back() {
        let options = RenderOptions {
            font_size: f32::NAN,
            ..Default::default()
        };
        assert_eq!(options.effective_font_size(), 16.0);
    }
}
