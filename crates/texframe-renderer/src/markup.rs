//! The light inline markup pass.
//!
//! Not a markdown parser: `**bold**`, `*italic*`, `` `code` ``, blank-line
//! paragraphs and bare-newline line breaks, each an independent substitution
//! with no nesting or escaping.
//!
//! Restored math is swapped for an opaque token while the substitutions run,
//! so a marker pair may wrap math but never reach inside it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::restore::{Restored, Segment};

static BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^\n]+?)\*\*").unwrap());
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\n]+?)\*").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`\n]+?)`").unwrap());
static MATH_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}M(\d+)\x{E001}").unwrap());

/// Apply inline markup to the prose of `restored` and wrap the result in a paragraph.
pub fn transform(restored: &Restored) -> String {
    let mut masked = String::with_capacity(restored.text.len());
    let mut math = Vec::with_capacity(restored.math.len());
    for segment in restored.segments() {
        match segment {
            Segment::Prose(prose) => masked.push_str(prose),
            Segment::Math(body) => {
                masked.push_str(&format!("\u{E000}M{}\u{E001}", math.len()));
                math.push(body);
            }
        }
    }

    let marked = transform_prose(&masked);
    let body = MATH_TOKEN_RE.replace_all(&marked, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|index| math.get(index))
            .map_or_else(|| caps[0].to_owned(), |body| (*body).to_owned())
    });

    format!("<p>{body}</p>")
}

fn transform_prose(prose: &str) -> String {
    let text = prose.replace("\r\n", "\n");
    let text = BOLD_RE.replace_all(&text, "<strong>$1</strong>");
    let text = ITALIC_RE.replace_all(&text, "<em>$1</em>");
    let text = CODE_RE.replace_all(&text, "<code>$1</code>");
    text.replace("\n\n", "</p><p>").replace('\n', "<br>")
}
