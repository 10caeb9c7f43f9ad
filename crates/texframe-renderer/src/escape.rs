//! HTML escaping for prose that survived math extraction.

use pulldown_cmark_escape::escape_html_body_text;

/// Escape `&`, `<` and `>`. Nothing else is altered.
///
/// Must only ever see text whose math has already been replaced by
/// sentinels; math bodies are restored verbatim afterwards.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    // Writing into a String is infallible.
    let _ = escape_html_body_text(&mut out, text);
    out
}
