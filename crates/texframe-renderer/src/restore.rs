//! Put extracted math back into escaped text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::RenderError;
use crate::scan::{MathKind, PlaceholderTable};

static SENTINEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x{E000}([DI])(\d+)\x{E001}").unwrap());

/// Escaped prose with the original math restored in canonical delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub text: String,
    /// Byte ranges of restored math (delimiters included), in ascending order.
    pub math: Vec<Range<usize>>,
}

impl Restored {
    /// Split into alternating prose and math segments, in document order.
    pub fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        let mut out = Vec::with_capacity(self.math.len() * 2 + 1);
        let mut cursor = 0;
        for range in &self.math {
            if range.start > cursor {
                out.push(Segment::Prose(&self.text[cursor..range.start]));
            }
            out.push(Segment::Math(&self.text[range.clone()]));
            cursor = range.end;
        }
        if cursor < self.text.len() {
            out.push(Segment::Prose(&self.text[cursor..]));
        }
        out.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Prose(&'a str),
    Math(&'a str),
}

/// Replace each sentinel with its span's body, verbatim and unescaped.
///
/// Every span in the table has to be restored exactly once. A span whose
/// sentinel cannot be found means the scanner and the table disagree, and
/// the whole run fails rather than losing content silently.
pub fn restore_math(escaped: &str, table: PlaceholderTable) -> Result<Restored, RenderError> {
    let mut restored = vec![false; table.len()];
    let mut text = String::with_capacity(escaped.len());
    let mut math = Vec::with_capacity(table.len());
    let mut cursor = 0;

    for caps in SENTINEL_RE.captures_iter(escaped) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        text.push_str(&escaped[cursor..whole.start()]);
        cursor = whole.end();

        let kind = MathKind::from_tag(&caps[1]);
        let span = caps[2]
            .parse::<usize>()
            .ok()
            .and_then(|index| table.get(index))
            .filter(|span| Some(span.kind) == kind && !restored[span.index]);

        match span {
            Some(span) => {
                restored[span.index] = true;
                let start = text.len();
                text.push_str(&span.wrapped());
                math.push(start..text.len());
            }
            None => text.push_str(whole.as_str()),
        }
    }
    text.push_str(&escaped[cursor..]);

    if let Some(index) = restored.iter().position(|done| !done) {
        let kind = table.get(index).map_or(MathKind::Inline, |s| s.kind);
        return Err(RenderError::MissingSentinel { index, kind });
    }

    Ok(Restored { text, math })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escape::escape_html;
    use crate::scan::extract_math;

    fn run(raw: &str) -> Restored {
        let (partial, table) = extract_math(raw);
        restore_math(&escape_html(&partial), table).unwrap()
    }

    #[test]
    fn mixed_delimiters_keep_relative_order() {
        let restored = run(r"Solve \(x^2=4\) then state $$x=\pm2$$.");
        assert_eq!(restored.text, r"Solve $x^2=4$ then state $$x=\pm2$$.");
        assert_eq!(restored.math.len(), 2);
        assert_eq!(&restored.text[restored.math[0].clone()], "$x^2=4$");
    }

    #[test]
    fn math_bodies_are_never_escaped() {
        let restored = run("<script>alert(1)</script> and $a<b$");
        assert_eq!(
            restored.text,
            "&lt;script&gt;alert(1)&lt;/script&gt; and $a<b$"
        );
    }

    #[test]
    fn ampersands_in_math_survive() {
        let restored = run(r"\[ a & b \\ c & d \] & more");
        assert_eq!(restored.text, r"$$a & b \\ c & d$$ &amp; more");
    }

    #[test]
    fn missing_sentinel_is_an_error() {
        let (_, table) = extract_math("$x$");
        let err = restore_math("no sentinel here", table).unwrap_err();
        assert!(matches!(
            err,
            RenderError::MissingSentinel {
                index: 0,
                kind: MathKind::Inline
            }
        ));
    }

    #[test]
    fn duplicate_sentinel_restores_only_the_first() {
        let (partial, table) = extract_math("$x$");
        let doubled = format!("{partial} {partial}");
        let restored = restore_math(&doubled, table).unwrap();
        assert!(restored.text.starts_with("$x$ \u{E000}I0\u{E001}"));
        assert_eq!(restored.math, vec![0..3]);
    }

    #[test]
    fn segments_alternate_between_prose_and_math() {
        let restored = run("a $b$ c");
        let segments: Vec<_> = restored.segments().collect();
        assert_eq!(
            segments,
            vec![
                Segment::Prose("a "),
                Segment::Math("$b$"),
                Segment::Prose(" c")
            ]
        );
    }
}
