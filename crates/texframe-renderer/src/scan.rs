//! Math delimiter scanning and the placeholder table.
//!
//! Math spans are pulled out of the raw text before anything else touches it,
//! and each one is replaced by a sentinel. Four passes run in a fixed order:
//!
//! | pass | delimiters      | kind    | body edges |
//! |------|-----------------|---------|------------|
//! | 1    | `\[ … \]`       | display | trimmed    |
//! | 2    | `$$ … $$`       | display | kept       |
//! | 3    | `\( … \)`       | inline  | trimmed    |
//! | 4    | `$ … $` (1 line)| inline  | kept       |
//!
//! `$$` has to be consumed before `$`, otherwise every display block is split
//! into two bogus inline spans.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Opens a sentinel. Private use area, so it cannot clash with delimiters or entities.
pub const SENTINEL_OPEN: char = '\u{E000}';
/// Closes a sentinel.
pub const SENTINEL_CLOSE: char = '\u{E001}';

// Bodies never cross an earlier sentinel, so a later pass cannot swallow an
// already extracted span.
static DISPLAY_BRACKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\[([^\x{E000}]*?)\\\]").unwrap());
static DISPLAY_DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$([^\x{E000}]*?)\$\$").unwrap());
static INLINE_PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\\\(([^\x{E000}]*?)\\\)").unwrap());
static INLINE_DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([^\$\n\x{E000}]*)\$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MathKind {
    Display,
    Inline,
}

impl MathKind {
    fn tag(self) -> char {
        match self {
            MathKind::Display => 'D',
            MathKind::Inline => 'I',
        }
    }

    pub(crate) fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "D" => Some(MathKind::Display),
            "I" => Some(MathKind::Inline),
            _ => None,
        }
    }

    /// Delimiter used when the span is put back into the text.
    pub fn canonical_delimiter(self) -> &'static str {
        match self {
            MathKind::Display => "$$",
            MathKind::Inline => "$",
        }
    }
}

/// One extracted piece of math source, exactly as it appeared in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathSpan {
    pub index: usize,
    pub kind: MathKind,
    pub body: String,
}

impl MathSpan {
    pub fn sentinel(&self) -> Sentinel {
        Sentinel {
            kind: self.kind,
            index: self.index,
        }
    }

    /// The body wrapped in its canonical delimiter.
    pub fn wrapped(&self) -> String {
        let delim = self.kind.canonical_delimiter();
        format!("{delim}{}{delim}", self.body)
    }
}

/// Placeholder standing in for a math span between extraction and restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sentinel {
    pub kind: MathKind,
    pub index: usize,
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SENTINEL_OPEN}{}{}{SENTINEL_CLOSE}",
            self.kind.tag(),
            self.index
        )
    }
}

/// Append-only list of the spans extracted from a single input.
///
/// Indices are dense, zero based and follow extraction order. A table belongs
/// to one pipeline run and is consumed by restoration.
#[derive(Debug, Default)]
pub struct PlaceholderTable {
    spans: Vec<MathSpan>,
}

impl PlaceholderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a span and return its index.
    pub fn push(&mut self, kind: MathKind, body: impl Into<String>) -> usize {
        let index = self.spans.len();
        self.spans.push(MathSpan {
            index,
            kind,
            body: body.into(),
        });
        index
    }

    pub fn get(&self, index: usize) -> Option<&MathSpan> {
        self.spans.get(index)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MathSpan> {
        self.spans.iter()
    }

    pub fn into_spans(self) -> Vec<MathSpan> {
        self.spans
    }
}

/// Replace every math span in `raw` with a sentinel.
///
/// Unterminated delimiters are left in place as literal text.
pub fn extract_math(raw: &str) -> (String, PlaceholderTable) {
    let mut table = PlaceholderTable::new();

    // Nothing in the input may pass for a sentinel.
    let mut partial: String = raw
        .chars()
        .map(|c| match c {
            SENTINEL_OPEN | SENTINEL_CLOSE => char::REPLACEMENT_CHARACTER,
            c => c,
        })
        .collect();

    let passes: [(&Regex, MathKind, bool); 4] = [
        (&DISPLAY_BRACKET_RE, MathKind::Display, true),
        (&DISPLAY_DOLLAR_RE, MathKind::Display, false),
        (&INLINE_PAREN_RE, MathKind::Inline, true),
        (&INLINE_DOLLAR_RE, MathKind::Inline, false),
    ];

    for (re, kind, trim) in passes {
        partial = extract_pass(&partial, re, kind, trim, &mut table);
    }

    tracing::trace!(
        target: "texframe::render",
        spans = table.len(),
        "extracted math spans"
    );

    (partial, table)
}

fn extract_pass(
    text: &str,
    re: &Regex,
    kind: MathKind,
    trim: bool,
    table: &mut PlaceholderTable,
) -> String {
    re.replace_all(text, |caps: &Captures<'_>| {
        let body = caps.get(1).map_or("", |m| m.as_str());
        let body = if trim { body.trim() } else { body };
        let index = table.push(kind, body);
        Sentinel { kind, index }.to_string()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bodies(table: &PlaceholderTable) -> Vec<(MathKind, &str)> {
        table.iter().map(|s| (s.kind, s.body.as_str())).collect()
    }

    #[test]
    fn plain_text_has_no_spans() {
        let (partial, table) = extract_math("Hello world");
        assert_eq!(partial, "Hello world");
        assert!(table.is_empty());
    }

    #[test]
    fn double_dollar_is_not_split_into_inline_spans() {
        let (_, table) = extract_math("$$x$$ and $y$");
        assert_eq!(
            bodies(&table),
            vec![(MathKind::Display, "x"), (MathKind::Inline, "y")]
        );
    }

    #[test]
    fn display_spans_are_indexed_before_inline_spans() {
        let (partial, table) = extract_math(r"Solve \(x^2=4\) then state $$x=\pm2$$.");
        assert_eq!(
            bodies(&table),
            vec![(MathKind::Display, r"x=\pm2"), (MathKind::Inline, "x^2=4")]
        );
        let display = Sentinel { kind: MathKind::Display, index: 0 }.to_string();
        let inline = Sentinel { kind: MathKind::Inline, index: 1 }.to_string();
        assert_eq!(partial, format!("Solve {inline} then state {display}."));
    }

    #[test]
    fn brace_style_bodies_are_trimmed() {
        let (_, table) = extract_math(r"\[  a + b  \] and \( c \)");
        assert_eq!(
            bodies(&table),
            vec![(MathKind::Display, "a + b"), (MathKind::Inline, "c")]
        );
    }

    #[test]
    fn dollar_style_bodies_keep_their_whitespace() {
        let (_, table) = extract_math("$$ a $$ and $ b $");
        assert_eq!(
            bodies(&table),
            vec![(MathKind::Display, " a "), (MathKind::Inline, " b ")]
        );
    }

    #[test]
    fn unterminated_delimiters_stay_literal() {
        let input = r"cost is $5 and \[ never closed";
        let (partial, table) = extract_math(input);
        assert_eq!(partial, input);
        assert!(table.is_empty());
    }

    #[test]
    fn inline_dollar_does_not_span_lines() {
        let (partial, table) = extract_math("$a\nb$");
        assert_eq!(partial, "$a\nb$");
        assert!(table.is_empty());
    }

    #[test]
    fn display_dollar_may_span_lines() {
        let (_, table) = extract_math("$$\ny = mx + b\n$$");
        assert_eq!(bodies(&table), vec![(MathKind::Display, "\ny = mx + b\n")]);
    }

    #[test]
    fn empty_bodies_are_legal() {
        let (_, table) = extract_math(r"\[\] and \(\)");
        assert_eq!(
            bodies(&table),
            vec![(MathKind::Display, ""), (MathKind::Inline, "")]
        );
    }

    #[test]
    fn greedy_to_next_closer_not_brace_aware() {
        let (_, table) = extract_math(r"\[ \text{\]} \]");
        assert_eq!(bodies(&table), vec![(MathKind::Display, r"\text{")]);
    }

    #[test]
    fn later_passes_do_not_swallow_earlier_sentinels() {
        // The inline pair would enclose the display sentinel; it is left literal.
        let (partial, table) = extract_math(r"$a \[x\] b$");
        assert_eq!(bodies(&table), vec![(MathKind::Display, "x")]);
        assert!(partial.starts_with("$a "));
        assert!(partial.ends_with(" b$"));
    }

    #[test]
    fn forged_sentinels_are_neutralised() {
        let (partial, table) = extract_math("\u{E000}D0\u{E001}");
        assert!(table.is_empty());
        assert_eq!(partial, "\u{FFFD}D0\u{FFFD}");
    }

    #[test]
    fn indices_are_dense_and_ordered() {
        let (_, table) = extract_math(r"$a$ $b$ \(c\) $$d$$ \[e\]");
        let indices: Vec<usize> = table.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            bodies(&table),
            vec![
                (MathKind::Display, "e"),
                (MathKind::Display, "d"),
                (MathKind::Inline, "c"),
                (MathKind::Inline, "a"),
                (MathKind::Inline, "b"),
            ]
        );
    }
}
