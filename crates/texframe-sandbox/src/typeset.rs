//! The "scan and typeset" pass of the headless sandbox.
//!
//! Finds every canonical `$$…$$` and `$…$` span in a document body and
//! replaces it with MathML. Each span is typeset on its own: a span that
//! fails, or panics inside the parser, keeps its literal source and the
//! rest of the body carries on.

use std::panic;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::math::{MathResult, render_math};

static CANONICAL_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$(.*?)\$\$|\$([^\$\n]*)\$").unwrap());

/// A document body after typesetting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypesetBody {
    pub html: String,
    pub display_blocks: usize,
    pub inline_spans: usize,
    /// Spans left as source because typesetting them failed.
    pub failures: usize,
}

impl TypesetBody {
    /// A body that is measured as-is, for documents that never typeset.
    pub fn untypeset(body: &str) -> Self {
        Self {
            html: body.to_owned(),
            ..Default::default()
        }
    }
}

pub fn typeset_body(body: &str) -> TypesetBody {
    let mut display_blocks = 0;
    let mut inline_spans = 0;
    let mut failures = 0;

    let html = CANONICAL_MATH_RE
        .replace_all(body, |caps: &Captures<'_>| {
            let (latex, display) = match (caps.get(1), caps.get(2)) {
                (Some(m), _) => (m.as_str(), true),
                (None, Some(m)) => (m.as_str(), false),
                (None, None) => return caps[0].to_owned(),
            };

            match panic::catch_unwind(|| render_math(latex, display)) {
                Ok(MathResult::Success(mathml)) => {
                    if display {
                        display_blocks += 1;
                    } else {
                        inline_spans += 1;
                    }
                    mathml
                }
                Ok(MathResult::Error { message }) => {
                    tracing::debug!(
                        target: "texframe::sandbox",
                        latex,
                        %message,
                        "typesetting failed, keeping source"
                    );
                    failures += 1;
                    caps[0].to_owned()
                }
                Err(_) => {
                    tracing::debug!(
                        target: "texframe::sandbox",
                        latex,
                        "typesetter panicked, keeping source"
                    );
                    failures += 1;
                    caps[0].to_owned()
                }
            }
        })
        .into_owned();

    TypesetBody {
        html,
        display_blocks,
        inline_spans,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typesets_inline_and_display_spans() {
        let out = typeset_body("<p>Solve $x^2=4$ then state $$x=\\pm2$$.</p>");
        assert_eq!(out.inline_spans, 1);
        assert_eq!(out.display_blocks, 1);
        assert_eq!(out.failures, 0);
        assert!(!out.html.contains('$'));
        assert!(out.html.contains("<math"));
    }

    #[test]
    fn one_bad_span_does_not_abort_the_scan() {
        let out = typeset_body("<p>$\\frac{a$ and $b$</p>");
        assert_eq!(out.failures, 1);
        assert_eq!(out.inline_spans, 1);
        assert!(out.html.contains("$\\frac{a$"));
    }

    #[test]
    fn prose_without_math_is_unchanged() {
        let out = typeset_body("<p>Hello world</p>");
        assert_eq!(out, TypesetBody::untypeset("<p>Hello world</p>"));
    }
}
