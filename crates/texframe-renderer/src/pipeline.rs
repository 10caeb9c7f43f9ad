use std::sync::Arc;

use crate::RenderError;
use crate::base_html::{GENERATION_SLOT, assemble, assemble_plain};
use crate::escape::escape_html;
use crate::markup;
use crate::restore::{Restored, restore_math};
use crate::scan::{PlaceholderTable, extract_math};
use crate::theme::RenderOptions;

/// A fully assembled document. Immutable and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    html: Arc<str>,
    math_spans: usize,
    typeset: bool,
}

impl RenderedDocument {
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Number of math spans restored into the body.
    pub fn math_spans(&self) -> usize {
        self.math_spans
    }

    /// False for the plain fallback document, which carries no typesetting.
    pub fn is_typeset(&self) -> bool {
        self.typeset
    }

    /// The document as loaded for one render generation. The bootstrap script
    /// tags every height report with this id.
    pub fn for_generation(&self, generation: u64) -> String {
        self.html.replacen(GENERATION_SLOT, &generation.to_string(), 1)
    }
}

/// Run the whole pipeline: extract, escape, restore, mark up, assemble.
///
/// Never fails. If restoration loses a span the content is rendered as
/// plain escaped text without typesetting, and the anomaly is logged.
pub fn render_document(content: &str, options: &RenderOptions) -> RenderedDocument {
    render_with(content, options, restore_math)
}

/// `render_document` with the restoration step supplied by the caller.
pub(crate) fn render_with<R>(
    content: &str,
    options: &RenderOptions,
    restore: R,
) -> RenderedDocument
where
    R: FnOnce(&str, PlaceholderTable) -> Result<Restored, RenderError>,
{
    let (partial, table) = extract_math(content);
    let math_spans = table.len();
    tracing::debug!(
        target: "texframe::render",
        len = content.len(),
        math_spans,
        "rendering document"
    );
    let escaped = escape_html(&partial);

    match restore(&escaped, table) {
        Ok(restored) => {
            let body = markup::transform(&restored);
            RenderedDocument {
                html: assemble(&body, options).into(),
                math_spans,
                typeset: true,
            }
        }
        Err(err) => {
            tracing::warn!(
                target: "texframe::render",
                error = %err,
                "math restoration failed, rendering untypeset fallback"
            );
            fallback_document(content, options)
        }
    }
}

/// The whole input escaped, with line breaks kept and no typesetting.
pub fn fallback_document(content: &str, options: &RenderOptions) -> RenderedDocument {
    let escaped = escape_html(content).replace("\r\n", "\n");
    let body = format!(
        "<p>{}</p>",
        escaped.replace("\n\n", "</p><p>").replace('\n', "<br>")
    );
    RenderedDocument {
        html: assemble_plain(&body, options).into(),
        math_spans: 0,
        typeset: false,
    }
}

/// Extract just the `<main>` body of an assembled document.
pub fn document_body(html: &str) -> Option<&str> {
    let open = html.find("<main id=\"content\"")?;
    let start = open + html[open..].find('>')? + 1;
    let end = html.rfind("</main>")?;
    (start <= end).then(|| &html[start..end])
}
