//! texframe renderer
//!
//! Turns a string mixing prose, a small markdown subset and LaTeX math into a
//! standalone HTML document that a sandboxed surface can typeset and measure.
//!
//! The pipeline runs in a fixed order:
//!
//! 1. [`scan::extract_math`] swaps every math span for a sentinel
//! 2. [`escape::escape_html`] escapes what is left
//! 3. [`restore::restore_math`] puts the untouched math back in canonical delimiters
//! 4. [`markup::transform`] applies bold/italic/code/paragraph markup to the prose
//! 5. [`base_html::assemble`] wraps the body in the document shell
//!
//! [`pipeline::render_document`] runs all of it and never fails.

use std::time::Duration;

pub mod base_html;
#[cfg(all(feature = "cache", not(target_arch = "wasm32")))]
pub mod cache;
pub mod css;
pub mod escape;
pub mod markup;
pub mod pipeline;
pub mod restore;
pub mod scan;
pub mod theme;

pub use pipeline::{RenderedDocument, render_document};
pub use scan::{MathKind, MathSpan, PlaceholderTable};
pub use theme::RenderOptions;

/// Delay between the document loading and the first typesetting pass.
pub const LOAD_DELAY: Duration = Duration::from_millis(300);

/// The two one-shot height measurements after typesetting. Layout can keep
/// moving after the first one while web fonts finish loading.
pub const SETTLE_DELAYS: [Duration; 2] = [Duration::from_millis(100), Duration::from_millis(600)];

#[derive(thiserror::Error, Debug, miette::Diagnostic)]
pub enum RenderError {
    #[error("sentinel for {kind:?} math span #{index} was not found during restoration")]
    #[diagnostic(
        code(texframe::render::missing_sentinel),
        help("the scanner and the placeholder table disagree; this is a pipeline bug")
    )]
    MissingSentinel { index: usize, kind: MathKind },
}
