//! Memoization for assembled documents.
//!
//! A document is a pure function of its content and display parameters, so
//! repeated renders of the same question stem reuse the first result.

use std::time::Duration;

use mini_moka_wasm::sync::Cache;
use smol_str::SmolStr;

use crate::pipeline::{RenderedDocument, render_document};
use crate::theme::RenderOptions;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocumentKey {
    content: String,
    font_size_bits: u32,
    text_color: Option<SmolStr>,
    accent_color: Option<SmolStr>,
    dark_mode: bool,
}

impl DocumentKey {
    fn new(content: &str, options: &RenderOptions) -> Self {
        Self {
            content: content.to_owned(),
            font_size_bits: options.font_size.to_bits(),
            text_color: options.text_color.clone(),
            accent_color: options.accent_color.clone(),
            dark_mode: options.dark_mode,
        }
    }
}

/// Bounded, thread-safe cache of rendered documents.
#[derive(Clone)]
pub struct DocumentCache {
    cache: Cache<DocumentKey, RenderedDocument>,
}

impl DocumentCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Return the cached document for these inputs, rendering it on a miss.
    pub fn get_or_render(&self, content: &str, options: &RenderOptions) -> RenderedDocument {
        let key = DocumentKey::new(content, options);
        if let Some(doc) = self.cache.get(&key) {
            tracing::trace!(target: "texframe::render", "document cache hit");
            return doc;
        }
        let doc = render_document(content, options);
        self.cache.insert(key, doc.clone());
        doc
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        // 128 documents, ten minutes.
        Self::new(128, Duration::from_secs(600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_share_a_document() {
        let cache = DocumentCache::default();
        let options = RenderOptions::default();
        let first = cache.get_or_render("$x$", &options);
        let second = cache.get_or_render("$x$", &options);
        assert!(std::ptr::eq(first.html(), second.html()));
    }

    #[test]
    fn expired_entries_are_rendered_again() {
        let cache = DocumentCache::new(16, Duration::from_millis(5));
        let options = RenderOptions::default();
        let first = cache.get_or_render("$x$", &options);
        std::thread::sleep(Duration::from_millis(50));
        let second = cache.get_or_render("$x$", &options);
        assert_eq!(first, second);
        assert!(!std::ptr::eq(first.html(), second.html()));
    }

    #[test]
    fn display_parameters_are_part_of_the_key() {
        let cache = DocumentCache::default();
        let light = cache.get_or_render("$x$", &RenderOptions::default());
        let dark = cache.get_or_render(
            "$x$",
            &RenderOptions {
                dark_mode: true,
                ..Default::default()
            },
        );
        assert_ne!(light.html(), dark.html());
    }
}
