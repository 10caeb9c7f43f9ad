//! The standalone document shell handed to the sandbox.
//!
//! The shell loads MathJax, and a small bootstrap script waits for it, runs
//! one guarded typeset pass over the body, then posts the rendered height
//! back to the host twice. Each post is a JSON object
//! `{"height": <px>, "generation": <id>}`.

use crate::css::generate_style;
use crate::theme::RenderOptions;
use crate::{LOAD_DELAY, SETTLE_DELAYS};

/// Placeholder on the root element, filled per load by
/// [`RenderedDocument::for_generation`](crate::RenderedDocument::for_generation).
pub const GENERATION_SLOT: &str = "__TEXFRAME_GENERATION__";

pub const MATHJAX_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Wrap a transformed body in a typesetting document.
///
/// Deterministic in `body` and `options`; safe to memoize.
pub fn assemble(body: &str, options: &RenderOptions) -> String {
    shell(body, options, true)
}

/// Wrap a body in a document that never typesets. Used when the pipeline
/// had to fall back to plain escaped text.
pub fn assemble_plain(body: &str, options: &RenderOptions) -> String {
    shell(body, options, false)
}

fn shell(body: &str, options: &RenderOptions, typeset: bool) -> String {
    let style = generate_style(options);
    let font_size = options.effective_font_size();
    let mathjax = if typeset { mathjax_head() } else { String::new() };
    let bootstrap = bootstrap_script(typeset);

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-generation="{GENERATION_SLOT}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no">
<style>
{style}</style>
{mathjax}</head>
<body>
<main id="content" data-font-size="{font_size}" data-typeset="{typeset}">{body}</main>
<script>
{bootstrap}</script>
</body>
</html>
"#
    )
}

fn mathjax_head() -> String {
    format!(
        r#"<script>
window.MathJax = {{
  tex: {{ inlineMath: [['$', '$']], displayMath: [['$$', '$$']], processEscapes: false }},
  options: {{ skipHtmlTags: ['script', 'noscript', 'style', 'textarea', 'pre', 'code'] }},
  startup: {{ typeset: false }}
}};
</script>
<script async src="{MATHJAX_URL}"></script>
"#
    )
}

fn bootstrap_script(typeset: bool) -> String {
    let load_ms = LOAD_DELAY.as_millis();
    let [first_ms, second_ms] = SETTLE_DELAYS.map(|d| d.as_millis());

    format!(
        r#"(function () {{
  var generation = Number(document.documentElement.getAttribute('data-generation'));
  function post(message) {{
    if (window.ReactNativeWebView) {{
      window.ReactNativeWebView.postMessage(message);
    }} else if (window.parent && window.parent !== window) {{
      window.parent.postMessage(message, '*');
    }}
  }}
  function measure() {{
    var height = Math.ceil(Math.max(
      document.body.scrollHeight,
      document.documentElement.scrollHeight
    ));
    post(JSON.stringify({{ height: height, generation: generation }}));
  }}
  function settle() {{
    setTimeout(measure, {first_ms});
    setTimeout(measure, {second_ms});
  }}
  function scan() {{
    try {{
      if ({typeset} && window.MathJax && typeof window.MathJax.typesetPromise === 'function') {{
        window.MathJax.typesetPromise([document.getElementById('content')])
          .catch(function (err) {{ console.warn('typeset failed', err); }})
          .then(settle);
        return;
      }}
    }} catch (err) {{
      console.warn('typeset failed', err);
    }}
    settle();
  }}
  setTimeout(scan, {load_ms});
}})();
"#
    )
}
