use crate::theme::RenderOptions;

/// Stylesheet for the document shell.
///
/// Colors are resolved (and sanitised) through [`RenderOptions::resolve_colors`].
pub fn generate_style(options: &RenderOptions) -> String {
    let colors = options.resolve_colors();
    let font_size = options.effective_font_size();
    let color_scheme = if options.dark_mode { "dark" } else { "light" };

    format!(
        r#"*, *::before, *::after {{
    box-sizing: border-box;
}}

:root {{
    color-scheme: {color_scheme};
    --color-text: {text};
    --color-accent: {accent};
    --color-base: {background};
    --color-surface: {surface};
    --font-size: {font_size}px;
}}

html, body {{
    margin: 0;
    padding: 0;
    background: var(--color-base);
}}

body {{
    font-family: system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    font-size: var(--font-size);
    line-height: 1.5;
    color: var(--color-text);
    word-wrap: break-word;
    overflow-wrap: break-word;
    -webkit-text-size-adjust: 100%;
}}

#content {{
    padding: 0;
}}

p {{
    margin: 0 0 0.5em 0;
}}

p:last-child {{
    margin-bottom: 0;
}}

strong {{
    color: var(--color-accent);
}}

code {{
    font-family: ui-monospace, 'Cascadia Code', 'Roboto Mono', Consolas, monospace;
    background: var(--color-surface);
    padding: 0.125em 0.25em;
    border-radius: 4px;
    font-size: 0.9em;
}}

mjx-container[display="true"] {{
    overflow-x: auto;
    overflow-y: hidden;
    margin: 0.5em 0 !important;
}}
"#,
        text = colors.text,
        accent = colors.accent,
        background = colors.background,
        surface = colors.surface,
    )
}
