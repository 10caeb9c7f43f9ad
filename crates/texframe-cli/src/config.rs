//! `config.kdl` loading.
//!
//! ```kdl
//! font-size 18
//! text-color "#2b303b"
//! accent-color "#286983"
//! dark-mode false
//! min-height 40
//! viewport-width 390
//! load-delay-ms 300
//! settle-delays-ms 100 600
//! ```
//!
//! Every node is optional; anything missing keeps its default.

use std::path::{Path, PathBuf};

use kdl::{KdlDocument, KdlValue};
use miette::{IntoDiagnostic, Result, WrapErr};
use smol_str::SmolStr;
use texframe_renderer::RenderOptions;
use texframe_sandbox::BridgeConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliConfig {
    pub render: RenderOptions,
    pub bridge: BridgeConfig,
}

impl CliConfig {
    /// Load from `path`, or from the default location if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let content = std::fs::read_to_string(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let doc: KdlDocument = content
            .parse::<KdlDocument>()
            .into_diagnostic()
            .wrap_err("parsing config.kdl")?;
        let mut config = Self::default();

        if let Some(size) = first(&doc, "font-size").and_then(number) {
            config.render.font_size = size as f32;
        }
        if let Some(color) = first(&doc, "text-color").and_then(KdlValue::as_string) {
            config.render.text_color = Some(SmolStr::new(color));
        }
        if let Some(color) = first(&doc, "accent-color").and_then(KdlValue::as_string) {
            config.render.accent_color = Some(SmolStr::new(color));
        }
        if let Some(dark) = first(&doc, "dark-mode").and_then(KdlValue::as_bool) {
            config.render.dark_mode = dark;
        }

        if let Some(min) = first(&doc, "min-height").and_then(KdlValue::as_i64) {
            config.bridge.min_height = to_u32(min);
        }
        if let Some(width) = first(&doc, "viewport-width").and_then(number) {
            config.bridge.viewport_width = width as f32;
        }
        if let Some(delay) = first(&doc, "load-delay-ms").and_then(KdlValue::as_i64) {
            config.bridge.load_delay_ms = delay.max(0) as u64;
        }
        if let Some(node) = doc.get("settle-delays-ms") {
            let delays: Vec<u64> = node
                .entries()
                .iter()
                .filter_map(|e| e.value().as_i64())
                .map(|d| d.max(0) as u64)
                .collect();
            match delays.as_slice() {
                [first, second] => config.bridge.settle_delays_ms = [*first, *second],
                _ => {
                    return Err(miette::miette!(
                        "settle-delays-ms takes exactly two values, got {}",
                        delays.len()
                    ));
                }
            }
        }

        Ok(config)
    }
}

fn first<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)?.entries().first().map(|e| e.value())
}

fn number(value: &KdlValue) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}

fn default_config_path() -> Option<PathBuf> {
    Some(dirs::config_dir()?.join("texframe").join("config.kdl"))
}
