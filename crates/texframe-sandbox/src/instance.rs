//! One headless sandbox instance: `Idle → Loaded → Scanning → Settled`.
//!
//! Mirrors what the document's bootstrap script does in a real webview. It
//! reads everything it needs from the document (generation, font size,
//! whether to typeset), waits for the typesetter to "load", runs one guarded
//! typeset pass, then measures and reports twice on two one-shot timers.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, sleep_until};

use texframe_renderer::pipeline::document_body;

use crate::config::BridgeConfig;
use crate::layout::{LayoutEngine, SettlePhase};
use crate::typeset::{TypesetBody, typeset_body};
use crate::{Generation, HeightReport};

static GENERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<html[^>]*\bdata-generation="(\d+)""#).unwrap());
static CONTENT_ATTRS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<main id="content" data-font-size="([0-9.]+)" data-typeset="(true|false)">"#)
        .unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxState {
    Idle,
    Loaded,
    Scanning,
    Settled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceTiming {
    pub load_delay: Duration,
    pub settle_delays: [Duration; 2],
}

impl From<&BridgeConfig> for InstanceTiming {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            load_delay: config.load_delay(),
            settle_delays: config.settle_delays(),
        }
    }
}

/// What the instance can read back out of a loaded document.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub generation: Option<Generation>,
    pub font_size: f32,
    pub typeset: bool,
    pub body: String,
}

impl LoadedDocument {
    pub fn parse(html: &str) -> Self {
        let generation = GENERATION_RE
            .captures(html)
            .and_then(|caps| caps[1].parse::<Generation>().ok());
        let (font_size, typeset) = CONTENT_ATTRS_RE
            .captures(html)
            .map(|caps| (caps[1].parse::<f32>().unwrap_or(16.0), &caps[2] == "true"))
            .unwrap_or((16.0, false));
        let body = document_body(html).unwrap_or_default().to_owned();

        Self {
            generation,
            font_size,
            typeset,
            body,
        }
    }
}

struct Instance {
    state: SandboxState,
    generation: Option<Generation>,
}

impl Instance {
    fn transition(&mut self, next: SandboxState) {
        tracing::trace!(
            target: "texframe::sandbox",
            generation = ?self.generation,
            from = ?self.state,
            to = ?next,
            "sandbox state"
        );
        self.state = next;
    }
}

/// Run one instance to completion.
///
/// Stops early only if the host is gone. A newer document does not stop it.
pub async fn run_instance(
    html: String,
    timing: InstanceTiming,
    layout: Arc<dyn LayoutEngine>,
    outbox: mpsc::UnboundedSender<String>,
) {
    let document = LoadedDocument::parse(&html);
    drop(html);

    let mut instance = Instance {
        state: SandboxState::Idle,
        generation: document.generation,
    };
    instance.transition(SandboxState::Loaded);

    sleep(timing.load_delay).await;

    instance.transition(SandboxState::Scanning);
    let body = if document.typeset {
        typeset_body(&document.body)
    } else {
        TypesetBody::untypeset(&document.body)
    };
    if body.failures > 0 {
        tracing::warn!(
            target: "texframe::sandbox",
            generation = ?document.generation,
            failures = body.failures,
            "some math spans could not be typeset"
        );
    }

    let scanned_at = Instant::now();
    let phases = [SettlePhase::First, SettlePhase::Second];
    for (phase, delay) in phases.into_iter().zip(timing.settle_delays) {
        sleep_until(scanned_at + delay).await;

        let report = HeightReport {
            height: layout.measure(&body, document.font_size, phase),
            generation: document.generation,
        };
        let message = match report.to_message() {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(target: "texframe::sandbox", "failed to encode report: {e}");
                continue;
            }
        };
        if outbox.send(message).is_err() {
            tracing::debug!(target: "texframe::sandbox", "host gone, stopping instance");
            return;
        }
        instance.transition(SandboxState::Settled);
    }
}
