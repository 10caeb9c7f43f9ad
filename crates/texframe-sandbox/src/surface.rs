use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::instance::{InstanceTiming, run_instance};
use crate::layout::{HeuristicLayout, LayoutEngine};

/// An isolated rendering surface.
///
/// `load` hands over a complete document; it is a full reset, never an
/// incremental update. Whatever the sandbox has to say comes back on
/// `outbox` as serialized messages.
pub trait SandboxSurface: Send + 'static {
    fn load(&mut self, document: String, outbox: mpsc::UnboundedSender<String>);
}

/// In-process sandbox: every load spawns a fresh, independent instance task.
///
/// A superseded instance is not cancelled. It runs to completion and its
/// late reports are dropped by the host.
#[derive(Clone)]
pub struct HeadlessSurface {
    timing: InstanceTiming,
    layout: Arc<dyn LayoutEngine>,
}

impl HeadlessSurface {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_layout(
            config,
            Arc::new(HeuristicLayout::with_viewport_width(config.viewport_width)),
        )
    }

    pub fn with_layout(config: &BridgeConfig, layout: Arc<dyn LayoutEngine>) -> Self {
        Self {
            timing: InstanceTiming::from(config),
            layout,
        }
    }
}

impl SandboxSurface for HeadlessSurface {
    fn load(&mut self, document: String, outbox: mpsc::UnboundedSender<String>) {
        tokio::spawn(run_instance(
            document,
            self.timing,
            self.layout.clone(),
            outbox,
        ));
    }
}
