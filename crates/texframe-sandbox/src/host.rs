//! Host side of the sandbox bridge.
//!
//! [`HostState`] holds the synchronous rules (generation tagging, report
//! validation, clamping). [`SandboxHost`] drives it from a single task that
//! reacts to embedder commands and sandbox messages and never blocks on the
//! sandbox's own timing.
//!
//! # Example
//!
//! ```ignore
//! let handle = SandboxHost::spawn(HeadlessSurface::new(&config), config);
//! let generation = handle.render(render_document(content, &options))?;
//! let height = handle.settled(generation, 2).await?;
//! println!("container is {height}px tall");
//! ```

use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use texframe_renderer::RenderedDocument;

use crate::config::BridgeConfig;
use crate::surface::SandboxSurface;
use crate::{Generation, HeightReport, SandboxError};

/// Where the host is with respect to the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    /// Document handed over, no valid report yet.
    Loaded(Generation),
    /// At least one valid report applied for this generation.
    Settled(Generation),
}

/// What happened to one incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The container now has this height.
    Applied(u32),
    /// Not the active generation.
    Stale {
        report: Option<Generation>,
        active: Generation,
    },
    Malformed,
    NonPositive,
    /// No document has been loaded yet.
    Idle,
}

/// Snapshot of the host, published after every load and every applied report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    pub generation: Option<Generation>,
    /// Valid reports applied for `generation` so far.
    pub reports: u32,
    pub height: u32,
}

/// Clamp a reported height into `[floor_height, ceiling_height]` after padding.
pub fn clamp_height(height: f64, config: &BridgeConfig) -> u32 {
    let floor = f64::from(config.floor_height());
    let ceiling = f64::from(config.ceiling_height());
    (height + f64::from(config.safety_pad))
        .ceil()
        .clamp(floor, ceiling) as u32
}

#[derive(Debug, Clone)]
pub struct HostState {
    config: BridgeConfig,
    last_generation: Generation,
    phase: HostPhase,
    height: u32,
    reports: u32,
}

impl HostState {
    pub fn new(config: BridgeConfig) -> Self {
        let height = config.floor_height();
        Self {
            config,
            last_generation: 0,
            phase: HostPhase::Idle,
            height,
            reports: 0,
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    pub fn container_height(&self) -> u32 {
        self.height
    }

    pub fn status(&self) -> HostStatus {
        HostStatus {
            generation: self.active_generation(),
            reports: self.reports,
            height: self.height,
        }
    }

    pub fn active_generation(&self) -> Option<Generation> {
        match self.phase {
            HostPhase::Idle => None,
            HostPhase::Loaded(g) | HostPhase::Settled(g) => Some(g),
        }
    }

    /// Start a new generation. Any report for an earlier one is stale from now on.
    pub fn begin_generation(&mut self) -> Generation {
        self.last_generation += 1;
        self.phase = HostPhase::Loaded(self.last_generation);
        self.reports = 0;
        self.last_generation
    }

    /// Validate one raw message and apply it if it belongs to the active generation.
    ///
    /// The container keeps its last valid height whenever a message is rejected.
    pub fn apply_report(&mut self, raw: &str) -> ReportOutcome {
        let Some(active) = self.active_generation() else {
            return ReportOutcome::Idle;
        };

        let report = match HeightReport::parse(raw) {
            Ok(report) => report,
            Err(err) => {
                tracing::debug!(target: "texframe::sandbox", error = %err, "dropping report");
                return ReportOutcome::Malformed;
            }
        };

        if report.generation != Some(active) {
            return ReportOutcome::Stale {
                report: report.generation,
                active,
            };
        }

        if !report.height.is_finite() || report.height <= 0.0 {
            return ReportOutcome::NonPositive;
        }

        self.height = clamp_height(report.height, &self.config);
        self.phase = HostPhase::Settled(active);
        self.reports += 1;
        ReportOutcome::Applied(self.height)
    }
}

pub enum HostCommand {
    Render(RenderedDocument),
    Shutdown,
}

/// Embedder's handle on a running host task.
pub struct HostHandle {
    commands: mpsc::UnboundedSender<HostCommand>,
    height: watch::Receiver<u32>,
    status: watch::Receiver<HostStatus>,
    /// Renders sent so far. The host numbers generations in arrival order,
    /// so this is also the latest generation.
    sent: Mutex<Generation>,
    task: JoinHandle<()>,
}

impl HostHandle {
    /// Load a new document, superseding whatever is displayed. Returns the
    /// generation the host will load it as.
    pub fn render(&self, document: RenderedDocument) -> Result<Generation, SandboxError> {
        let mut sent = self.sent.lock().unwrap_or_else(PoisonError::into_inner);
        self.commands
            .send(HostCommand::Render(document))
            .map_err(|_| SandboxError::HostClosed)?;
        *sent += 1;
        Ok(*sent)
    }

    /// Wait until `reports` valid reports for `generation` have been applied
    /// and return the container height at that point.
    ///
    /// A generation that never reports as often as asked waits forever, so
    /// callers should bound this with a timeout.
    pub async fn settled(
        &self,
        generation: Generation,
        reports: u32,
    ) -> Result<u32, SandboxError> {
        let mut status = self.status.clone();
        let status = *status
            .wait_for(|s| {
                s.generation.is_some_and(|g| g > generation)
                    || (s.generation == Some(generation) && s.reports >= reports)
            })
            .await
            .map_err(|_| SandboxError::HostClosed)?;

        if status.generation == Some(generation) {
            Ok(status.height)
        } else {
            Err(SandboxError::Superseded(generation))
        }
    }

    pub fn status(&self) -> HostStatus {
        *self.status.borrow()
    }

    /// Watch the container height. Starts at the minimum height.
    pub fn height(&self) -> watch::Receiver<u32> {
        self.height.clone()
    }

    pub fn current_height(&self) -> u32 {
        *self.height.borrow()
    }

    /// Stop the host task and wait for it. Sandbox instances still running
    /// finish on their own; their reports go nowhere.
    pub async fn shutdown(self) {
        let _ = self.commands.send(HostCommand::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!(target: "texframe::sandbox", "host task failed: {e}");
        }
    }
}

pub struct SandboxHost<S> {
    state: HostState,
    surface: S,
    commands: mpsc::UnboundedReceiver<HostCommand>,
    outbox: mpsc::UnboundedSender<String>,
    inbox: mpsc::UnboundedReceiver<String>,
    height: watch::Sender<u32>,
    status: watch::Sender<HostStatus>,
}

impl<S: SandboxSurface> SandboxHost<S> {
    /// Spawn the host task on the current tokio runtime.
    pub fn spawn(surface: S, config: BridgeConfig) -> HostHandle {
        let state = HostState::new(config);
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (outbox, inbox) = mpsc::unbounded_channel();
        let (height, height_rx) = watch::channel(state.container_height());
        let (status, status_rx) = watch::channel(state.status());

        let host = SandboxHost {
            state,
            surface,
            commands,
            outbox,
            inbox,
            height,
            status,
        };
        let task = tokio::spawn(host.run());

        HostHandle {
            commands: command_tx,
            height: height_rx,
            status: status_rx,
            sent: Mutex::new(0),
            task,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(HostCommand::Render(document)) => self.load(document),
                    Some(HostCommand::Shutdown) | None => break,
                },
                Some(raw) = self.inbox.recv() => self.on_message(&raw),
            }
        }
        tracing::debug!(target: "texframe::sandbox", "host task stopped");
    }

    fn load(&mut self, document: RenderedDocument) {
        let generation = self.state.begin_generation();
        tracing::debug!(
            target: "texframe::sandbox",
            generation,
            typeset = document.is_typeset(),
            "loading document"
        );
        self.surface
            .load(document.for_generation(generation), self.outbox.clone());
        self.status.send_replace(self.state.status());
    }

    fn on_message(&mut self, raw: &str) {
        match self.state.apply_report(raw) {
            ReportOutcome::Applied(height) => {
                tracing::trace!(target: "texframe::sandbox", height, "applied height");
                self.status.send_replace(self.state.status());
                self.height.send_if_modified(|current| {
                    let changed = *current != height;
                    *current = height;
                    changed
                });
            }
            ReportOutcome::Stale { report, active } => {
                tracing::debug!(
                    target: "texframe::sandbox",
                    ?report,
                    active,
                    "dropping report from superseded document"
                );
            }
            outcome => {
                tracing::debug!(target: "texframe::sandbox", ?outcome, "ignoring report");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(height: f64, generation: Generation) -> String {
        HeightReport {
            height,
            generation: Some(generation),
        }
        .to_message()
        .unwrap()
    }

    #[test]
    fn idle_host_ignores_reports() {
        let mut state = HostState::new(BridgeConfig::default());
        assert_eq!(state.apply_report(&report(100.0, 1)), ReportOutcome::Idle);
        assert_eq!(state.container_height(), 20);
    }

    #[test]
    fn valid_report_is_padded_and_applied() {
        let mut state = HostState::new(BridgeConfig::default());
        let generation = state.begin_generation();
        assert_eq!(
            state.apply_report(&report(100.2, generation)),
            ReportOutcome::Applied(111)
        );
        assert_eq!(state.phase(), HostPhase::Settled(generation));
    }

    #[test]
    fn latest_valid_report_wins() {
        let mut state = HostState::new(BridgeConfig::default());
        let generation = state.begin_generation();
        state.apply_report(&report(100.0, generation));
        state.apply_report(&report(140.0, generation));
        assert_eq!(state.container_height(), 150);
    }

    #[test]
    fn status_counts_reports_per_generation() {
        let mut state = HostState::new(BridgeConfig::default());
        let first = state.begin_generation();
        state.apply_report(&report(100.0, first));
        state.apply_report("{");
        state.apply_report(&report(120.0, first));
        assert_eq!(
            state.status(),
            HostStatus {
                generation: Some(first),
                reports: 2,
                height: 130
            }
        );

        let second = state.begin_generation();
        state.apply_report(&report(80.0, first));
        assert_eq!(
            state.status(),
            HostStatus {
                generation: Some(second),
                reports: 0,
                height: 130
            }
        );
    }

    #[test]
    fn stale_generation_is_dropped() {
        let mut state = HostState::new(BridgeConfig::default());
        let first = state.begin_generation();
        let second = state.begin_generation();
        state.apply_report(&report(300.0, second));
        assert_eq!(
            state.apply_report(&report(900.0, first)),
            ReportOutcome::Stale {
                report: Some(first),
                active: second
            }
        );
        assert_eq!(state.container_height(), 310);
    }

    #[test]
    fn untagged_report_is_stale() {
        let mut state = HostState::new(BridgeConfig::default());
        state.begin_generation();
        assert!(matches!(
            state.apply_report(r#"{"height": 90}"#),
            ReportOutcome::Stale { report: None, .. }
        ));
    }

    #[test]
    fn bad_reports_keep_previous_height() {
        let mut state = HostState::new(BridgeConfig::default());
        let generation = state.begin_generation();
        assert_eq!(state.apply_report("{"), ReportOutcome::Malformed);
        assert_eq!(
            state.apply_report(&report(0.0, generation)),
            ReportOutcome::NonPositive
        );
        assert_eq!(
            state.apply_report(&report(-12.0, generation)),
            ReportOutcome::NonPositive
        );
        assert_eq!(state.container_height(), 20);
        assert_eq!(state.phase(), HostPhase::Loaded(generation));
    }

    #[test]
    fn applied_height_always_within_bounds() {
        let config = BridgeConfig::default().with_min_height(48);
        let heights = [
            f64::MIN_POSITIVE,
            0.5,
            1.0,
            37.9,
            38.0,
            250.0,
            4989.5,
            4990.0,
            5000.0,
            1e9,
            f64::MAX,
        ];
        for height in heights {
            let applied = clamp_height(height, &config);
            assert!((48..=5000).contains(&applied), "{height} -> {applied}");
        }
        assert_eq!(clamp_height(1e9, &config), 5000);
        assert_eq!(clamp_height(1.0, &config), 48);
    }

    #[test]
    fn oversized_ceiling_still_caps_at_max_height() {
        let config = BridgeConfig {
            max_height: 20_000,
            ..Default::default()
        };
        assert_eq!(clamp_height(1e9, &config), 5000);
        assert_eq!(clamp_height(12_000.0, &config), 5000);
    }
}
