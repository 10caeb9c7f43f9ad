//! Host bridge and headless sandbox for texframe documents.
//!
//! The host hands a freshly assembled document to an isolated sandbox and
//! gets nothing back but serialized height reports. There is no shared
//! state: the only channel runs sandbox → host, and the host → sandbox
//! direction is a full document reload.
//!
//! Every load gets a new generation id, written into the document itself.
//! The sandbox echoes it in each report and the host drops reports whose id
//! is not the active one, so a slow instance from an earlier document can
//! never resize the container for the current one.

use serde::{Deserialize, Serialize};

pub mod config;
pub mod host;
pub mod instance;
pub mod layout;
pub mod math;
pub mod surface;
pub mod typeset;

pub use config::BridgeConfig;
pub use host::{HostHandle, HostState, HostStatus, ReportOutcome, SandboxHost};
pub use layout::{HeuristicLayout, LayoutEngine, SettlePhase};
pub use surface::{HeadlessSurface, SandboxSurface};

/// Identifies one load of a document into the sandbox.
pub type Generation = u64;

/// Message posted by the sandbox after measuring itself.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct HeightReport {
    pub height: f64,
    /// Generation of the document that was measured. Reports without one
    /// cannot be matched to a load and are treated as stale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,
}

impl HeightReport {
    pub fn parse(raw: &str) -> Result<Self, SandboxError> {
        serde_json::from_str(raw).map_err(SandboxError::MalformedReport)
    }

    pub fn to_message(&self) -> Result<String, SandboxError> {
        serde_json::to_string(self).map_err(SandboxError::Encode)
    }
}

#[derive(thiserror::Error, Debug, miette::Diagnostic)]
pub enum SandboxError {
    #[error("malformed height report: {0}")]
    #[diagnostic(code(texframe::sandbox::malformed_report))]
    MalformedReport(#[source] serde_json::Error),

    #[error("could not encode height report: {0}")]
    #[diagnostic(code(texframe::sandbox::encode))]
    Encode(#[source] serde_json::Error),

    #[error("generation {0} was superseded before it settled")]
    #[diagnostic(code(texframe::sandbox::superseded))]
    Superseded(Generation),

    #[error("host task has shut down")]
    #[diagnostic(code(texframe::sandbox::host_closed))]
    HostClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_wire_shape() {
        let report = HeightReport {
            height: 120.0,
            generation: Some(3),
        };
        assert_eq!(
            report.to_message().unwrap(),
            r#"{"height":120.0,"generation":3}"#
        );
    }

    #[test]
    fn integer_heights_parse() {
        let report = HeightReport::parse(r#"{"height": 87, "generation": 1}"#).unwrap();
        assert_eq!(report.height, 87.0);
        assert_eq!(report.generation, Some(1));
    }

    #[test]
    fn untagged_report_parses_without_generation() {
        let report = HeightReport::parse(r#"{"height": 87}"#).unwrap();
        assert_eq!(report.generation, None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(HeightReport::parse("height=87").is_err());
        assert!(HeightReport::parse(r#"{"height": "tall"}"#).is_err());
    }
}
