//! Capability interface over interchangeable analysis tools.

use chrono::{DateTime, Utc};
use log::{debug, info};
use std::path::Path;

use crate::error_handling::types::BackendError;

use super::tcpdump::TcpdumpBackend;
use super::tshark::TsharkBackend;
use super::types::{PairFrame, SourceFrame};

/// Uniform surface over an external artifact-analysis tool.
///
/// Adapters are stateless; each method is one short-lived tool invocation
/// against the artifact at `path`.
pub trait AnalysisBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap availability check (tool present and runnable).
    fn probe(&self) -> bool;

    /// Authoritative record count for the artifact.
    fn count_records(&self, path: &Path) -> Result<u64, BackendError>;

    /// One protocol-stack string per record (e.g. `eth:ethertype:ip:tcp`).
    fn protocol_stacks(&self, path: &Path) -> Result<Vec<String>, BackendError>;

    /// Per-record source address and frame length.
    fn source_frames(&self, path: &Path) -> Result<Vec<SourceFrame>, BackendError>;

    /// Per-record directed address pair and frame length.
    fn address_pair_frames(&self, path: &Path) -> Result<Vec<PairFrame>, BackendError>;
}

/// Outcome of one probing pass. Built fresh for every aggregation call and
/// never cached: tool availability can change between calls.
pub struct BackendCapability {
    pub backend: Option<Box<dyn AnalysisBackend>>,
    pub probed_at: DateTime<Utc>,
}

impl BackendCapability {
    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.name())
    }
}

/// Probes the candidate tools in fixed priority order: the structured-field
/// tool first, the line-oriented dump tool second. The first tool that
/// answers is used for the whole call; tools are never mixed within a call.
pub fn probe_backends() -> BackendCapability {
    let candidates: Vec<Box<dyn AnalysisBackend>> = vec![
        Box::new(TsharkBackend::new()),
        Box::new(TcpdumpBackend::new()),
    ];

    for candidate in candidates {
        debug!("probing analysis backend: {}", candidate.name());
        if candidate.probe() {
            info!("analysis backend selected: {}", candidate.name());
            return BackendCapability {
                backend: Some(candidate),
                probed_at: Utc::now(),
            };
        }
    }

    info!("no analysis backend available, aggregation will degrade");
    BackendCapability {
        backend: None,
        probed_at: Utc::now(),
    }
}

/// Shared probe helper: a tool is available when `--version` runs cleanly.
pub(crate) fn version_probe(tool: &str) -> bool {
    let available = std::process::Command::new(tool)
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);
    debug!("{} availability check: {}", tool, available);
    available
}

/// Shared invocation helper: runs `tool args...` and returns stdout as text.
pub(crate) fn run_tool(tool: &str, args: &[&str]) -> Result<String, BackendError> {
    let output = std::process::Command::new(tool)
        .args(args)
        .output()
        .map_err(|e| {
            // the tool can disappear between the probe and the call
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::Unavailable
            } else {
                BackendError::InvocationFailed(format!("{}: {}", tool, e))
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BackendError::InvocationFailed(format!(
            "{} exited with {}: {}",
            tool,
            output.status,
            stderr.trim()
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| BackendError::OutputUnreadable(format!("{}: {}", tool, e)))
}
