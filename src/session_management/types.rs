use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::process::{Child, ChildStdin};
use uuid::Uuid;

/// Running totals as last self-reported by the worker. Each `stats` event
/// replaces the whole snapshot; nothing here accumulates host-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LiveStats {
    pub packets: u64,
    pub total_size: u64,
    pub duration_secs: f64,
}

/// Structured record of a capture-driver problem on the host (permissions,
/// missing driver). Attached to the session as inspectable state; a session
/// with a driver fault keeps running until stopped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverFault {
    pub message: String,
    pub detail: Option<String>,
    pub help_url: Option<String>,
    pub suggestion: Option<String>,
}

/// One in-flight capture session. Owned exclusively by the registry table;
/// mutated only by the event parser and the termination coordinator.
pub struct CaptureSession {
    pub id: Uuid,
    /// Sanitized interface name, or the auto-detect sentinel.
    pub interface: String,
    pub start_time: DateTime<Utc>,
    /// Provisional until a `file_saved` event reports the worker's actual
    /// save location.
    pub artifact_path: PathBuf,
    /// Worker process handle; taken by the coordinator during stop.
    pub worker: Option<Child>,
    /// Worker control channel (stdin); carries the stop token.
    pub control: Option<ChildStdin>,
    pub live: LiveStats,
    pub driver_error: Option<DriverFault>,
}

/// What `start()` hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub session_id: Uuid,
    pub artifact_path: PathBuf,
    pub file_name: String,
}

/// What `stop()` hands back to the caller, on every path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub artifact_path: PathBuf,
    pub file_name: String,
    pub final_stats: LiveStats,
    /// True when the artifact was synthesized because the worker never
    /// produced one.
    pub is_placeholder_file: bool,
}
