use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, error, info};
use regex::Regex;
use tokio::process::Command;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::SessionError;

use super::events;
use super::types::{CaptureSession, LiveStats, StartOutcome};
use super::{SessionTable, AUTO_DETECT};

/// Owns the table of in-flight capture sessions.
///
/// `start()` spawns one worker per session and wires its event stream into
/// the table; lookups and live snapshots go through here as well. Stopping
/// is the [`TerminationCoordinator`]'s job, which shares the same table.
///
/// [`TerminationCoordinator`]: super::termination::TerminationCoordinator
pub struct SessionRegistry {
    sessions: SessionTable,
    config: CaptureConfig,
    iface_filter: Regex,
}

impl SessionRegistry {
    pub fn new(config: CaptureConfig) -> Self {
        SessionRegistry {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            config,
            iface_filter: Regex::new(r"[^A-Za-z0-9()]").expect("hard-coded pattern"),
        }
    }

    /// Shared handle to the session table, for the termination coordinator.
    pub fn table(&self) -> SessionTable {
        Arc::clone(&self.sessions)
    }

    /// Starts a capture session on `interface` (auto-detect when absent).
    ///
    /// The worker is always launched unbounded (`--duration 0`); session
    /// lifetime is enforced externally by `stop()`, so `duration_hint` only
    /// informs logging. Fails with `SpawnFailed` if the worker cannot start;
    /// no partial session is registered on failure.
    pub async fn start(
        &self,
        interface: Option<&str>,
        duration_hint: Option<u64>,
    ) -> Result<StartOutcome, SessionError> {
        let iface = self.sanitize_interface(interface);
        let id = Uuid::new_v4();
        let timestamp = Utc::now();

        let file_name = format!("capture_{}_{}.pcap", iface, timestamp.format("%Y%m%d_%H%M%S"));
        let artifact_path = self.config.output_dir.join(&file_name);

        std::fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| SessionError::SpawnFailed(format!("output directory: {}", e)))?;

        info!(
            "[{}] starting capture on '{}' (hint: {:?}s) -> {}",
            id,
            iface,
            duration_hint,
            artifact_path.display()
        );

        let mut command = Command::new(&self.config.worker_bin);
        command
            .arg("--interface")
            .arg(&iface)
            .arg("--duration")
            .arg("0")
            .arg("--output")
            .arg(&artifact_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut worker = command.spawn().map_err(|e| {
            error!("[{}] failed to spawn capture worker: {}", id, e);
            SessionError::SpawnFailed(e.to_string())
        })?;

        let control = worker.stdin.take();
        let stdout = worker.stdout.take();
        let stderr = worker.stderr.take();

        let session = CaptureSession {
            id,
            interface: iface,
            start_time: timestamp,
            artifact_path: artifact_path.clone(),
            worker: Some(worker),
            control,
            live: LiveStats::default(),
            driver_error: None,
        };

        {
            let mut table = self.sessions.lock().await;
            table.insert(id, session);
        }

        if let Some(stdout) = stdout {
            tokio::spawn(events::pump_events(self.table(), id, stdout));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(events::pump_diagnostics(id, stderr));
        }

        debug!("[{}] session registered and event pump wired", id);
        Ok(StartOutcome {
            session_id: id,
            artifact_path,
            file_name,
        })
    }

    /// Returns the live snapshot for a session.
    pub async fn get_stats(&self, id: Uuid) -> Result<LiveStats, SessionError> {
        let table = self.sessions.lock().await;
        table
            .get(&id)
            .map(|s| s.live.clone())
            .ok_or(SessionError::NotFound)
    }

    /// Returns the attached driver fault, if the worker reported one.
    pub async fn get_driver_error(
        &self,
        id: Uuid,
    ) -> Result<Option<super::types::DriverFault>, SessionError> {
        let table = self.sessions.lock().await;
        table
            .get(&id)
            .map(|s| s.driver_error.clone())
            .ok_or(SessionError::NotFound)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn session_ids(&self) -> Vec<Uuid> {
        self.sessions.lock().await.keys().copied().collect()
    }

    /// Strips everything outside `[A-Za-z0-9()]` from the requested
    /// interface name; an absent or fully-stripped name becomes the
    /// auto-detect sentinel.
    fn sanitize_interface(&self, interface: Option<&str>) -> String {
        match interface {
            Some(raw) if raw != AUTO_DETECT => {
                let clean = self.iface_filter.replace_all(raw, "").into_owned();
                if clean.is_empty() {
                    AUTO_DETECT.to_string()
                } else {
                    clean
                }
            }
            _ => AUTO_DETECT.to_string(),
        }
    }
}
