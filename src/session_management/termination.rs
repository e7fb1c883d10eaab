//! Escalating session shutdown.
//!
//! `stop()` must finish in bounded time against arbitrary worker
//! misbehavior and must leave a usable artifact behind. The sequence is an
//! explicit state machine driven by poll results: stop token, soft signal,
//! forceful kill, artifact wait, late-arrival grace, synthesis. Every wait
//! is bounded, and the session is removed from the table exactly once, at
//! the very end, on every path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use uuid::Uuid;

use crate::artifact::{pcap, sidecar};
use crate::error_handling::types::SessionError;

use super::types::{LiveStats, StopOutcome};
use super::SessionTable;

/// Token the worker watches for on its control channel.
const STOP_TOKEN: &[u8] = b"stop\n";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// How long the worker gets to exit on its own before a forceful kill.
const EXIT_CONFIRM_WINDOW: Duration = Duration::from_secs(3);
/// How long to wait for the artifact to appear and become non-empty.
const ARTIFACT_WAIT_WINDOW: Duration = Duration::from_secs(5);
/// One more bounded wait when the worker is gone but the file is not there.
const LATE_ARRIVAL_GRACE: Duration = Duration::from_secs(3);
/// Bound on reaping an already-signalled worker.
const REAP_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownPhase {
    Requested,
    GracefulSent,
    SignalSent,
    KillSent,
    ArtifactConfirmed,
    Synthesized,
    Done,
}

/// Drives the stop sequence for one session at a time against the shared
/// session table.
pub struct TerminationCoordinator {
    sessions: SessionTable,
}

impl TerminationCoordinator {
    pub fn new(sessions: SessionTable) -> Self {
        TerminationCoordinator { sessions }
    }

    /// Stops a session and returns its final artifact, in bounded time.
    ///
    /// The returned stats prefer the artifact's real on-disk size over the
    /// worker's last self-reported size when they disagree. If no artifact
    /// materializes, a zero-record placeholder plus a sidecar note are
    /// synthesized and `is_placeholder_file` is set.
    pub async fn stop(&self, id: Uuid) -> Result<StopOutcome, SessionError> {
        // Pull the process handles out; the session row stays in the table
        // until the very end so late events still apply.
        let (worker, control, interface, start_time, provisional_path) = {
            let mut table = self.sessions.lock().await;
            let session = table.get_mut(&id).ok_or(SessionError::NotFound)?;
            (
                session.worker.take(),
                session.control.take(),
                session.interface.clone(),
                session.start_time,
                session.artifact_path.clone(),
            )
        };

        let mut phase = ShutdownPhase::Requested;
        let mut worker = worker;

        // Stop token over the control channel, then close it so workers that
        // only watch for EOF also wind down.
        if let Some(mut stdin) = control {
            match stdin.write_all(STOP_TOKEN).await {
                Ok(()) => {
                    let _ = stdin.flush().await;
                    let _ = stdin.shutdown().await;
                    Self::advance(id, &mut phase, ShutdownPhase::GracefulSent);
                }
                Err(e) => {
                    warn!("[{}] stop token write failed: {}", id, e);
                }
            }
        }

        // No usable control channel: escalate to a soft signal.
        if phase == ShutdownPhase::Requested {
            if let Some(child) = worker.as_ref() {
                Self::send_soft_signal(id, child);
            }
            Self::advance(id, &mut phase, ShutdownPhase::SignalSent);
        }

        // Bounded exit confirmation, then forceful kill.
        let mut exited = Self::await_exit(id, worker.as_mut(), EXIT_CONFIRM_WINDOW).await;
        if !exited {
            if let Some(child) = worker.as_mut() {
                warn!("[{}] worker ignored shutdown request, sending kill", id);
                if let Err(e) = child.start_kill() {
                    warn!("[{}] kill failed: {}", id, e);
                }
            }
            Self::advance(id, &mut phase, ShutdownPhase::KillSent);
        }

        // Bounded artifact wait. A late file_saved event may still correct
        // the path, so re-read it from the table on every poll.
        let mut artifact_path = provisional_path.clone();
        let mut artifact_size: Option<u64> = None;
        let wait_deadline = tokio::time::Instant::now() + ARTIFACT_WAIT_WINDOW;
        loop {
            artifact_path = self.current_artifact_path(id, &provisional_path).await;
            if let Some(size) = pcap::non_empty_size(&artifact_path) {
                artifact_size = Some(size);
                Self::advance(id, &mut phase, ShutdownPhase::ArtifactConfirmed);
                break;
            }
            if !exited {
                exited = Self::poll_exit(worker.as_mut());
            }
            if tokio::time::Instant::now() >= wait_deadline {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        // Worker confirmed gone but no file yet: one more bounded grace.
        if artifact_size.is_none() && exited {
            let grace_deadline = tokio::time::Instant::now() + LATE_ARRIVAL_GRACE;
            loop {
                artifact_path = self.current_artifact_path(id, &provisional_path).await;
                if let Some(size) = pcap::non_empty_size(&artifact_path) {
                    artifact_size = Some(size);
                    Self::advance(id, &mut phase, ShutdownPhase::ArtifactConfirmed);
                    break;
                }
                if tokio::time::Instant::now() >= grace_deadline {
                    break;
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }

        // Reap whatever is left of the worker, bounded.
        if let Some(mut child) = worker.take() {
            if !exited {
                let _ = child.start_kill();
            }
            let _ = tokio::time::timeout(REAP_WINDOW, child.wait()).await;
        }

        let end_time = Utc::now();
        let live = self.current_live(id).await;

        // Materialization guarantee: a missing artifact becomes a valid
        // zero-record capture plus a human-readable note. Written only now,
        // with the worker confirmed absent.
        let is_placeholder = artifact_size.is_none();
        if is_placeholder {
            if let Err(e) = pcap::write_placeholder(&artifact_path) {
                warn!("[{}] failed to write placeholder artifact: {}", id, e);
            }
            let note = sidecar::SidecarNote {
                session_id: id,
                interface: interface.clone(),
                start_time,
                end_time,
                reported_packets: live.packets,
                reported_bytes: live.total_size,
            };
            if let Err(e) = sidecar::write_note(&artifact_path, &note) {
                warn!("[{}] failed to write sidecar note: {}", id, e);
            }
            Self::advance(id, &mut phase, ShutdownPhase::Synthesized);
        }

        let disk_size = pcap::non_empty_size(&artifact_path);
        let final_stats = LiveStats {
            packets: live.packets,
            total_size: disk_size.unwrap_or(live.total_size),
            duration_secs: if live.duration_secs > 0.0 {
                live.duration_secs
            } else {
                (end_time - start_time).num_milliseconds() as f64 / 1000.0
            },
        };

        // Unconditional removal, exactly once, after everything else.
        {
            let mut table = self.sessions.lock().await;
            table.remove(&id);
        }
        Self::advance(id, &mut phase, ShutdownPhase::Done);

        let file_name = artifact_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(
            "[{}] session stopped: {} ({} bytes, placeholder: {})",
            id,
            file_name,
            final_stats.total_size,
            is_placeholder
        );

        Ok(StopOutcome {
            artifact_path,
            file_name,
            final_stats,
            is_placeholder_file: is_placeholder,
        })
    }

    fn advance(id: Uuid, phase: &mut ShutdownPhase, next: ShutdownPhase) {
        debug!("[{}] shutdown {:?} -> {:?}", id, phase, next);
        *phase = next;
    }

    #[cfg(unix)]
    fn send_soft_signal(id: Uuid, child: &Child) {
        if let Some(pid) = child.id() {
            debug!("[{}] sending SIGTERM to worker pid {}", id, pid);
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
        }
    }

    #[cfg(not(unix))]
    fn send_soft_signal(id: Uuid, _child: &Child) {
        // No soft signal on this platform; the kill escalation covers it.
        debug!("[{}] no soft termination signal available", id);
    }

    /// Polls the worker until it exits or the window elapses.
    async fn await_exit(id: Uuid, worker: Option<&mut Child>, window: Duration) -> bool {
        let Some(child) = worker else {
            return true;
        };
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("[{}] worker exited: {}", id, status);
                    return true;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("[{}] worker status check failed: {}", id, e);
                    return true;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn poll_exit(worker: Option<&mut Child>) -> bool {
        match worker {
            None => true,
            Some(child) => !matches!(child.try_wait(), Ok(None)),
        }
    }

    async fn current_artifact_path(&self, id: Uuid, fallback: &Path) -> PathBuf {
        let table = self.sessions.lock().await;
        table
            .get(&id)
            .map(|s| s.artifact_path.clone())
            .unwrap_or_else(|| fallback.to_path_buf())
    }

    async fn current_live(&self, id: Uuid) -> LiveStats {
        let table = self.sessions.lock().await;
        table.get(&id).map(|s| s.live.clone()).unwrap_or_default()
    }
}
