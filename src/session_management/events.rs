//! Worker event stream decoding.
//!
//! The worker emits one JSON event per line on its primary channel. The
//! decoder is the single boundary between that loosely-typed stream and the
//! rest of the engine: every line becomes a `CaptureEvent`, with an explicit
//! `Unparseable` arm instead of silent coercion. Unparseable lines are
//! logged and dropped, never fatal.

use log::{debug, error, info, warn};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use uuid::Uuid;

use super::types::{CaptureSession, DriverFault, LiveStats};
use super::SessionTable;

/// One decoded worker event.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaptureEvent {
    /// Replaces the session's live snapshot; the worker is the sole source
    /// of truth for running totals.
    Stats {
        #[serde(default)]
        packet_count: u64,
        #[serde(default)]
        total_size: u64,
        #[serde(default)]
        duration: f64,
    },
    /// Informational only; does not end the session.
    Complete {
        #[serde(default)]
        packet_count: Option<u64>,
    },
    /// The worker reports where it actually saved the artifact.
    FileSaved { path: String },
    /// Host capture-driver problem; attached to the session, never fatal.
    DriverError {
        message: String,
        #[serde(default)]
        detail: Option<String>,
        #[serde(default)]
        help_url: Option<String>,
        #[serde(default)]
        suggestion: Option<String>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Warning {
        #[serde(default)]
        message: String,
    },
    Info {
        #[serde(default)]
        message: String,
    },
    Debug {
        #[serde(default)]
        message: String,
    },
    /// A line that was not a JSON event. Logged and dropped.
    #[serde(skip)]
    Unparseable { raw: String },
}

/// Decodes one line from the worker's primary channel.
pub fn decode_line(line: &str) -> CaptureEvent {
    match serde_json::from_str::<CaptureEvent>(line) {
        Ok(event) => event,
        Err(_) => CaptureEvent::Unparseable {
            raw: line.to_string(),
        },
    }
}

/// Applies one event to one session.
pub fn apply(session: &mut CaptureSession, event: CaptureEvent) {
    match event {
        CaptureEvent::Stats {
            packet_count,
            total_size,
            duration,
        } => {
            session.live = LiveStats {
                packets: packet_count,
                total_size,
                duration_secs: duration,
            };
        }
        CaptureEvent::Complete { packet_count } => {
            info!(
                "[{}] worker reports capture complete (packets: {:?})",
                session.id, packet_count
            );
        }
        CaptureEvent::FileSaved { path } => {
            let corrected = PathBuf::from(path);
            if corrected != session.artifact_path {
                info!(
                    "[{}] artifact path corrected: {} -> {}",
                    session.id,
                    session.artifact_path.display(),
                    corrected.display()
                );
            }
            session.artifact_path = corrected;
        }
        CaptureEvent::DriverError {
            message,
            detail,
            help_url,
            suggestion,
        } => {
            warn!("[{}] capture driver error: {}", session.id, message);
            session.driver_error = Some(DriverFault {
                message,
                detail,
                help_url,
                suggestion,
            });
        }
        CaptureEvent::Error { message } => error!("[{}] worker: {}", session.id, message),
        CaptureEvent::Warning { message } => warn!("[{}] worker: {}", session.id, message),
        CaptureEvent::Info { message } => info!("[{}] worker: {}", session.id, message),
        CaptureEvent::Debug { message } => debug!("[{}] worker: {}", session.id, message),
        CaptureEvent::Unparseable { raw } => {
            warn!("[{}] dropping unparseable worker line: {}", session.id, raw);
        }
    }
}

/// Consumes the worker's primary channel until EOF or until the session has
/// been removed from the table. Events for one session apply in emission
/// order because one task owns the whole stream.
pub async fn pump_events(table: SessionTable, id: Uuid, stdout: ChildStdout) {
    let mut lines = BufReader::new(stdout).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let event = decode_line(&line);
        let mut sessions = table.lock().await;
        match sessions.get_mut(&id) {
            Some(session) => apply(session, event),
            None => {
                debug!("[{}] session gone, stopping event pump", id);
                return;
            }
        }
    }
    debug!("[{}] worker event stream ended", id);
}

/// Drains the worker's diagnostic channel into logs. Never parsed as data.
pub async fn pump_diagnostics(id: Uuid, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("[{}][worker:stderr] {}", id, line);
    }
    debug!("[{}] worker diagnostic stream ended", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn session() -> CaptureSession {
        CaptureSession {
            id: Uuid::new_v4(),
            interface: "eth0".to_string(),
            start_time: Utc::now(),
            artifact_path: PathBuf::from("/tmp/provisional.pcap"),
            worker: None,
            control: None,
            live: LiveStats::default(),
            driver_error: None,
        }
    }

    #[test]
    fn decodes_stats_event() {
        let event =
            decode_line(r#"{"type":"stats","packet_count":42,"total_size":10000,"duration":5}"#);
        match event {
            CaptureEvent::Stats {
                packet_count,
                total_size,
                duration,
            } => {
                assert_eq!(packet_count, 42);
                assert_eq!(total_size, 10000);
                assert_eq!(duration, 5.0);
            }
            other => panic!("expected stats, got {:?}", other),
        }
    }

    #[test]
    fn stats_replaces_snapshot_instead_of_accumulating() {
        let mut s = session();
        apply(
            &mut s,
            decode_line(r#"{"type":"stats","packet_count":10,"total_size":100,"duration":1}"#),
        );
        apply(
            &mut s,
            decode_line(r#"{"type":"stats","packet_count":7,"total_size":70,"duration":2}"#),
        );
        assert_eq!(s.live.packets, 7);
        assert_eq!(s.live.total_size, 70);
        assert_eq!(s.live.duration_secs, 2.0);
    }

    #[test]
    fn file_saved_corrects_artifact_path() {
        let mut s = session();
        apply(
            &mut s,
            decode_line(r#"{"type":"file_saved","path":"/data/real_location.pcap"}"#),
        );
        assert_eq!(s.artifact_path, PathBuf::from("/data/real_location.pcap"));
    }

    #[test]
    fn driver_error_attaches_without_terminating() {
        let mut s = session();
        apply(
            &mut s,
            decode_line(
                r#"{"type":"driver_error","message":"no capture driver","detail":"npcap missing","help_url":"https://npcap.com","suggestion":"install the driver"}"#,
            ),
        );
        let fault = s.driver_error.expect("fault attached");
        assert_eq!(fault.message, "no capture driver");
        assert_eq!(fault.detail.as_deref(), Some("npcap missing"));
        assert_eq!(fault.suggestion.as_deref(), Some("install the driver"));
    }

    #[test]
    fn complete_is_informational_only() {
        let mut s = session();
        apply(
            &mut s,
            decode_line(r#"{"type":"stats","packet_count":3,"total_size":30,"duration":1}"#),
        );
        apply(&mut s, decode_line(r#"{"type":"complete"}"#));
        // snapshot untouched, no fault recorded
        assert_eq!(s.live.packets, 3);
        assert!(s.driver_error.is_none());
    }

    #[test]
    fn garbage_becomes_unparseable() {
        assert!(matches!(
            decode_line("not json at all"),
            CaptureEvent::Unparseable { .. }
        ));
        assert!(matches!(
            decode_line(r#"{"type":"unknown_kind","x":1}"#),
            CaptureEvent::Unparseable { .. }
        ));
        assert!(matches!(
            decode_line(""),
            CaptureEvent::Unparseable { .. }
        ));
    }

    #[test]
    fn unparseable_lines_do_not_mutate_state() {
        let mut s = session();
        apply(
            &mut s,
            decode_line(r#"{"type":"stats","packet_count":5,"total_size":50,"duration":1}"#),
        );
        apply(&mut s, decode_line("???"));
        assert_eq!(s.live.packets, 5);
        assert!(s.driver_error.is_none());
    }

    #[test]
    fn log_level_events_decode() {
        assert!(matches!(
            decode_line(r#"{"type":"error","message":"boom"}"#),
            CaptureEvent::Error { .. }
        ));
        assert!(matches!(
            decode_line(r#"{"type":"warning","message":"odd"}"#),
            CaptureEvent::Warning { .. }
        ));
        assert!(matches!(
            decode_line(r#"{"type":"info","message":"hi"}"#),
            CaptureEvent::Info { .. }
        ));
        assert!(matches!(
            decode_line(r#"{"type":"debug","message":"lo"}"#),
            CaptureEvent::Debug { .. }
        ));
    }
}
