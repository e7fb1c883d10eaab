use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use uuid::Uuid;

/// Everything a human needs to understand why a placeholder artifact exists.
pub struct SidecarNote {
    pub session_id: Uuid,
    pub interface: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub reported_packets: u64,
    pub reported_bytes: u64,
}

/// Writes `<artifact>.note.txt` next to a synthesized placeholder artifact.
/// Returns the note path.
pub fn write_note(artifact: &Path, note: &SidecarNote) -> io::Result<PathBuf> {
    let mut note_path = artifact.as_os_str().to_os_string();
    note_path.push(".note.txt");
    let note_path = PathBuf::from(note_path);

    let mut file = std::fs::File::create(&note_path)?;
    writeln!(file, "capwatch capture note")?;
    writeln!(file, "status: synthesized placeholder")?;
    writeln!(file, "session: {}", note.session_id)?;
    writeln!(file, "interface: {}", note.interface)?;
    writeln!(
        file,
        "started: {}",
        note.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(
        file,
        "ended: {}",
        note.end_time.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(file, "worker-reported packets: {}", note.reported_packets)?;
    writeln!(file, "worker-reported bytes: {}", note.reported_bytes)?;
    writeln!(
        file,
        "The worker exited without producing a capture file; the artifact next"
    )?;
    writeln!(file, "to this note is a valid zero-record capture.")?;
    file.flush()?;

    info!(
        "[{}] Wrote placeholder sidecar note at {}",
        note.session_id,
        note_path.display()
    );
    Ok(note_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_lands_next_to_artifact_and_carries_the_flag() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("capture_eth0_20260101_000000.pcap");

        let note = SidecarNote {
            session_id: Uuid::new_v4(),
            interface: "eth0".to_string(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            reported_packets: 7,
            reported_bytes: 900,
        };
        let note_path = write_note(&artifact, &note).unwrap();

        assert_eq!(
            note_path,
            dir.path().join("capture_eth0_20260101_000000.pcap.note.txt")
        );
        let body = std::fs::read_to_string(&note_path).unwrap();
        assert!(body.contains("synthesized placeholder"));
        assert!(body.contains("interface: eth0"));
        assert!(body.contains("worker-reported packets: 7"));
        assert!(body.contains(&note.session_id.to_string()));
    }
}
