use std::io;
use std::path::Path;

use log::debug;

/// Classic pcap magic, written little-endian.
const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
const PCAP_VERSION_MAJOR: u16 = 2;
const PCAP_VERSION_MINOR: u16 = 4;
const PCAP_SNAPLEN: u32 = 65535;
/// LINKTYPE_ETHERNET
const PCAP_LINKTYPE: u32 = 1;

/// Builds the 24-byte pcap global header. A file containing exactly this
/// header is a valid capture with zero records.
pub fn global_header() -> [u8; 24] {
    let mut header = [0u8; 24];
    header[0..4].copy_from_slice(&PCAP_MAGIC.to_le_bytes());
    header[4..6].copy_from_slice(&PCAP_VERSION_MAJOR.to_le_bytes());
    header[6..8].copy_from_slice(&PCAP_VERSION_MINOR.to_le_bytes());
    // thiszone and sigfigs stay zero
    header[16..20].copy_from_slice(&PCAP_SNAPLEN.to_le_bytes());
    header[20..24].copy_from_slice(&PCAP_LINKTYPE.to_le_bytes());
    header
}

/// Writes a zero-record placeholder artifact at `path`, creating parent
/// directories as needed. Overwrites whatever partial file may be there.
pub fn write_placeholder(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, global_header())?;
    debug!("Wrote placeholder artifact at {}", path.display());
    Ok(())
}

/// Returns the on-disk size of `path` if the file exists and is non-empty.
pub fn non_empty_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .map(|m| m.len())
        .filter(|len| *len > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_header_layout() {
        let header = global_header();
        assert_eq!(header.len(), 24);
        assert_eq!(&header[0..4], &[0xd4, 0xc3, 0xb2, 0xa1]);
        assert_eq!(u16::from_le_bytes([header[4], header[5]]), 2);
        assert_eq!(u16::from_le_bytes([header[6], header[7]]), 4);
        assert_eq!(
            u32::from_le_bytes([header[16], header[17], header[18], header[19]]),
            65535
        );
        assert_eq!(
            u32::from_le_bytes([header[20], header[21], header[22], header[23]]),
            1
        );
    }

    #[test]
    fn write_placeholder_creates_valid_empty_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("empty.pcap");

        write_placeholder(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes, global_header());
    }

    #[test]
    fn non_empty_size_distinguishes_states() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pcap");
        assert_eq!(non_empty_size(&missing), None);

        let empty = dir.path().join("empty.pcap");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(non_empty_size(&empty), None);

        let written = dir.path().join("written.pcap");
        write_placeholder(&written).unwrap();
        assert_eq!(non_empty_size(&written), Some(24));
    }
}
