//! Structured-field adapter (preferred backend).
//!
//! tshark answers with exact per-record fields via `-T fields`, so counts
//! and byte totals from this adapter are authoritative.

use std::path::Path;

use crate::error_handling::types::BackendError;

use super::backend::{run_tool, version_probe, AnalysisBackend};
use super::types::{PairFrame, SourceFrame};

pub struct TsharkBackend;

impl TsharkBackend {
    pub fn new() -> Self {
        TsharkBackend
    }

    fn fields(&self, path: &Path, fields: &[&str]) -> Result<Vec<String>, BackendError> {
        let path_arg = path.to_string_lossy();
        let mut args: Vec<&str> = vec!["-r", path_arg.as_ref(), "-T", "fields"];
        for &field in fields {
            args.push("-e");
            args.push(field);
        }
        let stdout = run_tool("tshark", &args)?;
        Ok(stdout.lines().map(|l| l.to_string()).collect())
    }
}

impl Default for TsharkBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits one `-T fields` output line into tab-separated columns.
pub(crate) fn split_columns(line: &str) -> Vec<&str> {
    line.split('\t').collect()
}

impl AnalysisBackend for TsharkBackend {
    fn name(&self) -> &'static str {
        "tshark"
    }

    fn probe(&self) -> bool {
        version_probe("tshark")
    }

    fn count_records(&self, path: &Path) -> Result<u64, BackendError> {
        let lines = self.fields(path, &["frame.number"])?;
        Ok(lines.iter().filter(|l| !l.trim().is_empty()).count() as u64)
    }

    fn protocol_stacks(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let lines = self.fields(path, &["frame.protocols"])?;
        Ok(lines
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect())
    }

    fn source_frames(&self, path: &Path) -> Result<Vec<SourceFrame>, BackendError> {
        let lines = self.fields(path, &["ip.src", "frame.len"])?;
        Ok(lines
            .iter()
            .filter_map(|line| {
                let columns = split_columns(line);
                let source = columns.first().copied().unwrap_or("").trim();
                if source.is_empty() {
                    // non-IP record (ARP and friends); no address to attribute
                    return None;
                }
                let bytes = columns
                    .get(1)
                    .and_then(|c| c.trim().parse::<u64>().ok())
                    .unwrap_or(0);
                Some(SourceFrame {
                    source: source.to_string(),
                    bytes,
                })
            })
            .collect())
    }

    fn address_pair_frames(&self, path: &Path) -> Result<Vec<PairFrame>, BackendError> {
        let lines = self.fields(path, &["ip.src", "ip.dst", "frame.len"])?;
        Ok(lines
            .iter()
            .filter_map(|line| {
                let columns = split_columns(line);
                let source = columns.first().copied().unwrap_or("").trim();
                let destination = columns.get(1).copied().unwrap_or("").trim();
                if source.is_empty() || destination.is_empty() {
                    return None;
                }
                let bytes = columns
                    .get(2)
                    .and_then(|c| c.trim().parse::<u64>().ok())
                    .unwrap_or(0);
                Some(PairFrame {
                    source: source.to_string(),
                    destination: destination.to_string(),
                    bytes,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_field_columns_on_tabs() {
        assert_eq!(
            split_columns("10.0.0.1\t10.0.0.2\t74"),
            vec!["10.0.0.1", "10.0.0.2", "74"]
        );
        assert_eq!(split_columns("\t\t60"), vec!["", "", "60"]);
    }
}
