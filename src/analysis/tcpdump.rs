//! Line-oriented dump adapter (fallback backend).
//!
//! tcpdump's one-line-per-record output carries no exact frame length for
//! every protocol: lengths come from the printed `length`/size token, which
//! reflects payload rather than on-wire size for some records. Byte totals
//! from this adapter are therefore estimates.

use std::path::Path;

use regex::Regex;

use crate::error_handling::types::BackendError;

use super::backend::{run_tool, version_probe, AnalysisBackend};
use super::types::{PairFrame, SourceFrame};

pub struct TcpdumpBackend {
    addr_re: Regex,
    len_re: Regex,
}

/// One parsed dump line, as far as the heuristics could take it.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct DumpRecord {
    pub source: Option<String>,
    pub destination: Option<String>,
    pub bytes: u64,
    pub stack: String,
}

impl TcpdumpBackend {
    pub fn new() -> Self {
        TcpdumpBackend {
            addr_re: Regex::new(r"\bIP6?\s+(\S+)\s+>\s+(\S+):").expect("hard-coded pattern"),
            len_re: Regex::new(r"(?:length |, length )(\d+)\b|\s(\d+)\s*$")
                .expect("hard-coded pattern"),
        }
    }

    fn read_lines(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let path_arg = path.to_string_lossy();
        let stdout = run_tool("tcpdump", &["-r", path_arg.as_ref(), "-nn", "-q"])?;
        Ok(stdout
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect())
    }

    /// Heuristic column parse of one `-nn -q` line.
    pub(crate) fn parse_line(&self, line: &str) -> DumpRecord {
        let lower = line.to_ascii_lowercase();

        let (source, destination, ports) = match self.addr_re.captures(line) {
            Some(caps) => {
                let (src, src_port) = strip_port(&caps[1]);
                let (dst, dst_port) = strip_port(&caps[2]);
                (Some(src), Some(dst), [src_port, dst_port])
            }
            None => (None, None, [None, None]),
        };

        let bytes = self
            .len_re
            .captures(line)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);

        let mut stack = Vec::new();
        if lower.contains("arp") {
            stack.push("arp");
        } else {
            stack.push("ip");
            if lower.contains("icmp") {
                stack.push("icmp");
            }
            if lower.contains(" tcp") {
                stack.push("tcp");
            }
            if lower.contains(" udp") {
                stack.push("udp");
            }
            for port in ports.into_iter().flatten() {
                match port {
                    53 => stack.push("dns"),
                    80 => stack.push("http"),
                    443 => stack.push("https"),
                    _ => {}
                }
            }
        }

        DumpRecord {
            source,
            destination,
            bytes,
            stack: stack.join(":"),
        }
    }
}

impl Default for TcpdumpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a trailing numeric port off a dump address token.
///
/// tcpdump prints `10.0.0.1.443` for IPv4 and `fe80::1.443` for IPv6; bare
/// addresses (ICMP, ARP targets) carry no port.
pub(crate) fn strip_port(token: &str) -> (String, Option<u16>) {
    if let Some((head, tail)) = token.rsplit_once('.') {
        let dot_count = token.matches('.').count();
        let looks_ported = dot_count == 4 || token.contains(':');
        if looks_ported && !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(port) = tail.parse::<u16>() {
                return (head.to_string(), Some(port));
            }
        }
    }
    (token.to_string(), None)
}

impl AnalysisBackend for TcpdumpBackend {
    fn name(&self) -> &'static str {
        "tcpdump"
    }

    fn probe(&self) -> bool {
        version_probe("tcpdump")
    }

    fn count_records(&self, path: &Path) -> Result<u64, BackendError> {
        Ok(self.read_lines(path)?.len() as u64)
    }

    fn protocol_stacks(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        Ok(self
            .read_lines(path)?
            .iter()
            .map(|line| self.parse_line(line).stack)
            .collect())
    }

    fn source_frames(&self, path: &Path) -> Result<Vec<SourceFrame>, BackendError> {
        Ok(self
            .read_lines(path)?
            .iter()
            .filter_map(|line| {
                let record = self.parse_line(line);
                record.source.map(|source| SourceFrame {
                    source,
                    bytes: record.bytes,
                })
            })
            .collect())
    }

    fn address_pair_frames(&self, path: &Path) -> Result<Vec<PairFrame>, BackendError> {
        Ok(self
            .read_lines(path)?
            .iter()
            .filter_map(|line| {
                let record = self.parse_line(line);
                match (record.source, record.destination) {
                    (Some(source), Some(destination)) => Some(PairFrame {
                        source,
                        destination,
                        bytes: record.bytes,
                    }),
                    _ => None,
                }
            })
            .collect())
    }
}
