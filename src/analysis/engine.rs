//! Aggregation of one capture artifact into traffic statistics.

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::AnalysisError;

use super::backend::{self, AnalysisBackend};
use super::types::{
    ConversationStat, PairFrame, SourceFrame, TalkerStat, TrafficAggregate, TrafficPattern,
};

/// Canonical protocol buckets. A record may land in several buckets at
/// once (a TCP segment carrying HTTP counts as both), so bucket sums may
/// exceed the total record count; downstream consumers rely on that.
fn classify_stack(stack: &str) -> Vec<&'static str> {
    let lower = stack.to_ascii_lowercase();
    let mut buckets = Vec::new();
    for token in lower.split([':', ',', ' ']) {
        let bucket = match token {
            "tcp" => "TCP",
            "udp" => "UDP",
            "icmp" | "icmpv6" => "ICMP",
            "arp" => "ARP",
            "dns" | "mdns" => "DNS",
            "http" | "http2" => "HTTP",
            "https" | "tls" | "ssl" => "HTTPS",
            _ => continue,
        };
        if !buckets.contains(&bucket) {
            buckets.push(bucket);
        }
    }
    buckets
}

/// Turns an artifact into a [`TrafficAggregate`] using whichever backend
/// tool answers a probe. Backends are re-probed on every call; a failing
/// extraction step degrades its own field and never aborts the call.
pub struct TrafficEngine {
    summary_talkers: usize,
    export_talkers: usize,
    max_conversations: usize,
}

impl TrafficEngine {
    pub fn new(config: &CaptureConfig) -> Self {
        TrafficEngine {
            summary_talkers: config.summary_talkers,
            export_talkers: config.export_talkers,
            max_conversations: config.max_conversations,
        }
    }

    /// Summary aggregation (tight talker bound), for in-app display.
    pub fn request_analysis(&self, artifact: &Path) -> Result<TrafficAggregate, AnalysisError> {
        self.aggregate(artifact, self.summary_talkers)
    }

    /// Export aggregation (wider talker bound), JSON-ready for the
    /// reporting collaborators.
    pub fn request_conversion(&self, artifact: &Path) -> Result<TrafficAggregate, AnalysisError> {
        self.aggregate(artifact, self.export_talkers)
    }

    fn aggregate(
        &self,
        artifact: &Path,
        talker_bound: usize,
    ) -> Result<TrafficAggregate, AnalysisError> {
        if !artifact.exists() {
            return Err(AnalysisError::ArtifactNotFound(artifact.to_path_buf()));
        }

        let capability = backend::probe_backends();
        match capability.backend {
            Some(tool) => Ok(self.aggregate_with(tool.as_ref(), artifact, talker_bound)),
            None => Ok(Self::degraded(artifact)),
        }
    }

    pub(crate) fn aggregate_with(
        &self,
        tool: &dyn AnalysisBackend,
        artifact: &Path,
        talker_bound: usize,
    ) -> TrafficAggregate {
        debug!(
            "aggregating {} via {}",
            artifact.display(),
            tool.name()
        );

        let total_packets = match tool.count_records(artifact) {
            Ok(count) => count,
            Err(e) => {
                warn!("record count failed, reporting zero: {}", e);
                0
            }
        };

        let protocols = match tool.protocol_stacks(artifact) {
            Ok(stacks) => Self::histogram(&stacks),
            Err(e) => {
                warn!("protocol extraction failed, histogram degrades: {}", e);
                HashMap::new()
            }
        };

        let source_frames = match tool.source_frames(artifact) {
            Ok(frames) => Some(frames),
            Err(e) => {
                warn!("source extraction failed, talkers degrade: {}", e);
                None
            }
        };

        // Byte totals come from per-record frame lengths when that step
        // worked; the raw artifact size is the fallback.
        let total_size = match &source_frames {
            Some(frames) => frames.iter().map(|f| f.bytes).sum(),
            None => std::fs::metadata(artifact).map(|m| m.len()).unwrap_or(0),
        };

        let top_talkers = source_frames
            .map(|frames| Self::rank_talkers(frames, talker_bound))
            .unwrap_or_default();

        let conversations = match tool.address_pair_frames(artifact) {
            Ok(pairs) => Self::rank_conversations(pairs, self.max_conversations),
            Err(e) => {
                warn!("pair extraction failed, conversations degrade: {}", e);
                Vec::new()
            }
        };

        let duration_secs = Self::artifact_duration(artifact);
        let peak_time = Self::artifact_mtime(artifact);

        let avg_packet_size = if total_packets > 0 {
            total_size as f64 / total_packets as f64
        } else {
            0.0
        };
        let bandwidth_usage =
            ((total_size as f64 / 1_048_576.0) / duration_secs * 8.0 * 100.0).min(100.0);

        let suspicious_activities =
            Self::detect_anomalies(total_packets, &protocols, &top_talkers);

        info!(
            "aggregated {}: {} packets, {} bytes via {}",
            artifact.display(),
            total_packets,
            total_size,
            tool.name()
        );

        TrafficAggregate {
            total_packets,
            total_size,
            duration_secs,
            protocols,
            top_talkers,
            conversations,
            suspicious_activities,
            traffic_pattern: TrafficPattern {
                avg_packet_size,
                peak_time,
                bandwidth_usage,
            },
            backend: Some(tool.name().to_string()),
        }
    }

    /// The explicitly-marked empty result for the no-tool configuration.
    /// Counts are genuinely zero, never estimated.
    pub(crate) fn degraded(artifact: &Path) -> TrafficAggregate {
        info!(
            "no analysis tool available for {}, returning marked empty aggregate",
            artifact.display()
        );
        TrafficAggregate {
            total_packets: 0,
            total_size: 0,
            duration_secs: Self::artifact_duration(artifact),
            protocols: HashMap::new(),
            top_talkers: Vec::new(),
            conversations: Vec::new(),
            suspicious_activities: Vec::new(),
            traffic_pattern: TrafficPattern {
                avg_packet_size: 0.0,
                peak_time: Self::artifact_mtime(artifact),
                bandwidth_usage: 0.0,
            },
            backend: None,
        }
    }

    fn histogram(stacks: &[String]) -> HashMap<String, u64> {
        let mut protocols = HashMap::new();
        for stack in stacks {
            for bucket in classify_stack(stack) {
                *protocols.entry(bucket.to_string()).or_insert(0) += 1;
            }
        }
        protocols
    }

    fn rank_talkers(frames: Vec<SourceFrame>, bound: usize) -> Vec<TalkerStat> {
        let mut by_source: HashMap<String, (u64, u64)> = HashMap::new();
        for frame in frames {
            let entry = by_source.entry(frame.source).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += frame.bytes;
        }
        let mut talkers: Vec<TalkerStat> = by_source
            .into_iter()
            .map(|(ip, (packets, bytes))| TalkerStat { ip, packets, bytes })
            .collect();
        // packets desc, bytes desc, then lexical address for determinism
        talkers.sort_by(|a, b| {
            b.packets
                .cmp(&a.packets)
                .then(b.bytes.cmp(&a.bytes))
                .then(a.ip.cmp(&b.ip))
        });
        talkers.truncate(bound);
        talkers
    }

    fn rank_conversations(pairs: Vec<PairFrame>, bound: usize) -> Vec<ConversationStat> {
        let mut by_pair: HashMap<(String, String), (u64, u64)> = HashMap::new();
        for pair in pairs {
            let entry = by_pair
                .entry((pair.source, pair.destination))
                .or_insert((0, 0));
            entry.0 += 1;
            entry.1 += pair.bytes;
        }
        let mut conversations: Vec<ConversationStat> = by_pair
            .into_iter()
            .map(|((source, destination), (packets, bytes))| ConversationStat {
                source,
                destination,
                packets,
                bytes,
            })
            .collect();
        conversations.sort_by(|a, b| {
            b.packets
                .cmp(&a.packets)
                .then(b.bytes.cmp(&a.bytes))
                .then(a.source.cmp(&b.source))
                .then(a.destination.cmp(&b.destination))
        });
        conversations.truncate(bound);
        conversations
    }

    fn detect_anomalies(
        total_packets: u64,
        protocols: &HashMap<String, u64>,
        top_talkers: &[TalkerStat],
    ) -> Vec<String> {
        let mut findings = Vec::new();
        if total_packets == 0 {
            return findings;
        }

        let distinct = protocols.values().filter(|count| **count > 0).count();
        if distinct > 5 {
            findings.push(format!(
                "protocol diversity: {} distinct protocol types in one capture",
                distinct
            ));
        }

        if let Some(top) = top_talkers.first() {
            if top.packets as f64 / total_packets as f64 > 0.5 {
                findings.push(format!(
                    "single-node high traffic: {} accounts for {:.0}% of packets",
                    top.ip,
                    top.packets as f64 * 100.0 / total_packets as f64
                ));
            }
        }
        findings
    }

    /// Static files carry no capture-duration metadata; the artifact's age
    /// stands in, clamped to (0, 300] seconds with a 30 s fallback.
    fn artifact_duration(artifact: &Path) -> f64 {
        let age = std::fs::metadata(artifact)
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())
            .map(|age| age.as_secs_f64());
        match age {
            Some(secs) if secs > 0.0 && secs <= 300.0 => secs,
            _ => 30.0,
        }
    }

    fn artifact_mtime(artifact: &Path) -> DateTime<Utc> {
        std::fs::metadata(artifact)
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_hits_multiple_buckets() {
        assert_eq!(
            classify_stack("eth:ethertype:ip:tcp:http"),
            vec!["TCP", "HTTP"]
        );
        assert_eq!(
            classify_stack("eth:ethertype:ip:udp:dns"),
            vec!["UDP", "DNS"]
        );
        assert_eq!(classify_stack("eth:ethertype:ip:tcp:tls"), vec!["TCP", "HTTPS"]);
        assert_eq!(classify_stack("eth:ethertype:arp"), vec!["ARP"]);
        assert_eq!(classify_stack("eth:ethertype:ip:icmp"), vec!["ICMP"]);
    }

    #[test]
    fn classification_ignores_unknown_layers() {
        assert!(classify_stack("eth:ethertype:ipx").is_empty());
        assert!(classify_stack("").is_empty());
    }

    #[test]
    fn classification_does_not_double_count_within_one_record() {
        assert_eq!(classify_stack("ip:tcp:tcp:http"), vec!["TCP", "HTTP"]);
    }
}
