use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Traffic volume attributed to one source address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkerStat {
    pub ip: String,
    pub packets: u64,
    pub bytes: u64,
}

/// Directed address-pair aggregate; `A -> B` and `B -> A` are distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationStat {
    pub source: String,
    pub destination: String,
    pub packets: u64,
    pub bytes: u64,
}

/// Derived shape-of-traffic heuristics.
///
/// `bandwidth_usage` is a saturating heuristic (0-100), not a calibrated
/// measurement, and `peak_time` is the artifact's last-modified time, a
/// proxy only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficPattern {
    pub avg_packet_size: f64,
    pub peak_time: DateTime<Utc>,
    pub bandwidth_usage: f64,
}

/// Immutable result of one aggregation call, built fresh each time.
///
/// Protocol bucket sums may exceed `total_packets`: one record can count
/// toward several buckets (TCP and HTTP, say). `backend: None` marks the
/// degraded no-tool-available mode; every count in that case is genuinely
/// zero, never estimated. Serializes to camelCase JSON for the reporting
/// collaborators that feed it to text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficAggregate {
    pub total_packets: u64,
    pub total_size: u64,
    pub duration_secs: f64,
    pub protocols: HashMap<String, u64>,
    pub top_talkers: Vec<TalkerStat>,
    pub conversations: Vec<ConversationStat>,
    pub suspicious_activities: Vec<String>,
    pub traffic_pattern: TrafficPattern,
    /// Name of the tool that answered, or `None` when no tool was available.
    pub backend: Option<String>,
}

/// One record's source address and frame length, as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFrame {
    pub source: String,
    pub bytes: u64,
}

/// One record's directed address pair and frame length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairFrame {
    pub source: String,
    pub destination: String,
    pub bytes: u64,
}
