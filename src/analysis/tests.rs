//! Aggregation behavior against a scripted backend.
//!
//! External tools are not assumed on test machines; a mock backend feeds
//! the engine exact record sets so ordering, bounds, degradation and
//! anomaly rules can be asserted deterministically.

use std::path::{Path, PathBuf};

use crate::analysis::backend::AnalysisBackend;
use crate::analysis::engine::TrafficEngine;
use crate::analysis::types::{PairFrame, SourceFrame};
use crate::artifact::pcap;
use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::{AnalysisError, BackendError};

#[derive(Default)]
struct MockBackend {
    stacks: Vec<String>,
    sources: Vec<SourceFrame>,
    pairs: Vec<PairFrame>,
    fail_count: bool,
    fail_stacks: bool,
    fail_sources: bool,
    fail_pairs: bool,
}

impl MockBackend {
    fn fail(step: &str) -> BackendError {
        BackendError::InvocationFailed(format!("mock {} failure", step))
    }
}

impl AnalysisBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn probe(&self) -> bool {
        true
    }

    fn count_records(&self, _path: &Path) -> Result<u64, BackendError> {
        if self.fail_count {
            return Err(Self::fail("count"));
        }
        Ok(self.stacks.len() as u64)
    }

    fn protocol_stacks(&self, _path: &Path) -> Result<Vec<String>, BackendError> {
        if self.fail_stacks {
            return Err(Self::fail("stacks"));
        }
        Ok(self.stacks.clone())
    }

    fn source_frames(&self, _path: &Path) -> Result<Vec<SourceFrame>, BackendError> {
        if self.fail_sources {
            return Err(Self::fail("sources"));
        }
        Ok(self.sources.clone())
    }

    fn address_pair_frames(&self, _path: &Path) -> Result<Vec<PairFrame>, BackendError> {
        if self.fail_pairs {
            return Err(Self::fail("pairs"));
        }
        Ok(self.pairs.clone())
    }
}

fn frame(source: &str, bytes: u64) -> SourceFrame {
    SourceFrame {
        source: source.to_string(),
        bytes,
    }
}

fn pair(source: &str, destination: &str, bytes: u64) -> PairFrame {
    PairFrame {
        source: source.to_string(),
        destination: destination.to_string(),
        bytes,
    }
}

fn fixture() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.pcap");
    pcap::write_placeholder(&path).unwrap();
    (dir, path)
}

fn engine() -> TrafficEngine {
    TrafficEngine::new(&CaptureConfig::default())
}

#[test]
fn missing_artifact_is_an_error_not_an_empty_result() {
    let result = engine().request_analysis(Path::new("/nonexistent/capture.pcap"));
    assert!(matches!(result, Err(AnalysisError::ArtifactNotFound(_))));
}

#[test]
fn zero_record_artifact_aggregates_to_marked_zeroes() {
    let (_dir, path) = fixture();
    let mock = MockBackend::default();

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.total_packets, 0);
    assert_eq!(aggregate.total_size, 0);
    assert!(aggregate.protocols.is_empty());
    assert!(aggregate.top_talkers.is_empty());
    assert!(aggregate.conversations.is_empty());
    assert!(aggregate.suspicious_activities.is_empty());
    assert_eq!(aggregate.traffic_pattern.avg_packet_size, 0.0);
    // the tool ran: this is a genuine empty capture, not degraded mode
    assert_eq!(aggregate.backend.as_deref(), Some("mock"));
}

#[test]
fn degraded_mode_is_observably_different_from_empty_capture() {
    let (_dir, path) = fixture();

    let degraded = TrafficEngine::degraded(&path);
    assert_eq!(degraded.total_packets, 0);
    assert!(degraded.backend.is_none());

    let empty_but_ran = engine().aggregate_with(&MockBackend::default(), &path, 5);
    assert_eq!(empty_but_ran.total_packets, 0);
    assert!(empty_but_ran.backend.is_some());
}

#[test]
fn dominant_source_is_ranked_first_and_flagged() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    for _ in 0..100 {
        mock.stacks.push("eth:ethertype:ip:tcp".to_string());
        mock.sources.push(frame("10.0.0.1", 74));
    }
    for _ in 0..5 {
        mock.stacks.push("eth:ethertype:ip:tcp".to_string());
        mock.sources.push(frame("10.0.0.2", 74));
    }

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.total_packets, 105);
    assert_eq!(aggregate.top_talkers[0].ip, "10.0.0.1");
    assert_eq!(aggregate.top_talkers[0].packets, 100);
    assert_eq!(aggregate.protocols.get("TCP"), Some(&105));
    assert!(aggregate
        .suspicious_activities
        .iter()
        .any(|finding| finding.contains("single-node high traffic")));
}

#[test]
fn talkers_are_sorted_and_bounded() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    // 8 distinct sources with descending record counts 8..1
    for (index, count) in (1..=8u64).rev().enumerate() {
        let ip = format!("10.0.0.{}", index + 1);
        for _ in 0..count {
            mock.stacks.push("ip:udp".to_string());
            mock.sources.push(frame(&ip, 100));
        }
    }

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.top_talkers.len(), 5);
    let packet_counts: Vec<u64> = aggregate.top_talkers.iter().map(|t| t.packets).collect();
    assert_eq!(packet_counts, vec![8, 7, 6, 5, 4]);
}

#[test]
fn talker_ties_break_on_bytes_then_address() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["ip:tcp".to_string(); 3];
    mock.sources = vec![
        frame("10.0.0.9", 100),
        frame("10.0.0.2", 200),
        frame("10.0.0.1", 200),
    ];

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    let order: Vec<&str> = aggregate
        .top_talkers
        .iter()
        .map(|t| t.ip.as_str())
        .collect();
    // equal packets everywhere: larger bytes first, then lexical address
    assert_eq!(order, vec!["10.0.0.1", "10.0.0.2", "10.0.0.9"]);
}

#[test]
fn conversations_are_directed() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["ip:tcp".to_string(); 3];
    mock.pairs = vec![
        pair("10.0.0.1", "10.0.0.2", 100),
        pair("10.0.0.1", "10.0.0.2", 100),
        pair("10.0.0.2", "10.0.0.1", 50),
    ];

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.conversations.len(), 2);
    assert_eq!(aggregate.conversations[0].source, "10.0.0.1");
    assert_eq!(aggregate.conversations[0].packets, 2);
    assert_eq!(aggregate.conversations[0].bytes, 200);
    assert_eq!(aggregate.conversations[1].source, "10.0.0.2");
    assert_eq!(aggregate.conversations[1].packets, 1);
}

#[test]
fn conversations_are_bounded() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    for i in 0..25 {
        mock.stacks.push("ip:udp".to_string());
        mock.pairs
            .push(pair(&format!("10.0.1.{}", i), "10.0.0.1", 60));
    }

    let aggregate = engine().aggregate_with(&mock, &path, 5);
    assert_eq!(aggregate.conversations.len(), 20);
}

#[test]
fn one_failing_step_degrades_only_its_field() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["ip:tcp:http".to_string(); 4];
    mock.pairs = vec![pair("10.0.0.1", "10.0.0.2", 80)];
    mock.fail_sources = true;

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    // talkers degrade, byte total falls back to the on-disk size
    assert!(aggregate.top_talkers.is_empty());
    assert_eq!(aggregate.total_size, 24);
    // everything else still ran
    assert_eq!(aggregate.total_packets, 4);
    assert_eq!(aggregate.protocols.get("HTTP"), Some(&4));
    assert_eq!(aggregate.conversations.len(), 1);
}

#[test]
fn count_failure_reports_zero_but_keeps_going() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["ip:udp:dns".to_string(); 2];
    mock.sources = vec![frame("10.0.0.1", 60), frame("10.0.0.1", 60)];
    mock.fail_count = true;

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.total_packets, 0);
    assert_eq!(aggregate.protocols.get("DNS"), Some(&2));
    assert_eq!(aggregate.top_talkers.len(), 1);
    // anomaly heuristics stay silent without a packet total
    assert!(aggregate.suspicious_activities.is_empty());
    // and the zero total never divides
    assert_eq!(aggregate.traffic_pattern.avg_packet_size, 0.0);
}

#[test]
fn bucket_sums_may_exceed_total_packets() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["eth:ethertype:ip:tcp:http".to_string(); 10];

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    assert_eq!(aggregate.total_packets, 10);
    assert_eq!(aggregate.protocols.get("TCP"), Some(&10));
    assert_eq!(aggregate.protocols.get("HTTP"), Some(&10));
    let bucket_sum: u64 = aggregate.protocols.values().sum();
    assert!(bucket_sum > aggregate.total_packets);
}

#[test]
fn protocol_diversity_fires_above_five_buckets() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    for stack in [
        "ip:tcp",
        "ip:udp",
        "ip:icmp",
        "arp",
        "ip:udp:dns",
        "ip:tcp:http",
    ] {
        mock.stacks.push(stack.to_string());
    }

    let aggregate = engine().aggregate_with(&mock, &path, 5);

    let distinct = aggregate.protocols.values().filter(|c| **c > 0).count();
    assert_eq!(distinct, 6);
    assert!(aggregate
        .suspicious_activities
        .iter()
        .any(|finding| finding.contains("protocol diversity")));
}

#[test]
fn bandwidth_heuristic_saturates_at_one_hundred() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    for _ in 0..1000 {
        mock.stacks.push("ip:tcp".to_string());
        mock.sources.push(frame("10.0.0.1", 1_000_000));
    }

    let aggregate = engine().aggregate_with(&mock, &path, 5);
    assert!(aggregate.traffic_pattern.bandwidth_usage <= 100.0);
}

#[test]
fn export_aggregate_serializes_to_camel_case_json() {
    let (_dir, path) = fixture();
    let mut mock = MockBackend::default();
    mock.stacks = vec!["ip:tcp".to_string()];
    mock.sources = vec![frame("10.0.0.1", 74)];
    mock.pairs = vec![pair("10.0.0.1", "10.0.0.2", 74)];

    let aggregate = engine().aggregate_with(&mock, &path, 10);
    let value = serde_json::to_value(&aggregate).unwrap();

    assert!(value.get("totalPackets").is_some());
    assert!(value.get("topTalkers").is_some());
    assert!(value.get("suspiciousActivities").is_some());
    assert!(value["trafficPattern"].get("avgPacketSize").is_some());
    assert_eq!(value["backend"], serde_json::json!("mock"));
    assert_eq!(value["conversations"][0]["destination"], "10.0.0.2");
}
