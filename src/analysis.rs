//! Traffic aggregation over capture artifacts.
//!
//! The engine never decodes packets itself: it asks whichever external
//! analysis tool is installed (tshark preferred, tcpdump as fallback) and
//! reduces the answers into one [`TrafficAggregate`]. Zero installed tools
//! is a supported degraded configuration, reported with an explicit marker
//! instead of fabricated numbers.
//!
//! [`TrafficAggregate`]: types::TrafficAggregate

pub mod backend;
pub mod engine;
pub mod tcpdump;
pub mod tshark;
pub mod types;

#[cfg(test)]
mod tests;

pub use backend::{AnalysisBackend, BackendCapability};
pub use engine::TrafficEngine;
pub use types::{ConversationStat, TalkerStat, TrafficAggregate, TrafficPattern};
