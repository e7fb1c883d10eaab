//! Capture artifact helpers.
//!
//! Workers own artifact files while they run; this module only synthesizes
//! the zero-record fallback, writes the human-readable sidecar note, and
//! answers size probes during shutdown.

pub mod pcap;
pub mod sidecar;

pub use pcap::{non_empty_size, write_placeholder};
pub use sidecar::write_note;
