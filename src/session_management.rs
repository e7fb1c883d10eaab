//! Capture session lifecycle.
//!
//! One session is one bounded lifetime of an external capture worker plus
//! its tracked state. The registry owns the session table and spawns
//! workers, the event parser turns the worker's stdout into typed events
//! that mutate session state, and the termination coordinator guarantees a
//! usable artifact and a bounded-time stop no matter how the worker behaves.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

/// Submodule for worker event decoding and session mutation.
pub mod events;
/// Submodule for the owned session table and worker spawning.
pub mod registry;
/// Submodule for the escalating stop sequence.
pub mod termination;
/// Submodule for session data structures.
pub mod types;


pub use registry::SessionRegistry;
pub use termination::TerminationCoordinator;
pub use types::{DriverFault, LiveStats, StartOutcome, StopOutcome};

/// Sentinel interface name telling the worker to pick a device itself.
pub const AUTO_DETECT: &str = "auto_detect";

/// The shared session table. Workers run on their own OS schedule, so the
/// host locks around every table mutation; locks are never held across a
/// wait.
pub type SessionTable = Arc<Mutex<HashMap<Uuid, types::CaptureSession>>>;
