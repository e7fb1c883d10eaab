//! External surface of the capture engine.
//!
//! The hosting application (canvas, reporting, chat collaborators) talks to
//! this façade only; the registry, coordinator and engine behind it stay
//! internal.

use std::path::Path;

use log::info;
use uuid::Uuid;

use crate::analysis::engine::TrafficEngine;
use crate::analysis::types::TrafficAggregate;
use crate::configuration::types::CaptureConfig;
use crate::error_handling::types::{AnalysisError, SessionError};
use crate::session_management::registry::SessionRegistry;
use crate::session_management::termination::TerminationCoordinator;
use crate::session_management::types::{DriverFault, LiveStats, StartOutcome, StopOutcome};

pub struct CaptureService {
    registry: SessionRegistry,
    coordinator: TerminationCoordinator,
    engine: TrafficEngine,
}

impl CaptureService {
    pub fn new(config: CaptureConfig) -> Self {
        info!(
            "capture service ready (worker: {}, output: {})",
            config.worker_bin.display(),
            config.output_dir.display()
        );
        let engine = TrafficEngine::new(&config);
        let registry = SessionRegistry::new(config);
        let coordinator = TerminationCoordinator::new(registry.table());
        CaptureService {
            registry,
            coordinator,
            engine,
        }
    }

    /// Starts a capture session; see [`SessionRegistry::start`].
    pub async fn start_capture(
        &self,
        interface: Option<&str>,
        duration_hint: Option<u64>,
    ) -> Result<StartOutcome, SessionError> {
        self.registry.start(interface, duration_hint).await
    }

    /// Live snapshot of a running session.
    pub async fn get_stats(&self, session_id: Uuid) -> Result<LiveStats, SessionError> {
        self.registry.get_stats(session_id).await
    }

    /// Driver fault attached to a running session, if any.
    pub async fn get_driver_error(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DriverFault>, SessionError> {
        self.registry.get_driver_error(session_id).await
    }

    /// Stops a session with the full escalation/materialization guarantee;
    /// see [`TerminationCoordinator::stop`].
    pub async fn stop_capture(&self, session_id: Uuid) -> Result<StopOutcome, SessionError> {
        self.coordinator.stop(session_id).await
    }

    /// Summary statistics for an artifact.
    pub fn request_analysis(&self, artifact: &Path) -> Result<TrafficAggregate, AnalysisError> {
        self.engine.request_analysis(artifact)
    }

    /// Export statistics for an artifact, meant to be serialized as prompt
    /// context for the report-generation collaborator.
    pub fn request_conversion(&self, artifact: &Path) -> Result<TrafficAggregate, AnalysisError> {
        self.engine.request_conversion(artifact)
    }

    pub async fn active_sessions(&self) -> usize {
        self.registry.active_count().await
    }
}
