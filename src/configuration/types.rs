//! Configuration types for the capture engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error_handling::types::ConfigError;

fn default_summary_talkers() -> usize {
    5
}

fn default_export_talkers() -> usize {
    10
}

fn default_max_conversations() -> usize {
    20
}

fn default_worker_bin() -> PathBuf {
    PathBuf::from("capwatch-worker")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("captures")
}

/// Runtime configuration for capture sessions and traffic aggregation.
///
/// # Fields Overview
///
/// - `worker_bin`: path of the external capture worker executable
/// - `output_dir`: directory where capture artifacts are written
/// - `summary_talkers`: top-talker bound for summary aggregation
/// - `export_talkers`: top-talker bound for export aggregation
/// - `max_conversations`: bound on directed conversation pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_worker_bin")]
    pub worker_bin: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_summary_talkers")]
    pub summary_talkers: usize,

    #[serde(default = "default_export_talkers")]
    pub export_talkers: usize,

    #[serde(default = "default_max_conversations")]
    pub max_conversations: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        CaptureConfig {
            worker_bin: default_worker_bin(),
            output_dir: default_output_dir(),
            summary_talkers: default_summary_talkers(),
            export_talkers: default_export_talkers(),
            max_conversations: default_max_conversations(),
        }
    }
}

impl CaptureConfig {
    /// Validates invariants that the rest of the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_bin.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "worker_bin must not be empty".to_string(),
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "output_dir must not be empty".to_string(),
            ));
        }
        if self.summary_talkers == 0 || self.export_talkers == 0 {
            return Err(ConfigError::InvalidValue(
                "talker bounds must be greater than zero".to_string(),
            ));
        }
        if self.max_conversations == 0 {
            return Err(ConfigError::InvalidValue(
                "max_conversations must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
