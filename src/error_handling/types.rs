use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::InvalidValue(e) => write!(f, "Invalid configuration value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Lifecycle-level session failures. These surface to the caller; everything
/// that happens after a worker is running is absorbed into session state
/// instead (see `DriverFault`).
#[derive(Debug)]
pub enum SessionError {
    /// The worker process could not be started. No session is registered.
    SpawnFailed(String),
    /// No session with the given id exists in the registry.
    NotFound,
    IoError(std::io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SpawnFailed(e) => write!(f, "Worker spawn failed: {}", e),
            SessionError::NotFound => write!(f, "Session not found"),
            SessionError::IoError(e) => write!(f, "Session IO error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::IoError(err)
    }
}

/// Failures of a single backend tool invocation. These never abort a whole
/// aggregation call; the affected field degrades to empty/zero instead.
#[derive(Debug)]
pub enum BackendError {
    Unavailable,
    InvocationFailed(String),
    OutputUnreadable(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Unavailable => write!(f, "Analysis tool not available"),
            BackendError::InvocationFailed(e) => write!(f, "Analysis tool invocation failed: {}", e),
            BackendError::OutputUnreadable(e) => write!(f, "Analysis tool output unreadable: {}", e),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug)]
pub enum AnalysisError {
    /// The artifact does not exist on disk. Distinct from a zero-packet
    /// capture, which aggregates successfully.
    ArtifactNotFound(PathBuf),
    Backend(BackendError),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::ArtifactNotFound(p) => {
                write!(f, "Capture artifact not found: {}", p.display())
            }
            AnalysisError::Backend(e) => write!(f, "Analysis backend error: {}", e),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl From<BackendError> for AnalysisError {
    fn from(err: BackendError) -> Self {
        AnalysisError::Backend(err)
    }
}
