use std::path::Path;

use log::debug;

use super::types::CaptureConfig;
use crate::error_handling::types::ConfigError;

impl CaptureConfig {
    /// Loads and validates a configuration from a TOML file.
    ///
    /// Missing optional fields fall back to their defaults; a missing file is
    /// an error since the caller asked for that specific path.
    pub fn from_file(path: &Path) -> Result<CaptureConfig, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let raw = std::fs::read_to_string(path)?;
        let config: CaptureConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_file_parses_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
worker_bin = "/usr/local/bin/capture-worker"
output_dir = "/var/lib/capwatch"
summary_talkers = 3
export_talkers = 8
max_conversations = 12
"#
        )
        .unwrap();

        let config = CaptureConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.worker_bin,
            std::path::PathBuf::from("/usr/local/bin/capture-worker")
        );
        assert_eq!(config.summary_talkers, 3);
        assert_eq!(config.export_talkers, 8);
        assert_eq!(config.max_conversations, 12);
    }

    #[test]
    fn from_file_applies_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"worker_bin = "worker""#).unwrap();

        let config = CaptureConfig::from_file(file.path()).unwrap();
        assert_eq!(config.summary_talkers, 5);
        assert_eq!(config.export_talkers, 10);
        assert_eq!(config.max_conversations, 20);
        assert_eq!(config.output_dir, std::path::PathBuf::from("captures"));
    }

    #[test]
    fn from_file_rejects_zero_bounds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "summary_talkers = 0").unwrap();

        assert!(CaptureConfig::from_file(file.path()).is_err());
    }

    #[test]
    fn from_file_reports_missing_file() {
        let missing = Path::new("/nonexistent/capwatch.toml");
        assert!(CaptureConfig::from_file(missing).is_err());
    }

    #[test]
    fn validate_rejects_empty_worker_bin() {
        let config = CaptureConfig {
            worker_bin: std::path::PathBuf::new(),
            ..CaptureConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
