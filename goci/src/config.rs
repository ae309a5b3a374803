//! Configuration for a goci run.

use crate::errors::ConfigError;
use crate::signals::SignalPolicies;
use crate::steps::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings for the Go pipeline.
///
/// Every field has a default, so a config file only names what it changes:
///
/// ```json
/// { "branch": "main", "signals": { "SIGHUP": "ignore" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Timeout for the build, test and format steps. Zero means the default.
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,
    /// Timeout for the push step.
    #[serde(default = "default_push_timeout")]
    pub push_timeout_seconds: u64,
    /// Git remote to push to.
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Branch to push.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Signal policies for the run.
    #[serde(default)]
    pub signals: SignalPolicies,
}

fn default_step_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_push_timeout() -> u64 {
    10
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_branch() -> String {
    "master".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            push_timeout_seconds: default_push_timeout(),
            remote: default_remote(),
            branch: default_branch(),
            signals: SignalPolicies::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the step timeout.
    #[must_use]
    pub fn with_step_timeout(mut self, seconds: u64) -> Self {
        self.step_timeout_seconds = seconds;
        self
    }

    /// Sets the push timeout.
    #[must_use]
    pub fn with_push_timeout(mut self, seconds: u64) -> Self {
        self.push_timeout_seconds = seconds;
        self
    }

    /// Sets the remote.
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// Sets the branch.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Sets the signal policies.
    #[must_use]
    pub fn with_signals(mut self, signals: SignalPolicies) -> Self {
        self.signals = signals;
        self
    }

    /// Returns the step timeout as a duration.
    #[must_use]
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_seconds)
    }

    /// Returns the push timeout as a duration.
    #[must_use]
    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::{Signal, SignalPolicy};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new();
        assert_eq!(config.step_timeout(), Duration::from_secs(30));
        assert_eq!(config.push_timeout(), Duration::from_secs(10));
        assert_eq!(config.remote, "origin");
        assert_eq!(config.branch, "master");
        assert_eq!(config.signals, SignalPolicies::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{"branch": "main", "signals": {"SIGHUP": "ignore", "SIGINT": "abort"}}"#,
        )
        .unwrap();

        assert_eq!(config.branch, "main");
        assert_eq!(config.remote, "origin");
        assert_eq!(config.step_timeout_seconds, 30);
        assert_eq!(config.signals.get(Signal::Hangup), Some(SignalPolicy::Ignore));
        assert_eq!(config.signals.get(Signal::Terminate), None);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = PipelineConfig::from_json_str(r#"{"signals": {"SIGFOO": "abort"}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goci.json");
        std::fs::write(&path, r#"{"push_timeout_seconds": 3}"#).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.push_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_file(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_builder_setters() {
        let config = PipelineConfig::new()
            .with_step_timeout(5)
            .with_push_timeout(2)
            .with_remote("upstream")
            .with_branch("release")
            .with_signals(SignalPolicies::new());

        assert_eq!(config.step_timeout(), Duration::from_secs(5));
        assert_eq!(config.push_timeout(), Duration::from_secs(2));
        assert_eq!(config.remote, "upstream");
        assert_eq!(config.branch, "release");
        assert!(config.signals.is_empty());
    }
}
