//! Driver configuration.
//!
//! Loaded from an optional TOML file; the CLI overlays flags and
//! environment variables on top, and anything left unset keeps the
//! defaults below.
//!
//! ```
//! use regress_core::config::DriverConfig;
//!
//! let config = DriverConfig::from_toml_str(r#"
//!     engine = "builds/release/bin/downward"
//!     timeout_secs = 120
//!     jobs = 4
//! "#).unwrap();
//!
//! assert_eq!(config.jobs, 4);
//! assert_eq!(config.expected_exit_code, 12);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{EngineExitCode, ExpectedOutcome};
use crate::matrix::Sampling;

/// Driver configuration error.
#[derive(Debug, Error)]
pub enum DriverConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Config(#[from] crate::domain::ConfigError),
}

/// Settings of one regression run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DriverConfig {
    /// Engine executable.
    pub engine: PathBuf,

    /// Directory of benchmark instances.
    pub benchmarks: PathBuf,

    /// Wall-clock limit per case in seconds (0 = unbounded).
    pub timeout_secs: u64,

    /// Cases in flight at once.
    pub jobs: usize,

    /// Exit code every case must produce.
    pub expected_exit_code: i32,

    /// Optional regex standard output must match.
    pub stdout_pattern: Option<String>,

    /// Stop dispatching after the first non-passing case.
    pub fail_fast: bool,

    /// Run only every N-th case of the matrix.
    pub sample_every: Option<usize>,

    /// Directory for per-case logs of non-passing cases.
    pub log_dir: Option<PathBuf>,

    /// Path of the JSON report.
    pub report_json: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            engine: PathBuf::from("../builds/debug/bin/downward"),
            benchmarks: PathBuf::from("sas"),
            timeout_secs: 600,
            jobs: 1,
            expected_exit_code: EngineExitCode::SEARCH_COMPLETED,
            stdout_pattern: None,
            fail_fast: false,
            sample_every: None,
            log_dir: None,
            report_json: None,
        }
    }
}

impl DriverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DriverConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DriverConfigError> {
        if self.jobs == 0 {
            return Err(DriverConfigError::Invalid(
                "jobs must be at least 1".to_string(),
            ));
        }
        if self.sample_every == Some(0) {
            return Err(DriverConfigError::Invalid(
                "sample_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-case wall-clock limit, `None` when unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// The exit-code (and optional output) contract applied to every case.
    pub fn expected_outcome(&self) -> Result<ExpectedOutcome, DriverConfigError> {
        let expected = ExpectedOutcome::exit_code(self.expected_exit_code);
        match &self.stdout_pattern {
            Some(pattern) => Ok(expected.with_stdout_pattern(pattern)?),
            None => Ok(expected),
        }
    }

    pub fn sampling(&self) -> Result<Sampling, DriverConfigError> {
        match self.sample_every {
            None | Some(1) => Ok(Sampling::Full),
            Some(every) => Ok(Sampling::stride(every, 0)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.engine, PathBuf::from("../builds/debug/bin/downward"));
        assert_eq!(config.benchmarks, PathBuf::from("sas"));
        assert_eq!(config.jobs, 1);
        assert_eq!(config.expected_exit_code, 12);
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DriverConfig::from_toml_str("timeout_secs = 0\nfail_fast = true\n").unwrap();
        assert!(config.fail_fast);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DriverConfig::from_toml_str("engines = \"x\"\n").unwrap_err();
        assert!(matches!(err, DriverConfigError::Toml(_)));
    }

    #[test]
    fn test_zero_jobs_rejected() {
        let err = DriverConfig::from_toml_str("jobs = 0\n").unwrap_err();
        assert!(err.to_string().contains("jobs"));
    }

    #[test]
    fn test_expected_outcome_with_pattern() {
        let config = DriverConfig {
            expected_exit_code: 0,
            stdout_pattern: Some("Solution found".to_string()),
            ..DriverConfig::default()
        };
        let expected = config.expected_outcome().unwrap();
        assert_eq!(expected.exit_code, 0);
        assert_eq!(expected.pattern_str(), Some("Solution found"));
    }

    #[test]
    fn test_sampling_from_config() {
        let mut config = DriverConfig::default();
        assert_eq!(config.sampling().unwrap(), Sampling::Full);
        config.sample_every = Some(5);
        assert_eq!(
            config.sampling().unwrap(),
            Sampling::Stride { every: 5, offset: 0 }
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = DriverConfig::load("/no/such/regress.toml").unwrap_err();
        assert!(matches!(err, DriverConfigError::Io(_)));
    }
}
