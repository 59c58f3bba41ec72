//! Test cases and the expected-outcome contract.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::{ConfigError, Result};
use super::exit_code::EngineExitCode;
use super::run_config::NamedConfig;

/// One benchmark problem, fed to the engine on standard input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Instance {
    pub name: String,
    pub path: PathBuf,
}

impl Instance {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }
}

/// Regular files of a benchmark directory, sorted by file name.
pub fn discover_instances(dir: &Path) -> Result<Vec<Instance>> {
    let io_err = |source: std::io::Error| ConfigError::Benchmarks {
        path: dir.to_path_buf(),
        source,
    };

    let mut instances = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_file() {
            instances.push(Instance::new(entry.path()));
        }
    }
    instances.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(instances)
}

/// Contract a finished engine run must satisfy for the case to pass.
#[derive(Debug, Clone)]
pub struct ExpectedOutcome {
    pub exit_code: i32,
    pub stdout_pattern: Option<Regex>,
}

impl ExpectedOutcome {
    pub fn exit_code(code: i32) -> Self {
        Self {
            exit_code: code,
            stdout_pattern: None,
        }
    }

    /// Additionally require standard output to match `pattern`.
    pub fn with_stdout_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        self.stdout_pattern = Some(regex);
        Ok(self)
    }

    pub fn pattern_str(&self) -> Option<&str> {
        self.stdout_pattern.as_ref().map(Regex::as_str)
    }
}

impl Default for ExpectedOutcome {
    fn default() -> Self {
        Self::exit_code(EngineExitCode::SEARCH_COMPLETED)
    }
}

/// The unit of work: one configuration pair on one instance.
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Position in expansion order.
    pub index: usize,
    pub policy: NamedConfig,
    pub search: NamedConfig,
    pub instance: Instance,
    pub expected: ExpectedOutcome,
}

impl TestCase {
    /// Stable identity used for digests and log file names.
    pub fn identity(&self) -> String {
        format!(
            "{} | {} | {}",
            self.policy.node, self.search.node, self.instance.name
        )
    }
}
