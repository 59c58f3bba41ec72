//! What a finished engine process looked like, and how it was judged.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// How the engine process ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Termination {
    /// Ran to completion with an exit code.
    Exited { code: i32 },
    /// Killed by a signal it did not handle.
    Signaled { signal: Option<i32> },
    /// Exceeded the wall-clock limit and was killed by the runner.
    TimedOut { limit_ms: u64 },
    /// Could not be run for this case (unreadable instance, wait failure).
    Failed { reason: String },
}

/// Raw observation of one engine run.
///
/// Captured streams are kept as the bytes the engine wrote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration_ms: u64,
}

impl ProcessOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited { code } => Some(code),
            _ => None,
        }
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// True when either stream is not valid UTF-8, so its text is lossy.
    pub fn has_binary_output(&self) -> bool {
        std::str::from_utf8(&self.stdout).is_err() || std::str::from_utf8(&self.stderr).is_err()
    }
}

/// Classification of a test case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
    Error,
    Timeout,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Marker printed at the start of each report line.
    pub fn marker(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Error => "ERROR",
            Verdict::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}
