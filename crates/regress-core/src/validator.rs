//! Outcome validation: classify a finished engine run against its contract.

use serde::{Deserialize, Serialize};

use crate::domain::{EngineExitCode, ExpectedOutcome, ProcessOutcome, Termination, Verdict};

/// Verdict plus the reason a case did not pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Judgement {
    pub verdict: Verdict,
    /// Empty reason for passing cases.
    pub reason: Option<String>,
}

impl Judgement {
    fn pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            reason: None,
        }
    }

    fn with(verdict: Verdict, reason: String) -> Self {
        Self {
            verdict,
            reason: Some(reason),
        }
    }
}

/// Outcome validation rules.
pub struct OutcomeValidator;

impl OutcomeValidator {
    /// Classify `outcome` against `expected`.
    ///
    /// - `Pass`: exited with the expected code and, when a pattern is set,
    ///   standard output matches it
    /// - `Fail`: ran to completion but the code or output differs
    /// - `Error`: killed by a signal, or could not be run
    /// - `Timeout`: killed by the runner after the wall-clock limit
    pub fn judge(expected: &ExpectedOutcome, outcome: &ProcessOutcome) -> Judgement {
        match &outcome.termination {
            Termination::Exited { code } if *code != expected.exit_code => Judgement::with(
                Verdict::Fail,
                format!(
                    "bad return code {}, expected {}",
                    EngineExitCode::describe(*code),
                    EngineExitCode::describe(expected.exit_code)
                ),
            ),
            Termination::Exited { .. } => match &expected.stdout_pattern {
                Some(pattern) if !pattern.is_match(&outcome.stdout_text()) => Judgement::with(
                    Verdict::Fail,
                    format!("stdout does not match /{}/", pattern.as_str()),
                ),
                _ => Judgement::pass(),
            },
            Termination::Signaled { signal: Some(sig) } => {
                Judgement::with(Verdict::Error, format!("killed by signal {sig}"))
            }
            Termination::Signaled { signal: None } => {
                Judgement::with(Verdict::Error, "terminated without exit code".to_string())
            }
            Termination::TimedOut { limit_ms } => Judgement::with(
                Verdict::Timeout,
                format!("exceeded wall-clock limit of {limit_ms} ms"),
            ),
            Termination::Failed { reason } => Judgement::with(Verdict::Error, reason.clone()),
        }
    }
}
