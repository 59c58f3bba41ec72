//! Suite report: per-case results in expansion order plus aggregate counts.
//!
//! Two output artifacts for CI consumers:
//! - a human-readable text report (one line per case, captured streams of
//!   every non-passing case, totals)
//! - a machine-readable JSON report, and optionally one log file per
//!   non-passing case for post-mortem

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{EngineExitCode, ProcessOutcome, TestCase, Termination, Verdict};
use crate::validator::Judgement;

/// Process exit status when every case passed.
pub const EXIT_OK: i32 = 0;
/// Process exit status when at least one case did not pass.
pub const EXIT_NON_PASSING: i32 = 1;
/// Process exit status for configuration or launch errors.
pub const EXIT_FATAL: i32 = 2;
/// Process exit status after an external abort.
pub const EXIT_ABORTED: i32 = 130;

/// Finalized result of one test case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
    pub index: usize,
    pub policy_label: String,
    pub policy_expr: String,
    pub search_label: String,
    pub search_expr: String,
    pub instance: String,
    pub expected_exit_code: i32,
    pub expected_pattern: Option<String>,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Captured output was not valid UTF-8 and is shown lossily decoded.
    #[serde(default)]
    pub output_lossy: bool,
    pub duration_ms: u64,
    pub verdict: Verdict,
    pub reason: Option<String>,
}

impl TestResult {
    pub fn new(case: &TestCase, outcome: ProcessOutcome, judgement: Judgement) -> Self {
        let exit_code = outcome.exit_code();
        let signal = match outcome.termination {
            Termination::Signaled { signal } => signal,
            _ => None,
        };
        Self {
            index: case.index,
            policy_label: case.policy.label.clone(),
            policy_expr: case.policy.node.to_expression(),
            search_label: case.search.label.clone(),
            search_expr: case.search.node.to_expression(),
            instance: case.instance.name.clone(),
            expected_exit_code: case.expected.exit_code,
            expected_pattern: case.expected.pattern_str().map(str::to_string),
            exit_code,
            signal,
            stdout: outcome.stdout_text().into_owned(),
            stderr: outcome.stderr_text().into_owned(),
            output_lossy: outcome.has_binary_output(),
            duration_ms: outcome.duration_ms,
            verdict: judgement.verdict,
            reason: judgement.reason,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict.is_pass()
    }
}

/// Aggregate verdict counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerdictCounts {
    pub pass: usize,
    pub fail: usize,
    pub error: usize,
    pub timeout: usize,
}

impl VerdictCounts {
    pub fn total(&self) -> usize {
        self.pass + self.fail + self.error + self.timeout
    }

    pub fn non_passing(&self) -> usize {
        self.fail + self.error + self.timeout
    }

    fn add(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Pass => self.pass += 1,
            Verdict::Fail => self.fail += 1,
            Verdict::Error => self.error += 1,
            Verdict::Timeout => self.timeout += 1,
        }
    }
}

/// Why a run stopped before the matrix was exhausted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// External cancellation (e.g. Ctrl-C).
    Signal,
    /// `fail_fast` stopped dispatch after the first non-passing case.
    FailFast,
}

/// Report of one matrix run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteReport {
    pub schema_version: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub engine: String,
    pub engine_revision: Option<String>,
    pub matrix_digest: String,
    /// Number of cases the matrix expands to (after sampling).
    pub planned: usize,
    pub results: Vec<TestResult>,
    pub aborted: Option<AbortReason>,
}

impl SuiteReport {
    pub fn new(engine: impl Into<String>, matrix_digest: impl Into<String>, planned: usize) -> Self {
        Self {
            schema_version: "1".to_string(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            engine: engine.into(),
            engine_revision: None,
            matrix_digest: matrix_digest.into(),
            planned,
            results: Vec::new(),
            aborted: None,
        }
    }

    pub fn with_engine_revision(mut self, revision: Option<String>) -> Self {
        self.engine_revision = revision;
        self
    }

    /// Append a finalized result. Results are expected in expansion order.
    pub fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn finish(&mut self, aborted: Option<AbortReason>) {
        self.aborted = aborted;
        self.finished_at = Some(Utc::now());
    }

    pub fn counts(&self) -> VerdictCounts {
        let mut counts = VerdictCounts::default();
        for result in &self.results {
            counts.add(result.verdict);
        }
        counts
    }

    pub fn non_passing(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed())
    }

    /// True iff every recorded case passed and the run was not cut short.
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.counts().non_passing() == 0
    }

    /// Process exit status for the driver.
    pub fn exit_code(&self) -> i32 {
        match self.aborted {
            Some(AbortReason::Signal) => EXIT_ABORTED,
            _ if self.is_success() => EXIT_OK,
            _ => EXIT_NON_PASSING,
        }
    }

    /// Render the full text report.
    ///
    /// With `show_output`, captured stdout/stderr of every non-passing case
    /// is printed inline after its line.
    pub fn render_text(&self, show_output: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Regression run {} ({})", self.run_id, self.engine);
        if let Some(rev) = &self.engine_revision {
            let _ = writeln!(out, "Engine revision: {rev}");
        }
        out.push('\n');

        for result in &self.results {
            out.push_str(&render_case_line(result));
            out.push('\n');
            if show_output && !result.passed() {
                out.push_str(&render_diagnostics(result));
            }
        }

        out.push('\n');
        out.push_str(&self.render_summary());
        out
    }

    /// Aggregate counts, one line, plus the abort note if any.
    pub fn render_summary(&self) -> String {
        let counts = self.counts();
        let mut out = format!(
            "{} case(s): {} passed, {} failed, {} errors, {} timeouts\n",
            counts.total(),
            counts.pass,
            counts.fail,
            counts.error,
            counts.timeout
        );
        match self.aborted {
            Some(AbortReason::Signal) => {
                let _ = writeln!(
                    out,
                    "Run aborted after {} of {} case(s)",
                    counts.total(),
                    self.planned
                );
            }
            Some(AbortReason::FailFast) => {
                let _ = writeln!(
                    out,
                    "Stopped after first non-passing case ({} of {} run)",
                    counts.total(),
                    self.planned
                );
            }
            None => {}
        }
        out
    }

    /// Write one log file per non-passing case into `dir`.
    pub fn write_case_logs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).with_context(|| format!("create {:?}", dir))?;
        let mut written = Vec::new();
        for result in self.non_passing() {
            let path = dir.join(format!("case-{:05}.log", result.index));
            let mut content = render_case_line(result);
            content.push('\n');
            let _ = writeln!(content, "policy:   {}", result.policy_expr);
            let _ = writeln!(content, "search:   {}", result.search_expr);
            let _ = writeln!(content, "instance: {}", result.instance);
            content.push_str(&render_diagnostics(result));
            std::fs::write(&path, content).with_context(|| format!("write {:?}", path))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// One report line: marker, identifying context, timing.
pub fn render_case_line(result: &TestResult) -> String {
    let mut line = format!(
        "[{}] #{} policy={} search={} instance={} ({} ms)",
        result.verdict.marker(),
        result.index,
        result.policy_label,
        result.search_label,
        result.instance,
        result.duration_ms
    );
    if let Some(reason) = &result.reason {
        let _ = write!(line, ": {reason}");
    }
    line
}

fn render_diagnostics(result: &TestResult) -> String {
    let mut out = String::new();
    let observed = match (result.exit_code, result.signal) {
        (Some(code), _) => EngineExitCode::describe(code),
        (None, Some(sig)) => format!("signal {sig}"),
        (None, None) => "none".to_string(),
    };
    let _ = writeln!(
        out,
        "    observed: {observed}, expected: {}",
        EngineExitCode::describe(result.expected_exit_code)
    );
    if let Some(pattern) = &result.expected_pattern {
        let _ = writeln!(out, "    expected stdout pattern: /{pattern}/");
    }
    if result.output_lossy {
        let _ = writeln!(out, "    note: output is not valid UTF-8, shown lossily decoded");
    }
    let _ = writeln!(out, "    stdout:\n{}", indent(&result.stdout));
    let _ = writeln!(out, "    stderr:\n{}", indent(&result.stderr));
    out
}

fn indent(text: &str) -> String {
    if text.is_empty() {
        return "      <empty>".to_string();
    }
    text.lines()
        .map(|l| format!("      {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the report as pretty JSON.
pub fn write_report_json(path: &Path, report: &SuiteReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize suite report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
