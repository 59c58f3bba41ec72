//! Matrix dispatch: bounded concurrency, ordered results, fail-fast, abort.

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::{info, warn};

use regress_core::{
    render_case_line, AbortReason, CaseMatrix, OutcomeValidator, SuiteReport, TestResult,
};

use crate::runner::{CaseExecutor, Result};

/// Dispatch options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum cases in flight.
    pub jobs: usize,
    /// Stop dispatching after the first non-passing case.
    pub fail_fast: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            fail_fast: false,
        }
    }
}

/// Runs a matrix through an executor and builds the suite report.
pub struct SuitePipeline;

impl SuitePipeline {
    /// Execute every case of `matrix` and collect a report.
    ///
    /// Up to `options.jobs` cases run at once; results are recorded in
    /// expansion order regardless of completion order. Setting the `abort`
    /// flag drops everything in flight (killing the children) and returns
    /// the partial report. A launch failure ends the run with `Err`.
    pub async fn run<E>(
        executor: &E,
        matrix: &CaseMatrix,
        options: PipelineOptions,
        mut abort: watch::Receiver<bool>,
    ) -> Result<SuiteReport>
    where
        E: CaseExecutor + ?Sized,
    {
        let planned = matrix.cases().count();
        let mut report = SuiteReport::new(executor.engine_label(), matrix.digest(), planned);
        let jobs = options.jobs.max(1);

        info!(
            planned,
            jobs,
            fail_fast = options.fail_fast,
            digest = %report.matrix_digest,
            "starting regression run"
        );

        if *abort.borrow() {
            report.finish(Some(AbortReason::Signal));
            return Ok(report);
        }

        let results = stream::iter(matrix.cases())
            .map(|case| async move {
                info!(
                    index = case.index,
                    policy = %case.policy.label,
                    search = %case.search.label,
                    instance = %case.instance.name,
                    "dispatching case"
                );
                let outcome = executor.execute(&case).await;
                (case, outcome)
            })
            .buffered(jobs);
        tokio::pin!(results);

        let mut aborted = None;
        let mut abort_live = true;

        loop {
            tokio::select! {
                biased;

                changed = abort.changed(), if abort_live => {
                    match changed {
                        Ok(()) if *abort.borrow() => {
                            warn!(completed = report.results.len(), "run aborted");
                            aborted = Some(AbortReason::Signal);
                            break;
                        }
                        Ok(()) => {}
                        // Sender gone: nobody can abort any more.
                        Err(_) => abort_live = false,
                    }
                }

                next = results.next() => {
                    let Some((case, outcome)) = next else { break };
                    let outcome = outcome?;
                    let judgement = OutcomeValidator::judge(&case.expected, &outcome);
                    let result = TestResult::new(&case, outcome, judgement);

                    if result.passed() {
                        info!(index = result.index, duration_ms = result.duration_ms, "case passed");
                    } else {
                        warn!("{}", render_case_line(&result));
                    }

                    let stop = options.fail_fast && !result.passed();
                    report.record(result);
                    if stop {
                        aborted = Some(AbortReason::FailFast);
                        break;
                    }
                }
            }
        }

        report.finish(aborted);
        let counts = report.counts();
        info!(
            pass = counts.pass,
            fail = counts.fail,
            error = counts.error,
            timeout = counts.timeout,
            "regression run finished"
        );
        Ok(report)
    }
}
