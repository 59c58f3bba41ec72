//! Engine execution: one child process per test case.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::debug;

use regress_core::{ProcessOutcome, Termination, TestCase};

use crate::invocation::EngineInvocation;

/// Errors that stop a run. Per-case problems are outcomes, not errors.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The engine could not be started at all.
    #[error("failed to launch engine {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// How long captured pipes may stay open after the engine itself exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Executes a single test case.
#[async_trait]
pub trait CaseExecutor: Send + Sync {
    /// Run `case` to completion (or until its limit) and capture the outcome.
    async fn execute(&self, case: &TestCase) -> Result<ProcessOutcome>;

    /// Engine identification recorded in reports.
    fn engine_label(&self) -> String;
}

/// Runs the engine binary as a child process.
#[derive(Debug, Clone)]
pub struct EngineRunner {
    invocation: EngineInvocation,
    timeout: Option<Duration>,
}

impl EngineRunner {
    /// `timeout` of `None` means no wall-clock limit.
    pub fn new(invocation: EngineInvocation, timeout: Option<Duration>) -> Self {
        Self {
            invocation,
            timeout,
        }
    }

    pub fn invocation(&self) -> &EngineInvocation {
        &self.invocation
    }

    /// Check the engine binary exists before anything is dispatched.
    pub fn preflight(&self) -> Result<()> {
        let program = self.invocation.program();
        match std::fs::metadata(program) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(RunnerError::Launch {
                program: program.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            }),
            Err(source) => Err(RunnerError::Launch {
                program: program.to_path_buf(),
                source,
            }),
        }
    }

    fn limit_ms(&self) -> u64 {
        self.timeout.map_or(0, |d| d.as_millis() as u64)
    }
}

#[async_trait]
impl CaseExecutor for EngineRunner {
    async fn execute(&self, case: &TestCase) -> Result<ProcessOutcome> {
        let start = Instant::now();

        let input = match tokio::fs::read(&case.instance.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ProcessOutcome {
                    termination: Termination::Failed {
                        reason: format!(
                            "cannot read instance {}: {e}",
                            case.instance.path.display()
                        ),
                    },
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                });
            }
        };

        debug!(
            index = case.index,
            command = %self.invocation.command_line(case),
            "spawning engine"
        );

        let program = self.invocation.program();
        let mut command = Command::new(program);
        command
            .args(self.invocation.args(case))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The engine leads its own group so its descendants can be killed with it.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| RunnerError::Launch {
            program: program.to_path_buf(),
            source,
        })?;
        // Declared after `child`: dropped first, so an aborted case takes the
        // whole group down before the leader is reaped.
        let mut group = ProcessGroup::of(&child);

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out = Vec::new();
        let mut err = Vec::new();

        let status = {
            let out_buf = &mut out;
            let err_buf = &mut err;

            // The engine may exit without reading its input; write errors
            // are not a case failure.
            let feed = async move {
                if let Some(mut stdin) = stdin {
                    let _ = stdin.write_all(&input).await;
                    let _ = stdin.shutdown().await;
                }
            };
            let drain_out = async move {
                if let Some(mut stdout) = stdout {
                    let _ = stdout.read_to_end(out_buf).await;
                }
            };
            let drain_err = async move {
                if let Some(mut stderr) = stderr {
                    let _ = stderr.read_to_end(err_buf).await;
                }
            };
            let io = async {
                tokio::join!(feed, drain_out, drain_err);
            };
            tokio::pin!(io);

            let child = &mut child;
            let group = &mut group;
            let index = case.index;
            // The engine's own exit decides the outcome; pipes held open by
            // its descendants only get a short grace period.
            let run = async move {
                let waited = child.wait();
                tokio::pin!(waited);
                let (status, io_done) = tokio::select! {
                    status = &mut waited => (status, false),
                    () = &mut io => (waited.as_mut().await, true),
                };
                group.kill();
                if !io_done && tokio::time::timeout(DRAIN_GRACE, &mut io).await.is_err() {
                    debug!(index, "engine output still open after exit, truncated");
                }
                status
            };

            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, run).await.ok(),
                None => Some(run.await),
            }
        };

        let termination = match status {
            Some(Ok(status)) => termination_of(status),
            Some(Err(e)) => Termination::Failed {
                reason: format!("waiting for engine failed: {e}"),
            },
            None => {
                // Kill the group, then reap the leader so nothing outlives the case.
                group.kill();
                if let Err(e) = child.kill().await {
                    debug!(index = case.index, error = %e, "kill after timeout failed");
                }
                Termination::TimedOut {
                    limit_ms: self.limit_ms(),
                }
            }
        };

        Ok(ProcessOutcome {
            termination,
            stdout: out,
            stderr: err,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn engine_label(&self) -> String {
        self.invocation.program().display().to_string()
    }
}

/// The engine's process group, killed on drop.
///
/// The group id is the leader's pid, so killing it after the leader exited
/// only reaches descendants that are still around.
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|id| i32::try_from(id).ok()),
        }
    }

    /// SIGKILL every member. Later calls are no-ops.
    fn kill(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        #[cfg(unix)]
        {
            // SAFETY: killpg takes plain integers and touches no memory of ours.
            let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
            if rc != 0 {
                // ESRCH: the group already emptied.
                debug!(pgid, error = %std::io::Error::last_os_error(), "killpg");
            }
        }
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

fn termination_of(status: ExitStatus) -> Termination {
    match status.code() {
        Some(code) => Termination::Exited { code },
        None => Termination::Signaled {
            signal: signal_of(status),
        },
    }
}

#[cfg(unix)]
fn signal_of(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: ExitStatus) -> Option<i32> {
    None
}
