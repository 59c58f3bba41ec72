//! End-to-end runs against stub engines written as shell scripts.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use regress_core::{
    discover_instances, standard_policies, standard_searches, AbortReason, CaseMatrix,
    ExpectedOutcome, Registry, Termination, Verdict,
};
use regress_runner::{
    CaseExecutor, EngineInvocation, EngineRunner, PipelineOptions, RunnerError, SuitePipeline,
};
use tempfile::TempDir;
use tokio::sync::watch;

fn write_engine(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("engine.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

fn write_instances(dir: &Path, count: usize) -> PathBuf {
    let sas = dir.join("sas");
    std::fs::create_dir(&sas).unwrap();
    for i in 0..count {
        std::fs::write(sas.join(format!("p{i:02}.sas")), format!("begin_version\n{i}\n")).unwrap();
    }
    sas
}

/// One policy, two searches, every benchmark file under `sas`.
fn small_matrix(sas: &Path) -> CaseMatrix {
    let registry = Registry::standard();
    let policies = standard_policies(&registry).unwrap().into_iter().take(1).collect();
    let searches = standard_searches(&registry).unwrap().into_iter().take(2).collect();
    let matrix = CaseMatrix::new(
        policies,
        searches,
        discover_instances(sas).unwrap(),
        ExpectedOutcome::default(),
    );
    matrix.validate(&registry).unwrap();
    matrix
}

/// Live and not a zombie. Zombies count as dead: they only wait to be reaped.
fn alive(pid: &str) -> bool {
    let pid = pid.trim();
    if Path::new("/proc/self/stat").exists() {
        return match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => !stat
                .rsplit(')')
                .next()
                .is_some_and(|rest| rest.trim_start().starts_with('Z')),
            Err(_) => false,
        };
    }
    std::process::Command::new("/bin/sh")
        .args(["-c", &format!("kill -0 {pid} 2>/dev/null")])
        .status()
        .unwrap()
        .success()
}

/// Polls briefly: SIGKILL delivery is asynchronous.
async fn dies(pid: &str) -> bool {
    for _ in 0..40 {
        if !alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn run(runner: &EngineRunner, matrix: &CaseMatrix, jobs: usize) -> regress_core::SuiteReport {
    let (_tx, rx) = watch::channel(false);
    SuitePipeline::run(
        runner,
        matrix,
        PipelineOptions {
            jobs,
            fail_fast: false,
        },
        rx,
    )
    .await
    .expect("run failed")
}

#[tokio::test]
async fn test_engine_exiting_12_passes_everything() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "cat > /dev/null\nexit 12");
    let matrix = small_matrix(&write_instances(dir.path(), 2));

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    runner.preflight().unwrap();
    let report = run(&runner, &matrix, 1).await;

    assert_eq!(report.counts().pass, 4);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.engine, runner.engine_label());
}

#[tokio::test]
async fn test_engine_exiting_1_fails_everything() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "exit 1");
    let matrix = small_matrix(&write_instances(dir.path(), 2));

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    let report = run(&runner, &matrix, 2).await;

    let counts = report.counts();
    assert_eq!(counts.fail, 4);
    assert_eq!(counts.pass + counts.fail + counts.error + counts.timeout, 4);
    assert_eq!(report.exit_code(), 1);
    let reason = report.results[0].reason.clone().unwrap();
    assert!(reason.contains("bad return code 1"), "{reason}");
}

#[tokio::test]
async fn test_engine_receives_arguments_and_instance() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(
        dir.path(),
        "echo \"policy-flag: $1\"\necho \"policy: $2\"\necho \"search-flag: $3\"\n\
         read first\nread second\necho \"instance: $first $second\"\nexit 12",
    );
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    let report = run(&runner, &matrix, 1).await;

    let first = &report.results[0];
    assert_eq!(first.verdict, Verdict::Pass);
    assert!(first.stdout.contains("policy-flag: --policy"));
    assert!(first
        .stdout
        .contains("policy: pi=heuristic_descend_policy(eval=lmcut())"));
    assert!(first.stdout.contains("search-flag: --search"));
    assert!(first.stdout.contains("instance: begin_version 0"));
}

#[tokio::test]
async fn test_stdout_pattern_contract() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "echo 'bugs found: 0'\nexit 12");
    let sas = write_instances(dir.path(), 1);

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    let mut matrix = small_matrix(&sas);

    matrix.expected = ExpectedOutcome::default()
        .with_stdout_pattern(r"bugs found: \d+")
        .unwrap();
    assert!(run(&runner, &matrix, 1).await.is_success());

    matrix.expected = ExpectedOutcome::default()
        .with_stdout_pattern("Solution found")
        .unwrap();
    let report = run(&runner, &matrix, 1).await;
    assert_eq!(report.counts().fail, 2);
}

#[tokio::test]
async fn test_hanging_engine_times_out_and_is_reaped() {
    let dir = TempDir::new().unwrap();
    let pid_file = dir.path().join("engine.pid");
    let engine = write_engine(
        dir.path(),
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    );
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(
        EngineInvocation::new(engine),
        Some(Duration::from_millis(500)),
    );
    let case = matrix.cases().next().unwrap();
    let started = Instant::now();
    let outcome = runner.execute(&case).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        outcome.termination,
        Termination::TimedOut { limit_ms: 500 }
    ));

    let pid = std::fs::read_to_string(&pid_file).unwrap();
    assert!(dies(&pid).await, "engine process {pid} outlived its case");
}

#[tokio::test]
async fn test_timeout_kills_background_descendants() {
    let dir = TempDir::new().unwrap();
    let bg_file = dir.path().join("bg.pid");
    let engine = write_engine(
        dir.path(),
        &format!("sleep 30 &\necho $! > '{}'\nwait", bg_file.display()),
    );
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(
        EngineInvocation::new(engine),
        Some(Duration::from_millis(500)),
    );
    let case = matrix.cases().next().unwrap();
    let outcome = runner.execute(&case).await.unwrap();
    assert!(matches!(
        outcome.termination,
        Termination::TimedOut { limit_ms: 500 }
    ));

    let bg = std::fs::read_to_string(&bg_file).unwrap();
    assert!(dies(&bg).await, "background process {bg} outlived its case");
}

#[tokio::test]
async fn test_exit_decides_outcome_when_descendant_holds_pipes() {
    let dir = TempDir::new().unwrap();
    let bg_file = dir.path().join("bg.pid");
    let engine = write_engine(
        dir.path(),
        &format!("sleep 5 &\necho $! > '{}'\nexit 12", bg_file.display()),
    );
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(
        EngineInvocation::new(engine),
        Some(Duration::from_secs(3)),
    );
    let case = matrix.cases().next().unwrap();
    let started = Instant::now();
    let outcome = runner.execute(&case).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(outcome.termination, Termination::Exited { code: 12 });
    let bg = std::fs::read_to_string(&bg_file).unwrap();
    assert!(dies(&bg).await, "background process {bg} outlived its case");
}

#[tokio::test]
async fn test_abort_kills_running_engines() {
    let dir = TempDir::new().unwrap();
    let leader_file = dir.path().join("leader.pid");
    let bg_file = dir.path().join("bg.pid");
    let engine = write_engine(
        dir.path(),
        &format!(
            "echo $$ > '{}'\nsleep 30 &\necho $! > '{}'\nwait",
            leader_file.display(),
            bg_file.display()
        ),
    );
    let matrix = small_matrix(&write_instances(dir.path(), 1));
    let runner = EngineRunner::new(EngineInvocation::new(engine), None);

    let (tx, rx) = watch::channel(false);
    let files = (leader_file.clone(), bg_file.clone());
    tokio::spawn(async move {
        // Abort only once the engine and its descendant are both up.
        while !(files.0.exists() && files.1.exists()) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        let _ = tx.send(true);
    });

    let started = Instant::now();
    let report = SuitePipeline::run(&runner, &matrix, PipelineOptions::default(), rx)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(report.aborted, Some(AbortReason::Signal));
    assert!(report.results.len() < report.planned);
    assert_eq!(report.exit_code(), 130);

    let leader = std::fs::read_to_string(&leader_file).unwrap();
    let bg = std::fs::read_to_string(&bg_file).unwrap();
    assert!(dies(&leader).await, "engine {leader} outlived the abort");
    assert!(dies(&bg).await, "background process {bg} outlived the abort");
}

#[tokio::test]
async fn test_binary_output_is_flagged() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "printf 'bugs found: 0\\377\\n'\nexit 12");
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    let report = run(&runner, &matrix, 1).await;

    let first = &report.results[0];
    assert_eq!(first.verdict, Verdict::Pass);
    assert!(first.output_lossy);
    assert!(first.stdout.starts_with("bugs found: 0"));
    assert!(!first.stdout.contains("\\377"));
}

#[tokio::test]
async fn test_timeout_verdict_in_report() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "exec sleep 30");
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(
        EngineInvocation::new(engine),
        Some(Duration::from_millis(300)),
    );
    let report = run(&runner, &matrix, 2).await;
    assert_eq!(report.counts().timeout, 2);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_crashing_engine_is_error() {
    let dir = TempDir::new().unwrap();
    let engine = write_engine(dir.path(), "kill -SEGV $$");
    let matrix = small_matrix(&write_instances(dir.path(), 1));

    let runner = EngineRunner::new(EngineInvocation::new(engine), Some(Duration::from_secs(30)));
    let report = run(&runner, &matrix, 1).await;

    let first = &report.results[0];
    assert_eq!(first.verdict, Verdict::Error);
    assert_eq!(first.signal, Some(11));
    assert_eq!(first.exit_code, None);
}

#[tokio::test]
async fn test_missing_engine_is_launch_error() {
    let dir = TempDir::new().unwrap();
    let matrix = small_matrix(&write_instances(dir.path(), 2));
    let runner = EngineRunner::new(
        EngineInvocation::new(dir.path().join("no-such-engine")),
        None,
    );

    assert!(matches!(runner.preflight(), Err(RunnerError::Launch { .. })));

    let (_tx, rx) = watch::channel(false);
    let err = SuitePipeline::run(&runner, &matrix, PipelineOptions::default(), rx)
        .await
        .unwrap_err();
    assert!(matches!(err, RunnerError::Launch { .. }));
}
