//! Regression driver CLI
//!
//! The `regress` command runs the policy-testing configuration matrix
//! against a search engine build and gates CI on the exit-code contract.
//!
//! ## Commands
//!
//! - `run`: execute the matrix and report
//! - `list`: print the expanded matrix without running anything
//! - `variant`: inspect the build variant catalog
//!
//! Exit status of `run`: 0 when every case passed, 1 when any case did not,
//! 2 for configuration or launch errors, 130 when interrupted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn, Level};

use regress_core::{
    discover_instances, engine_revision, standard_policies, standard_searches, write_report_json,
    CaseMatrix, DriverConfig, Registry, VariantCatalog, EXIT_FATAL,
};
use regress_runner::{EngineInvocation, EngineRunner, PipelineOptions, SuitePipeline};

#[derive(Parser)]
#[command(name = "regress")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Configuration-matrix regression driver for the search engine", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every case of the matrix against the engine
    Run(RunArgs),

    /// Print the expanded matrix in dispatch order
    List {
        #[command(flatten)]
        matrix: MatrixArgs,

        /// Print full configuration expressions
        #[arg(long)]
        expressions: bool,
    },

    /// Inspect build variants
    Variant {
        #[command(subcommand)]
        action: VariantAction,
    },
}

#[derive(Subcommand)]
enum VariantAction {
    /// List variant names
    List,

    /// Print the flags of one variant, one -DKEY=VALUE per line
    Show {
        /// Variant name
        name: String,
    },
}

/// Options shared by every command that expands the matrix.
#[derive(Args, Debug, Default)]
struct MatrixArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of benchmark instances
    #[arg(long, env = "REGRESS_BENCHMARKS")]
    benchmarks: Option<PathBuf>,

    /// Run only every N-th case
    #[arg(long)]
    sample_every: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    matrix: MatrixArgs,

    /// Engine executable
    #[arg(long, env = "REGRESS_ENGINE")]
    engine: Option<PathBuf>,

    /// Wall-clock limit per case in seconds (0 = unbounded)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Cases to run concurrently
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Exit code every case must produce
    #[arg(long)]
    expected_exit_code: Option<i32>,

    /// Regex the engine's standard output must match
    #[arg(long)]
    stdout_pattern: Option<String>,

    /// Stop after the first non-passing case
    #[arg(long)]
    fail_fast: bool,

    /// Run every case even if the config file sets `fail_fast`
    #[arg(long, conflicts_with = "fail_fast")]
    no_fail_fast: bool,

    /// Write a log file per non-passing case into this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Write the JSON report to this file
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Do not print captured output of non-passing cases
    #[arg(short, long)]
    quiet_output: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    regress_core::init_tracing(cli.json, level);

    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_FATAL
        }
    };
    std::process::exit(code);
}

async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => cmd_run(args).await,
        Commands::List {
            matrix,
            expressions,
        } => cmd_list(&matrix, expressions).map(|()| 0),
        Commands::Variant { action } => cmd_variant(action).map(|()| 0),
    }
}

/// File (if any) first, then flags and environment on top.
fn resolve_config(matrix: &MatrixArgs, run: Option<&RunArgs>) -> Result<DriverConfig> {
    let mut config = match &matrix.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => DriverConfig::default(),
    };

    if let Some(benchmarks) = &matrix.benchmarks {
        config.benchmarks = benchmarks.clone();
    }
    if matrix.sample_every.is_some() {
        config.sample_every = matrix.sample_every;
    }

    if let Some(run) = run {
        if let Some(engine) = &run.engine {
            config.engine = engine.clone();
        }
        if let Some(timeout) = run.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(jobs) = run.jobs {
            config.jobs = jobs;
        }
        if let Some(code) = run.expected_exit_code {
            config.expected_exit_code = code;
        }
        if run.stdout_pattern.is_some() {
            config.stdout_pattern = run.stdout_pattern.clone();
        }
        if run.fail_fast {
            config.fail_fast = true;
        }
        if run.no_fail_fast {
            config.fail_fast = false;
        }
        if run.log_dir.is_some() {
            config.log_dir = run.log_dir.clone();
        }
        if run.report_json.is_some() {
            config.report_json = run.report_json.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

/// Expand and validate the standard matrix for `config`.
fn build_matrix(config: &DriverConfig) -> Result<CaseMatrix> {
    let registry = Registry::standard();
    let policies = standard_policies(&registry)?;
    let searches = standard_searches(&registry)?;
    let instances = discover_instances(&config.benchmarks)?;

    let matrix = CaseMatrix::new(policies, searches, instances, config.expected_outcome()?)
        .with_sampling(config.sampling()?);
    matrix.validate(&registry)?;
    Ok(matrix)
}

async fn cmd_run(args: RunArgs) -> Result<i32> {
    let config = resolve_config(&args.matrix, Some(&args))?;
    let matrix = build_matrix(&config)?;

    let runner = EngineRunner::new(EngineInvocation::new(&config.engine), config.timeout());
    runner.preflight()?;

    info!(
        engine = %config.engine.display(),
        benchmarks = %config.benchmarks.display(),
        instances = matrix.instances.len(),
        "matrix ready"
    );

    let (abort_tx, abort_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping");
            let _ = abort_tx.send(true);
        }
    });

    let options = PipelineOptions {
        jobs: config.jobs,
        fail_fast: config.fail_fast,
    };
    let report = SuitePipeline::run(&runner, &matrix, options, abort_rx)
        .await?
        .with_engine_revision(engine_revision(&config.engine));

    print!("{}", report.render_text(!args.quiet_output));

    if let Some(dir) = &config.log_dir {
        let written = report.write_case_logs(dir)?;
        if !written.is_empty() {
            println!("Case logs: {} file(s) in {}", written.len(), dir.display());
        }
    }
    if let Some(path) = &config.report_json {
        write_report_json(path, &report)?;
        println!("Report: {}", path.display());
    }

    Ok(report.exit_code())
}

fn cmd_list(args: &MatrixArgs, expressions: bool) -> Result<()> {
    let config = resolve_config(args, None)?;
    let matrix = build_matrix(&config)?;

    let mut count = 0;
    for case in matrix.cases() {
        if expressions {
            println!(
                "#{} {} | {} | {}",
                case.index,
                case.policy.node,
                case.search.node,
                case.instance.name
            );
        } else {
            println!(
                "#{} policy={} search={} instance={}",
                case.index, case.policy.label, case.search.label, case.instance.name
            );
        }
        count += 1;
    }

    println!();
    println!(
        "{} of {} case(s), digest {}",
        count,
        matrix.full_len(),
        matrix.digest()
    );
    Ok(())
}

fn cmd_variant(action: VariantAction) -> Result<()> {
    let catalog = VariantCatalog::standard()?;
    match action {
        VariantAction::List => print!("{}", render_variant_list(&catalog)),
        VariantAction::Show { name } => {
            for arg in catalog.get(&name)?.to_args() {
                println!("{arg}");
            }
        }
    }
    Ok(())
}

fn render_variant_list(catalog: &VariantCatalog) -> String {
    let mut out = String::new();
    for name in catalog.names() {
        out.push_str(name);
        if name == catalog.default_variant().name() {
            out.push_str(" (default)");
        }
        if name == catalog.debug_variant().name() {
            out.push_str(" (debug)");
        }
        out.push('\n');
    }
    out
}
