//! Regression driver core
//!
//! Configuration model, matrix expansion, outcome validation and reporting
//! for validating an external search engine across a cross product of run
//! configurations and benchmark instances.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod git;
pub mod matrix;
pub mod reporter;
pub mod telemetry;
pub mod validator;

pub use catalog::{
    fuzzer_search, standard_oracles, standard_policies, standard_searches, POLICY_VARIABLE,
};
pub use config::{DriverConfig, DriverConfigError};
pub use domain::{
    discover_instances, BuildFlag, BuildVariant, ConfigError, ConfigNode, EngineExitCode,
    ExpectedOutcome, Instance, Kind, NamedConfig, ParamType, ParamValue, ProcessOutcome, Registry,
    Termination, TestCase, VariantCatalog, VariantError, Verdict,
};
pub use git::{capture_head_sha, engine_revision};
pub use matrix::{CaseMatrix, IndexProduct, Matrix, Sampling};
pub use reporter::{
    render_case_line, write_report_json, AbortReason, SuiteReport, TestResult, VerdictCounts,
    EXIT_ABORTED, EXIT_FATAL, EXIT_NON_PASSING, EXIT_OK,
};
pub use telemetry::init_tracing;
pub use validator::{Judgement, OutcomeValidator};

/// Driver version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
