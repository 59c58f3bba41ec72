//! Engine process runner and dispatch pipeline.
//!
//! - [`EngineInvocation`] renders the engine command line for a case
//! - [`EngineRunner`] runs one case as a child process with a wall-clock limit
//! - [`SuitePipeline`] drives a whole matrix with bounded concurrency,
//!   fail-fast and external abort

pub mod invocation;
pub mod pipeline;
pub mod runner;

pub use invocation::EngineInvocation;
pub use pipeline::{PipelineOptions, SuitePipeline};
pub use runner::{CaseExecutor, EngineRunner, RunnerError};
