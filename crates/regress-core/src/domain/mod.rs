//! Domain model for the regression driver.
//!
//! Leaves first: run configurations and their registry, build variants,
//! test cases with their expected outcome, and the observed process outcome.

pub mod case;
pub mod error;
pub mod exit_code;
pub mod outcome;
pub mod registry;
pub mod run_config;
pub mod variant;

pub use case::{discover_instances, ExpectedOutcome, Instance, TestCase};
pub use error::{ConfigError, Result, VariantError};
pub use exit_code::EngineExitCode;
pub use outcome::{ProcessOutcome, Termination, Verdict};
pub use registry::{NodeBuilder, ParamType, Registry, Schema};
pub use run_config::{ConfigNode, Kind, NamedConfig, ParamValue};
pub use variant::{known_incompatibilities, BuildFlag, BuildVariant, Incompatibility, VariantCatalog};
