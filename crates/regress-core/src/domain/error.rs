//! Configuration-construction error taxonomy.
//!
//! Everything here is a programming error in the test matrix itself, not in
//! the engine under test, so callers abort before any case is dispatched.

use super::run_config::Kind;

/// Errors raised while assembling run configurations or expanding a matrix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid dimension: no {kind} named '{name}' is registered")]
    InvalidDimension { kind: Kind, name: String },

    #[error("invalid parameter '{param}' for {kind} '{name}': {reason}")]
    InvalidParameter {
        kind: Kind,
        name: String,
        param: String,
        reason: String,
    },

    #[error("matrix axis '{axis}' has no values")]
    EmptyAxis { axis: String },

    #[error("invalid output pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid sampling: {0}")]
    InvalidSampling(String),

    #[error("failed to read benchmark directory {path}: {source}")]
    Benchmarks {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while defining or selecting build variants.
#[derive(Debug, thiserror::Error)]
pub enum VariantError {
    #[error("variant '{variant}' defines {key} twice: '{first}' vs '{second}'")]
    Conflict {
        variant: String,
        key: String,
        first: String,
        second: String,
    },

    #[error("variant '{variant}' combines incompatible flags {left} and {right}: {reason}")]
    Incompatible {
        variant: String,
        left: String,
        right: String,
        reason: String,
    },

    #[error("unknown build variant: {0}")]
    Unknown(String),

    #[error("build variant '{0}' is declared more than once")]
    Duplicate(String),

    #[error("malformed build flag: {0}")]
    MalformedFlag(String),
}

/// Result type for configuration-model operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
