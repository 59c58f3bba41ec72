//! Exit codes the engine documents for its search component.

/// Symbolic names for the engine's exit codes, used to annotate reports.
pub struct EngineExitCode;

impl EngineExitCode {
    pub const SUCCESS: i32 = 0;
    pub const SEARCH_UNSOLVABLE: i32 = 11;
    /// The testing engine ran to completion and validated its findings.
    pub const SEARCH_COMPLETED: i32 = 12;
    pub const SEARCH_OUT_OF_MEMORY: i32 = 22;
    pub const SEARCH_OUT_OF_TIME: i32 = 23;
    pub const SEARCH_CRITICAL_ERROR: i32 = 32;
    pub const SEARCH_INPUT_ERROR: i32 = 33;
    pub const SEARCH_UNSUPPORTED: i32 = 34;

    /// Symbolic name of a known code.
    pub fn name(code: i32) -> Option<&'static str> {
        match code {
            Self::SUCCESS => Some("SUCCESS"),
            Self::SEARCH_UNSOLVABLE => Some("SEARCH_UNSOLVABLE"),
            Self::SEARCH_COMPLETED => Some("SEARCH_UNSOLVED_INCOMPLETE"),
            Self::SEARCH_OUT_OF_MEMORY => Some("SEARCH_OUT_OF_MEMORY"),
            Self::SEARCH_OUT_OF_TIME => Some("SEARCH_OUT_OF_TIME"),
            Self::SEARCH_CRITICAL_ERROR => Some("SEARCH_CRITICAL_ERROR"),
            Self::SEARCH_INPUT_ERROR => Some("SEARCH_INPUT_ERROR"),
            Self::SEARCH_UNSUPPORTED => Some("SEARCH_UNSUPPORTED"),
            _ => None,
        }
    }

    /// `"12 (SEARCH_UNSOLVED_INCOMPLETE)"`, or just the number when unknown.
    pub fn describe(code: i32) -> String {
        match Self::name(code) {
            Some(name) => format!("{code} ({name})"),
            None => code.to_string(),
        }
    }
}
