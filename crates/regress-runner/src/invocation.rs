//! Engine command line.

use std::path::{Path, PathBuf};

use regress_core::{TestCase, POLICY_VARIABLE};

/// How the engine is invoked for one case.
///
/// `<engine> --policy <var>=<policy-expr> --search <search-expr>`, with the
/// instance fed on standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    program: PathBuf,
    policy_variable: String,
}

impl EngineInvocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            policy_variable: POLICY_VARIABLE.to_string(),
        }
    }

    /// Bind the policy to a different variable name.
    pub fn with_policy_variable(mut self, variable: impl Into<String>) -> Self {
        self.policy_variable = variable.into();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments for `case`; each expression is a single argument.
    pub fn args(&self, case: &TestCase) -> Vec<String> {
        vec![
            "--policy".to_string(),
            format!("{}={}", self.policy_variable, case.policy.node.to_expression()),
            "--search".to_string(),
            case.search.node.to_expression(),
        ]
    }

    /// Shell-like rendering for logs.
    pub fn command_line(&self, case: &TestCase) -> String {
        let mut line = self.program.display().to_string();
        for arg in self.args(case) {
            line.push(' ');
            if arg.starts_with("--") {
                line.push_str(&arg);
            } else {
                line.push('\'');
                line.push_str(&arg);
                line.push('\'');
            }
        }
        line.push_str(" < ");
        line.push_str(&case.instance.path.display().to_string());
        line
    }
}
