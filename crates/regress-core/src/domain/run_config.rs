//! Run configurations: nested, named, parameterized engine expressions.
//!
//! A [`ConfigNode`] is only ever rendered to the engine's textual syntax
//! (`name(key=value, ...)`) at the process boundary. Nodes are built through
//! [`crate::domain::registry::Registry::node`], which checks every parameter
//! against the declared schema.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a configuration node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Top-level search / testing engine (`--search`).
    Search,
    /// Policy under test (`--policy`).
    Policy,
    /// Testing oracle.
    Oracle,
    /// Heuristic evaluator.
    Heuristic,
    /// Abstraction builder used by dominance-based oracles.
    AbstractionBuilder,
    /// Merge strategy for merge-and-shrink abstractions.
    MergeStrategy,
    /// Plan cost estimator.
    CostEstimator,
}

impl Kind {
    /// Stable lowercase name used in messages and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Search => "search",
            Kind::Policy => "policy",
            Kind::Oracle => "oracle",
            Kind::Heuristic => "heuristic",
            Kind::AbstractionBuilder => "abstraction_builder",
            Kind::MergeStrategy => "merge_strategy",
            Kind::CostEstimator => "cost_estimator",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value bound to a parameter of a [`ConfigNode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    /// Quoted string literal.
    Str(String),
    /// Bare identifier: a predefined variable (`pi`), an alias (`ehc_ff`)
    /// or a keyword such as `infinity`.
    Symbol(String),
    List(Vec<ParamValue>),
    Node(ConfigNode),
}

impl ParamValue {
    pub fn symbol(name: impl Into<String>) -> Self {
        ParamValue::Symbol(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        ParamValue::Str(value.into())
    }

    /// Short type description for error messages.
    pub fn type_name(&self) -> String {
        match self {
            ParamValue::Bool(_) => "bool".to_string(),
            ParamValue::Int(_) => "int".to_string(),
            ParamValue::Str(_) => "string".to_string(),
            ParamValue::Symbol(s) => format!("symbol '{s}'"),
            ParamValue::List(_) => "list".to_string(),
            ParamValue::Node(node) => format!("{} '{}'", node.kind, node.name),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<ConfigNode> for ParamValue {
    fn from(node: ConfigNode) -> Self {
        ParamValue::Node(node)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Int(i) => write!(f, "{i}"),
            ParamValue::Str(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            ParamValue::Symbol(s) => f.write_str(s),
            ParamValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ParamValue::Node(node) => write!(f, "{node}"),
        }
    }
}

/// One node of a run configuration expression.
///
/// Parameters keep their insertion order so the rendered expression is
/// stable and readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    pub kind: Kind,
    pub name: String,
    pub params: Vec<(String, ParamValue)>,
}

impl ConfigNode {
    /// Look up a bound parameter.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Render the node in the engine's expression syntax.
    pub fn to_expression(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str(")")
    }
}

/// A run configuration together with the label used in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedConfig {
    pub label: String,
    pub node: ConfigNode,
}

impl NamedConfig {
    pub fn new(label: impl Into<String>, node: ConfigNode) -> Self {
        Self {
            label: label.into(),
            node,
        }
    }
}
