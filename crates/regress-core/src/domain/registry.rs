//! Registry of the engine plugins a run configuration may reference.
//!
//! Each `(Kind, name)` pair carries a parameter schema. The builder returned
//! by [`Registry::node`] refuses unknown pairs, unknown or duplicated
//! parameters and values of the wrong type, so a malformed expression never
//! reaches the engine process.

use std::collections::BTreeMap;

use super::error::{ConfigError, Result};
use super::run_config::{ConfigNode, Kind, ParamValue};

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    /// Integer; the engine also accepts the keyword `infinity`.
    Int,
    Str,
    Symbol,
    /// Nested node of the given kind, or a symbol naming a predefined
    /// variable of that kind (e.g. `policy=pi`).
    Node(Kind),
    List(Box<ParamType>),
}

impl ParamType {
    /// Whether `value` is acceptable for this type.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamType::Bool, ParamValue::Bool(_)) => true,
            (ParamType::Int, ParamValue::Int(_)) => true,
            (ParamType::Int, ParamValue::Symbol(s)) => s == "infinity",
            (ParamType::Str, ParamValue::Str(_)) => true,
            (ParamType::Symbol, ParamValue::Symbol(_)) => true,
            (ParamType::Node(kind), ParamValue::Node(node)) => node.kind == *kind,
            (ParamType::Node(_), ParamValue::Symbol(_)) => true,
            (ParamType::List(inner), ParamValue::List(items)) => {
                items.iter().all(|item| inner.accepts(item))
            }
            _ => false,
        }
    }

    fn describe(&self) -> String {
        match self {
            ParamType::Bool => "bool".to_string(),
            ParamType::Int => "int".to_string(),
            ParamType::Str => "string".to_string(),
            ParamType::Symbol => "symbol".to_string(),
            ParamType::Node(kind) => kind.to_string(),
            ParamType::List(inner) => format!("list of {}", inner.describe()),
        }
    }
}

/// Parameter schema of one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub params: BTreeMap<String, ParamType>,
}

/// Registry of known plugins keyed by `(kind, name)`.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<(Kind, String), Schema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plugin and its parameters.
    pub fn declare(mut self, kind: Kind, name: &str, params: &[(&str, ParamType)]) -> Self {
        let schema = Schema {
            params: params
                .iter()
                .map(|(k, t)| (k.to_string(), t.clone()))
                .collect(),
        };
        self.entries.insert((kind, name.to_string()), schema);
        self
    }

    /// Declare an oracle; the options every oracle inherits are added.
    pub fn declare_oracle(self, name: &str, params: &[(&str, ParamType)]) -> Self {
        let mut all: Vec<(&str, ParamType)> = oracle_base_params();
        all.extend(params.iter().cloned());
        self.declare(Kind::Oracle, name, &all)
    }

    pub fn contains(&self, kind: Kind, name: &str) -> bool {
        self.entries.contains_key(&(kind, name.to_string()))
    }

    pub fn schema(&self, kind: Kind, name: &str) -> Option<&Schema> {
        self.entries.get(&(kind, name.to_string()))
    }

    /// Registered names of a kind, in lexicographic order.
    pub fn names(&self, kind: Kind) -> Vec<&str> {
        self.entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    /// Start building a node. Fails with `InvalidDimension` for an unknown pair.
    pub fn node(&self, kind: Kind, name: &str) -> Result<NodeBuilder<'_>> {
        let schema = self
            .schema(kind, name)
            .ok_or_else(|| ConfigError::InvalidDimension {
                kind,
                name: name.to_string(),
            })?;
        Ok(NodeBuilder {
            schema,
            node: ConfigNode {
                kind,
                name: name.to_string(),
                params: Vec::new(),
            },
        })
    }

    /// Build a node without parameters.
    pub fn leaf(&self, kind: Kind, name: &str) -> Result<ConfigNode> {
        Ok(self.node(kind, name)?.build())
    }

    /// Recursively check a node that was not produced by a [`NodeBuilder`].
    pub fn validate(&self, node: &ConfigNode) -> Result<()> {
        let mut builder = self.node(node.kind, &node.name)?;
        for (key, value) in &node.params {
            self.validate_value(value)?;
            builder = builder.param(key, value.clone())?;
        }
        Ok(())
    }

    fn validate_value(&self, value: &ParamValue) -> Result<()> {
        match value {
            ParamValue::Node(inner) => self.validate(inner),
            ParamValue::List(items) => items.iter().try_for_each(|v| self.validate_value(v)),
            _ => Ok(()),
        }
    }

    /// Plugins exercised by the policy-testing regression matrix, with the
    /// option names the engine declares for them.
    pub fn standard() -> Self {
        use ParamType::*;

        let heuristic = || Node(Kind::Heuristic);
        let abstraction = || Node(Kind::AbstractionBuilder);

        Self::new()
            .declare(
                Kind::Search,
                "simplified_pool_fuzzer",
                &[
                    ("policy", Node(Kind::Policy)),
                    ("testing_method", Node(Kind::Oracle)),
                    ("eval", heuristic()),
                    ("debug", Bool),
                    ("verbose", Bool),
                    ("max_walk_length", Int),
                    ("pool_file", Str),
                    ("disable_novelty_store", Bool),
                    ("novelty_statistics", Int),
                    ("check_policy_unsolved", Bool),
                    ("descend_unsolved", Bool),
                    ("max_pool_size", Int),
                    ("max_steps", Int),
                    ("seed", Int),
                    ("read_policy_cache", Bool),
                    ("just_write_policy_cache", Bool),
                ],
            )
            .declare(
                Kind::Policy,
                "heuristic_descend_policy",
                &[
                    ("eval", heuristic()),
                    ("strictly_descend", Bool),
                    ("steps_limit", Int),
                ],
            )
            .declare_oracle(
                "atomic_unrelaxation_oracle",
                &[
                    ("abs", abstraction()),
                    ("truncate_value", Int),
                    ("max_simulation_time", Int),
                    ("max_total_time", Int),
                    ("dump", Bool),
                ],
            )
            .declare_oracle(
                "unrelaxation_oracle",
                &[
                    ("abs", abstraction()),
                    ("operations_per_state", Int),
                    ("max_evaluation_steps", Int),
                    ("dead_end_eval", heuristic()),
                ],
            )
            .declare_oracle(
                "iterative_improvement_oracle",
                &[
                    ("abs", abstraction()),
                    ("conduct_lookahead_search", Bool),
                    ("lookahead_heuristic", heuristic()),
                    ("deferred_evaluation", Bool),
                    ("update_parents", Bool),
                    ("max_state_comparisons", Int),
                    ("max_lookahead_state_comparisons", Int),
                    ("max_lookahead_state_visits", Int),
                    ("domain_unit_cost_and_invertible", Bool),
                    ("lookahead_comp", Symbol),
                ],
            )
            .declare_oracle(
                "bounded_lookahead_oracle",
                &[
                    ("depth", Int),
                    ("max_evaluation_steps", Int),
                    ("dead_end_eval", heuristic()),
                    ("cache_results", Bool),
                ],
            )
            .declare_oracle(
                "estimator_based_oracle",
                &[
                    ("oracle", Node(Kind::CostEstimator)),
                    ("cache_results", Bool),
                ],
            )
            .declare_oracle(
                "composite_oracle",
                &[
                    ("qual_oracle", Node(Kind::Oracle)),
                    ("quant_oracle", Node(Kind::Oracle)),
                    ("metamorphic_oracle", Node(Kind::Oracle)),
                    ("enforce_external", Bool),
                ],
            )
            .declare_oracle(
                "sequence_oracle",
                &[
                    ("first_oracle", Node(Kind::Oracle)),
                    ("second_oracle", Node(Kind::Oracle)),
                ],
            )
            .declare(Kind::Heuristic, "add", &[])
            .declare(Kind::Heuristic, "hmax", &[])
            .declare(Kind::Heuristic, "ff", &[])
            .declare(Kind::Heuristic, "lmcut", &[])
            .declare(Kind::Heuristic, "blind", &[])
            .declare(Kind::AbstractionBuilder, "builder_atomic", &[])
            .declare(
                Kind::AbstractionBuilder,
                "builder_massim",
                &[("merge_strategy", Node(Kind::MergeStrategy))],
            )
            .declare(Kind::MergeStrategy, "merge_dfp", &[])
            .declare(
                Kind::MergeStrategy,
                "merge_linear",
                &[("variable_order", Symbol)],
            )
            .declare(
                Kind::CostEstimator,
                "internal_planner_plan_cost_estimator",
                &[
                    ("debug", Bool),
                    ("conf", Symbol),
                    ("print_output", Bool),
                    ("print_plan", Bool),
                    ("max_planner_time", Int),
                    ("continue_after_time_out", Bool),
                ],
            )
    }
}

/// Options declared by the oracle base and its testing-component base.
fn oracle_base_params() -> Vec<(&'static str, ParamType)> {
    vec![
        ("debug", ParamType::Bool),
        ("report_parent_bugs", ParamType::Bool),
        ("consider_intermediate_states", ParamType::Bool),
        ("enforce_intermediate", ParamType::Bool),
    ]
}

/// Incremental, schema-checked construction of a [`ConfigNode`].
#[derive(Debug, Clone)]
pub struct NodeBuilder<'r> {
    schema: &'r Schema,
    node: ConfigNode,
}

impl<'r> NodeBuilder<'r> {
    /// Bind a parameter. Fails with `InvalidParameter` when the name is not
    /// declared, was already bound, or the value has the wrong type.
    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Result<Self> {
        let value = value.into();
        let invalid = |reason: String| ConfigError::InvalidParameter {
            kind: self.node.kind,
            name: self.node.name.clone(),
            param: key.to_string(),
            reason,
        };

        let expected = self
            .schema
            .params
            .get(key)
            .ok_or_else(|| invalid("not declared".to_string()))?;
        if self.node.param(key).is_some() {
            return Err(invalid("supplied twice".to_string()));
        }
        if !expected.accepts(&value) {
            return Err(invalid(format!(
                "expected {}, got {}",
                expected.describe(),
                value.type_name()
            )));
        }

        self.node.params.push((key.to_string(), value));
        Ok(self)
    }

    pub fn build(self) -> ConfigNode {
        self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_pair_is_invalid_dimension() {
        let registry = Registry::standard();
        let err = registry.node(Kind::Oracle, "lmcut").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDimension { kind: Kind::Oracle, .. }));
    }

    #[test]
    fn test_undeclared_parameter_rejected() {
        let registry = Registry::standard();
        let err = registry
            .node(Kind::Policy, "heuristic_descend_policy")
            .unwrap()
            .param("depth", 3)
            .unwrap_err();
        match err {
            ConfigError::InvalidParameter { param, reason, .. } => {
                assert_eq!(param, "depth");
                assert!(reason.contains("not declared"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inherited_oracle_options_accepted() {
        let registry = Registry::standard();
        let node = registry
            .node(Kind::Oracle, "bounded_lookahead_oracle")
            .unwrap()
            .param("debug", true)
            .unwrap()
            .param("consider_intermediate_states", true)
            .unwrap()
            .build();
        assert_eq!(
            node.to_expression(),
            "bounded_lookahead_oracle(debug=true, consider_intermediate_states=true)"
        );

        for name in registry.names(Kind::Oracle) {
            for option in ["debug", "report_parent_bugs", "enforce_intermediate"] {
                assert!(
                    registry.node(Kind::Oracle, name).unwrap().param(option, true).is_ok(),
                    "{name} rejects {option}"
                );
            }
        }
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let registry = Registry::standard();
        let err = registry
            .node(Kind::Oracle, "bounded_lookahead_oracle")
            .unwrap()
            .param("depth", 2)
            .unwrap()
            .param("depth", 3)
            .unwrap_err();
        assert!(err.to_string().contains("supplied twice"));
    }

    #[test]
    fn test_node_kind_mismatch_rejected() {
        let registry = Registry::standard();
        let oracle = registry.leaf(Kind::Oracle, "bounded_lookahead_oracle").unwrap();
        let err = registry
            .node(Kind::Policy, "heuristic_descend_policy")
            .unwrap()
            .param("eval", oracle)
            .unwrap_err();
        assert!(err.to_string().contains("expected heuristic"));
    }

    #[test]
    fn test_symbol_accepted_for_node_and_infinity_for_int() {
        let registry = Registry::standard();
        let node = registry
            .node(Kind::Search, "simplified_pool_fuzzer")
            .unwrap()
            .param("policy", ParamValue::symbol("pi"))
            .unwrap()
            .param("max_steps", ParamValue::symbol("infinity"))
            .unwrap()
            .build();
        assert_eq!(node.to_expression(), "simplified_pool_fuzzer(policy=pi, max_steps=infinity)");

        let err = registry
            .node(Kind::Search, "simplified_pool_fuzzer")
            .unwrap()
            .param("seed", ParamValue::symbol("random"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParameter { .. }));
    }

    #[test]
    fn test_validate_walks_nested_nodes() {
        let registry = Registry::standard();
        let bogus = ConfigNode {
            kind: Kind::Oracle,
            name: "unrelaxation_oracle".to_string(),
            params: vec![(
                "abs".to_string(),
                ParamValue::Node(ConfigNode {
                    kind: Kind::AbstractionBuilder,
                    name: "builder_massim".to_string(),
                    params: vec![("shrink".to_string(), ParamValue::Bool(true))],
                }),
            )],
        };
        let err = registry.validate(&bogus).unwrap_err();
        match err {
            ConfigError::InvalidParameter { name, param, .. } => {
                assert_eq!(name, "builder_massim");
                assert_eq!(param, "shrink");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_names_lists_registered_heuristics() {
        let registry = Registry::standard();
        let names = registry.names(Kind::Heuristic);
        assert_eq!(names, vec!["add", "blind", "ff", "hmax", "lmcut"]);
    }
}
