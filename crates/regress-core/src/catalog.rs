//! The standard policy-testing regression matrix.
//!
//! Seventeen oracle configurations, each run inside the simplified pool
//! fuzzer, against three heuristic-descend policies.

use crate::domain::error::Result;
use crate::domain::{ConfigNode, Kind, NamedConfig, ParamValue, Registry};

/// Variable the policy is bound to on the command line (`--policy pi=...`).
pub const POLICY_VARIABLE: &str = "pi";

/// Wrap an oracle in the fuzzing engine that exercises it.
pub fn fuzzer_search(registry: &Registry, oracle: ConfigNode) -> Result<ConfigNode> {
    Ok(registry
        .node(Kind::Search, "simplified_pool_fuzzer")?
        .param("policy", ParamValue::symbol(POLICY_VARIABLE))?
        .param("eval", registry.leaf(Kind::Heuristic, "hmax")?)?
        .param("debug", true)?
        .param("testing_method", oracle)?
        .build())
}

/// Policies under test.
pub fn standard_policies(registry: &Registry) -> Result<Vec<NamedConfig>> {
    let descend = |steps_limit: Option<i64>| -> Result<ConfigNode> {
        let mut node = registry
            .node(Kind::Policy, "heuristic_descend_policy")?
            .param("eval", registry.leaf(Kind::Heuristic, "lmcut")?)?;
        if let Some(limit) = steps_limit {
            node = node.param("steps_limit", limit)?;
        }
        Ok(node.build())
    };

    Ok(vec![
        NamedConfig::new("descend-lmcut", descend(None)?),
        NamedConfig::new("descend-lmcut-4", descend(Some(4))?),
        NamedConfig::new("descend-lmcut-10", descend(Some(10))?),
    ])
}

/// Oracle configurations, unwrapped.
pub fn standard_oracles(registry: &Registry) -> Result<Vec<NamedConfig>> {
    let r = registry;
    let atomic = || r.leaf(Kind::AbstractionBuilder, "builder_atomic");
    let massim = || -> Result<ConfigNode> {
        Ok(r.node(Kind::AbstractionBuilder, "builder_massim")?
            .param("merge_strategy", r.leaf(Kind::MergeStrategy, "merge_dfp")?)?
            .build())
    };
    let add = || r.leaf(Kind::Heuristic, "add");
    let estimator = |conf: &str| -> Result<ConfigNode> {
        Ok(r.node(Kind::CostEstimator, "internal_planner_plan_cost_estimator")?
            .param("conf", ParamValue::symbol(conf))?
            .build())
    };
    let oracle = |name: &str| r.node(Kind::Oracle, name);

    let configs = vec![
        (
            "atomic-unrelaxation",
            oracle("atomic_unrelaxation_oracle")?
                .param("abs", atomic()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "unrelaxation-atomic",
            oracle("unrelaxation_oracle")?
                .param("abs", atomic()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-atomic-no-lookahead",
            oracle("iterative_improvement_oracle")?
                .param("conduct_lookahead_search", false)?
                .param("abs", atomic()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-atomic-add",
            oracle("iterative_improvement_oracle")?
                .param("lookahead_heuristic", add()?)?
                .param("abs", atomic()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-atomic-add-deferred",
            oracle("iterative_improvement_oracle")?
                .param("lookahead_heuristic", add()?)?
                .param("deferred_evaluation", true)?
                .param("abs", atomic()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "unrelaxation-massim",
            oracle("unrelaxation_oracle")?
                .param("abs", massim()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-massim-no-lookahead",
            oracle("iterative_improvement_oracle")?
                .param("conduct_lookahead_search", false)?
                .param("abs", massim()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-massim-add",
            oracle("iterative_improvement_oracle")?
                .param("lookahead_heuristic", add()?)?
                .param("abs", massim()?)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-massim-no-lookahead-intermediate",
            oracle("iterative_improvement_oracle")?
                .param("conduct_lookahead_search", false)?
                .param("abs", massim()?)?
                .param("consider_intermediate_states", true)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-massim-add-intermediate",
            oracle("iterative_improvement_oracle")?
                .param("lookahead_heuristic", add()?)?
                .param("abs", massim()?)?
                .param("consider_intermediate_states", true)?
                .param("debug", true)?
                .build(),
        ),
        (
            "iterative-massim-add-intermediate-deferred",
            oracle("iterative_improvement_oracle")?
                .param("lookahead_heuristic", add()?)?
                .param("abs", massim()?)?
                .param("consider_intermediate_states", true)?
                .param("deferred_evaluation", true)?
                .param("debug", true)?
                .build(),
        ),
        (
            "bounded-lookahead-hmax",
            oracle("bounded_lookahead_oracle")?
                .param("max_evaluation_steps", 4)?
                .param("dead_end_eval", r.leaf(Kind::Heuristic, "hmax")?)?
                .build(),
        ),
        (
            "bounded-lookahead",
            oracle("bounded_lookahead_oracle")?.build(),
        ),
        (
            "estimator-ehc-intermediate-parents",
            oracle("estimator_based_oracle")?
                .param("consider_intermediate_states", true)?
                .param("report_parent_bugs", true)?
                .param("oracle", estimator("ehc_ff")?)?
                .build(),
        ),
        (
            "estimator-ehc-parents",
            oracle("estimator_based_oracle")?
                .param("report_parent_bugs", true)?
                .param("oracle", estimator("ehc_ff")?)?
                .build(),
        ),
        (
            "estimator-ehc",
            oracle("estimator_based_oracle")?
                .param("oracle", estimator("ehc_ff")?)?
                .build(),
        ),
        (
            "estimator-astar-lmcut",
            oracle("estimator_based_oracle")?
                .param("oracle", estimator("astar_lmcut")?)?
                .build(),
        ),
    ];

    Ok(configs
        .into_iter()
        .map(|(label, node)| NamedConfig::new(label, node))
        .collect())
}

/// Every standard oracle wrapped in the fuzzing engine, labels preserved.
pub fn standard_searches(registry: &Registry) -> Result<Vec<NamedConfig>> {
    standard_oracles(registry)?
        .into_iter()
        .map(|oracle| {
            Ok(NamedConfig::new(
                oracle.label,
                fuzzer_search(registry, oracle.node)?,
            ))
        })
        .collect()
}
