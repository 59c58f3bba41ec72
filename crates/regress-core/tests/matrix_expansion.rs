//! Expansion order and validation of the regression matrix.

use std::collections::HashSet;

use regress_core::{
    discover_instances, standard_policies, standard_searches, CaseMatrix, ConfigError,
    ConfigNode, ExpectedOutcome, Instance, Kind, NamedConfig, ParamValue, Registry, Sampling,
};
use tempfile::TempDir;

fn instances(names: &[&str]) -> Vec<Instance> {
    names.iter().map(|n| Instance::new(format!("sas/{n}"))).collect()
}

/// Two policies, two oracles, two instances: eight cases, policy slowest.
#[test]
fn test_two_by_two_by_two_order() {
    let registry = Registry::standard();
    let policies: Vec<_> = standard_policies(&registry).unwrap().into_iter().take(2).collect();
    let searches: Vec<_> = standard_searches(&registry).unwrap().into_iter().take(2).collect();
    let matrix = CaseMatrix::new(
        policies.clone(),
        searches.clone(),
        instances(&["i1", "i2"]),
        ExpectedOutcome::default(),
    );
    matrix.validate(&registry).unwrap();

    let cases: Vec<_> = matrix.cases().collect();
    assert_eq!(cases.len(), 8);

    let triples: Vec<(String, String, String)> = cases
        .iter()
        .map(|c| (c.policy.label.clone(), c.search.label.clone(), c.instance.name.clone()))
        .collect();
    let (p1, p2) = (&policies[0].label, &policies[1].label);
    let (o1, o2) = (&searches[0].label, &searches[1].label);
    let expected: Vec<(String, String, String)> = [
        (p1, o1, "i1"),
        (p1, o1, "i2"),
        (p1, o2, "i1"),
        (p1, o2, "i2"),
        (p2, o1, "i1"),
        (p2, o1, "i2"),
        (p2, o2, "i1"),
        (p2, o2, "i2"),
    ]
    .iter()
    .map(|(p, o, i)| (p.to_string(), o.to_string(), i.to_string()))
    .collect();
    assert_eq!(triples, expected);

    let indices: Vec<usize> = cases.iter().map(|c| c.index).collect();
    assert_eq!(indices, (0..8).collect::<Vec<_>>());
}

#[test]
fn test_standard_matrix_size_and_uniqueness() {
    let registry = Registry::standard();
    let matrix = CaseMatrix::new(
        standard_policies(&registry).unwrap(),
        standard_searches(&registry).unwrap(),
        instances(&["a.sas", "b.sas", "c.sas"]),
        ExpectedOutcome::default(),
    );
    matrix.validate(&registry).unwrap();
    assert_eq!(matrix.full_len(), 3 * 17 * 3);

    let identities: HashSet<String> = matrix.cases().map(|c| c.identity()).collect();
    assert_eq!(identities.len(), matrix.full_len());
}

#[test]
fn test_expansion_is_restartable() {
    let registry = Registry::standard();
    let matrix = CaseMatrix::new(
        standard_policies(&registry).unwrap(),
        standard_searches(&registry).unwrap(),
        instances(&["a.sas"]),
        ExpectedOutcome::default(),
    );
    let first: Vec<String> = matrix.cases().map(|c| c.identity()).collect();
    let second: Vec<String> = matrix.cases().map(|c| c.identity()).collect();
    assert_eq!(first, second);
    assert_eq!(matrix.digest(), matrix.digest());
}

#[test]
fn test_sampling_is_deterministic_subset() {
    let registry = Registry::standard();
    let full = CaseMatrix::new(
        standard_policies(&registry).unwrap(),
        standard_searches(&registry).unwrap(),
        instances(&["a.sas", "b.sas"]),
        ExpectedOutcome::default(),
    );
    let sampled = full.clone().with_sampling(Sampling::stride(10, 0).unwrap());

    let all: Vec<String> = full.cases().map(|c| c.identity()).collect();
    let picked: Vec<_> = sampled.cases().collect();
    assert_eq!(picked.len(), (all.len() + 9) / 10);
    for case in &picked {
        assert_eq!(all[case.index], case.identity());
    }
    assert_ne!(full.digest(), sampled.digest());
}

#[test]
fn test_unknown_component_rejected_before_dispatch() {
    let registry = Registry::standard();
    let bogus = ConfigNode {
        kind: Kind::Search,
        name: "simplified_pool_fuzzer".to_string(),
        params: vec![("no_such_option".to_string(), ParamValue::Bool(true))],
    };
    let matrix = CaseMatrix::new(
        standard_policies(&registry).unwrap(),
        vec![NamedConfig::new("bogus", bogus)],
        instances(&["a.sas"]),
        ExpectedOutcome::default(),
    );
    let err = matrix.validate(&registry).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidParameter { .. }), "{err}");
}

#[test]
fn test_discovered_instances_sorted() {
    let dir = TempDir::new().unwrap();
    for name in ["p03.sas", "p01.sas", "p02.sas"] {
        std::fs::write(dir.path().join(name), "begin_version\n").unwrap();
    }
    std::fs::create_dir(dir.path().join("nested")).unwrap();

    let found = discover_instances(dir.path()).unwrap();
    let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["p01.sas", "p02.sas", "p03.sas"]);
}

#[test]
fn test_missing_benchmarks_dir_is_config_error() {
    let err = discover_instances(std::path::Path::new("/no/such/sas")).unwrap_err();
    assert!(matches!(err, ConfigError::Benchmarks { .. }));
}
