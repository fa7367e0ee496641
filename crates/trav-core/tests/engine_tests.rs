use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use trav_core::{
    execute_partitioned, init_tracing, ConfigError, EngineConfig, EngineError, TraversalSource,
};
use trav_process::step::{
    CountStep, FilterStep, FlatMapStep, InjectStep, InspectStep, MapStep, NoOpBarrierStep,
    SideEffectStep,
};
use trav_process::{Traversal, TraversalError, TraversalStrategies};
use trav_strategy::{LambdaRestrictionStrategy, StrategyProfile};
use trav_test_utils::{inject_filter_map, RejectingStrategy};

const CONFIG: &str = r#"
profile = "standard"
strategies = ["InspectStrategy"]
barrier_size = 8
parallelism = 2
sack = 1

[side_effects]
visited = 0
names = ["a", "b"]
"#;

fn fan_out(source: &TraversalSource<i64>) -> Traversal<i64> {
    let mut traversal = source.inject([1, 2, 3]).unwrap();
    traversal
        .add_step(FlatMapStep::new("mod2", |v: &i64| vec![v % 2, v % 2]))
        .unwrap()
        .add_step(MapStep::new("inc", |v: &i64| v + 1))
        .unwrap();
    traversal
}

#[test]
fn test_config_document_parses() {
    init_tracing();
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();

    assert_eq!(config.profile, StrategyProfile::Standard);
    assert_eq!(config.strategies, vec!["InspectStrategy".to_string()]);
    assert_eq!(config.barrier_size, 8);
    assert_eq!(config.parallelism, Some(2));
    assert_eq!(config.sack, Some(json!(1)));
    assert_eq!(config.side_effects.get("names"), Some(&json!(["a", "b"])));
    assert!(!config.inspect_traversers);
}

#[test]
fn test_malformed_config_is_parse_error() {
    let err = EngineConfig::from_toml_str("barrier_size = \"big\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));

    let err = EngineConfig::from_toml_str("profile = \"fast\"").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_invalid_config_rejected_by_source() {
    let config = EngineConfig::new().with_barrier_size(0);
    let err = TraversalSource::<i64>::from_config(&config).unwrap_err();
    assert!(matches!(err, EngineError::Config(ConfigError::Invalid(_))));
}

#[test]
fn test_source_applies_configured_strategies() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let source: TraversalSource<i64> = TraversalSource::from_config(&config).unwrap();
    let mut traversal = fan_out(&source);
    traversal.apply_strategies().unwrap();

    // barrier sized from configuration after the fan-out, inspection last
    assert_eq!(
        traversal.to_string(),
        "[InjectStep([1, 2, 3]), FlatMapStep(mod2), NoOpBarrierStep(8), MapStep(inc), InspectStep]"
    );
    assert!(traversal.step(2).unwrap().is::<NoOpBarrierStep<i64>>());
    assert!(traversal.end_step().is::<InspectStep>());

    let mut values = traversal.to_list().unwrap();
    values.sort_unstable();
    assert_eq!(values, vec![1, 1, 2, 2, 2, 2]);
}

#[test]
fn test_source_seeds_side_effects_and_sack() {
    let config = EngineConfig::from_toml_str(CONFIG).unwrap();
    let source: TraversalSource<i64> = TraversalSource::from_config(&config).unwrap();
    let mut traversal = source.inject([7]).unwrap();

    let traverser = traversal.next_traverser().unwrap();
    assert_eq!(traverser.sack(), Some(&json!(1)));
    assert_eq!(traversal.side_effects().get("visited"), Some(json!(0)));
    assert_eq!(traversal.side_effects().get("names"), Some(json!(["a", "b"])));
}

#[test]
fn test_spawned_traversals_have_separate_stores() {
    let source: TraversalSource<i64> = TraversalSource::new();
    let mut first = source.inject([1, 2, 3]).unwrap();
    first.add_step(SideEffectStep::counter("seen")).unwrap();
    let mut second = source.inject([4]).unwrap();
    second.add_step(SideEffectStep::counter("seen")).unwrap();

    first.iterate().unwrap();
    second.iterate().unwrap();
    assert_eq!(first.side_effects().get("seen"), Some(json!(3)));
    assert_eq!(second.side_effects().get("seen"), Some(json!(1)));
}

#[test]
fn test_strict_profile_rejects_lambdas() {
    let config = EngineConfig::new().with_profile(StrategyProfile::Strict);
    let source: TraversalSource<i64> = TraversalSource::from_config(&config).unwrap();
    let mut traversal = source.inject([1, 2]).unwrap();
    traversal
        .add_step(FilterStep::new("odd", |v: &i64| v % 2 == 1))
        .unwrap();

    let err = traversal.to_list().unwrap_err();
    assert!(matches!(
        err,
        TraversalError::Verification { ref strategy, .. }
            if strategy == LambdaRestrictionStrategy::NAME
    ));
}

#[test]
fn test_source_strategy_overrides() {
    let source: TraversalSource<i64> = TraversalSource::new()
        .with_strategy(RejectingStrategy)
        .unwrap();
    assert!(source.inject([1]).unwrap().has_next().is_err());

    let source = source.without_strategy("RejectingStrategy");
    assert_eq!(source.inject([1]).unwrap().to_list().unwrap(), vec![1]);
}

#[test]
fn test_partitioned_matches_sequential() {
    let mut template: Traversal<i64> = Traversal::new();
    template
        .add_step(FilterStep::new("even", |v: &i64| v % 2 == 0))
        .unwrap()
        .add_step(MapStep::new("times10", |v: &i64| v * 10))
        .unwrap();

    let starts: Vec<i64> = (0..100).collect();
    let mut sequential = template.try_clone().unwrap();
    sequential.add_start_values(starts.clone()).unwrap();
    let expected = sequential.to_list().unwrap();

    let actual = execute_partitioned(&template, starts, 7, Some(3)).unwrap();
    assert_eq!(actual, expected);
}

#[test]
fn test_partitioned_source_template_runs_once() {
    let template = inject_filter_map(&[1, 2, 3, 4]);
    let output = execute_partitioned(&template, Vec::new(), 4, None).unwrap();
    assert_eq!(output, vec![20, 40]);
}

#[test]
fn test_partitioned_source_template_with_starts_matches_sequential() {
    let mut template: Traversal<i64> = Traversal::new();
    template
        .add_step(InjectStep::new([100]))
        .unwrap()
        .add_step(MapStep::new("inc", |v: &i64| v + 1))
        .unwrap();

    let starts = vec![1, 2, 3, 4];
    let mut sequential = template.try_clone().unwrap();
    sequential.add_start_values(starts.clone()).unwrap();
    let expected = sequential.to_list().unwrap();

    let actual = execute_partitioned(&template, starts, 4, Some(2)).unwrap();
    assert_eq!(actual, expected);
    assert_eq!(actual.iter().filter(|v| **v == 101).count(), 1);
}

#[test]
fn test_partitioned_counts_reduce_per_partition() {
    let mut template: Traversal<i64> = Traversal::new();
    template
        .add_step(CountStep::new(|n: u64| i64::try_from(n).unwrap_or(i64::MAX)))
        .unwrap();

    let output = execute_partitioned(&template, (0..9).collect(), 3, None).unwrap();
    assert_eq!(output, vec![3, 3, 3]);
}

#[test]
fn test_partitioned_propagates_lock_failure() {
    let strategies = TraversalStrategies::new()
        .add_strategy(RejectingStrategy)
        .unwrap();
    let mut template: Traversal<i64> = Traversal::new().with_strategies(strategies);
    template
        .add_step(MapStep::new("inc", |v: &i64| v + 1))
        .unwrap();

    let err = execute_partitioned(&template, vec![1, 2], 2, None).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Traversal(TraversalError::Verification { .. })
    ));
}

proptest! {
    #[test]
    fn prop_partitioning_preserves_order(
        values in prop::collection::vec(-50_i64..50, 0..60),
        partitions in 1_usize..9,
    ) {
        let mut template: Traversal<i64> = Traversal::new();
        template.add_step(MapStep::new("neg", |v: &i64| -v)).unwrap();

        let output = execute_partitioned(&template, values.clone(), partitions, None).unwrap();
        prop_assert_eq!(output, values.iter().map(|v| -v).collect::<Vec<_>>());
    }
}
