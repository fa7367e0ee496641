use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use trav_process::helper;
use trav_process::step::{
    FilterStep, FlatMapStep, IdentityStep, InjectStep, InspectStep, LocalStep, MapStep,
    NoOpBarrierStep,
};
use trav_process::{Traversal, TraversalError, TraversalStrategies, TraverserRequirement};
use trav_strategy::{
    InspectStrategy, LazyBarrierStrategy, SideEffectStrategy, StrategyProfile, StrategyRegistry,
};

fn standard() -> TraversalStrategies<i64> {
    StrategyRegistry::with_defaults()
        .profile(StrategyProfile::Standard)
        .unwrap()
}

fn pipeline(strategies: TraversalStrategies<i64>) -> Traversal<i64> {
    let mut child: Traversal<i64> = Traversal::new();
    child
        .add_step(IdentityStep::new())
        .unwrap()
        .add_step(FilterStep::new("positive", |v: &i64| *v > 0))
        .unwrap()
        .add_step(FilterStep::new("small", |v: &i64| *v < 100))
        .unwrap();

    let mut root = Traversal::new().with_strategies(strategies);
    root.add_step(InjectStep::new([-1, 3, 3, 150]))
        .unwrap()
        .add_step(IdentityStep::new())
        .unwrap()
        .add_step(LocalStep::new(child))
        .unwrap()
        .add_step(MapStep::new("double", |v: &i64| v * 2))
        .unwrap();
    root
}

#[test]
fn test_standard_profile_rewrites_whole_tree() {
    let mut traversal = pipeline(standard());
    traversal.apply_strategies().unwrap();

    assert_eq!(
        traversal.to_string(),
        "[InjectStep([-1, 3, 3, 150]), \
         LocalStep([FilterStep(positive && small)]), \
         NoOpBarrierStep(2500), MapStep(double)]"
    );
    assert_eq!(traversal.to_list().unwrap(), vec![6, 6]);
}

#[test]
fn test_strategies_are_idempotent() {
    let mut traversal = pipeline(standard());
    traversal.apply_strategies().unwrap();
    let rewritten = traversal.to_string();

    // explain re-applies every strategy to an unlocked copy of the rewritten tree
    let explanation = traversal.explain().unwrap();
    assert_eq!(explanation.original(), rewritten);
    for row in explanation.rows() {
        assert_eq!(row.traversal, rewritten);
    }
}

#[test]
fn test_empty_profile_changes_nothing() {
    let strategies = StrategyRegistry::with_defaults()
        .profile(StrategyProfile::Empty)
        .unwrap();
    let mut traversal = pipeline(strategies);
    let before = traversal.to_string();
    traversal.apply_strategies().unwrap();
    assert_eq!(traversal.to_string(), before);
    assert_eq!(traversal.to_list().unwrap(), vec![6, 6]);
}

#[test]
fn test_strict_profile_rejects_nested_lambda() {
    let strategies = StrategyRegistry::with_defaults()
        .profile(StrategyProfile::Strict)
        .unwrap();
    let mut traversal = pipeline(strategies);

    let err = traversal.has_next().unwrap_err();
    assert!(matches!(
        err,
        TraversalError::Verification { ref strategy, .. } if strategy == "LambdaRestrictionStrategy"
    ));
    assert!(!traversal.is_locked());
}

#[test]
fn test_strict_profile_accepts_plain_pipeline() {
    let strategies = StrategyRegistry::with_defaults()
        .profile(StrategyProfile::Strict)
        .unwrap();
    let mut traversal: Traversal<i64> = Traversal::new().with_strategies(strategies);
    traversal
        .add_step(InjectStep::new([1, 2]))
        .unwrap()
        .add_step(IdentityStep::new())
        .unwrap();

    assert_eq!(traversal.to_list().unwrap(), vec![1, 2]);
}

#[test]
fn test_side_effect_strategy_seeds_store_and_sack() {
    let strategies = TraversalStrategies::new()
        .add_strategy(
            SideEffectStrategy::new()
                .with_side_effect("limit", json!(10))
                .with_sack(json!(1)),
        )
        .unwrap();
    let mut traversal: Traversal<i64> = Traversal::new().with_strategies(strategies);
    traversal.add_step(InjectStep::new([7])).unwrap();

    let traverser = traversal.next_traverser().unwrap();
    assert_eq!(traverser.sack(), Some(&json!(1)));
    assert_eq!(traversal.side_effects().get("limit"), Some(json!(10)));
    let requirements = traversal.traverser_requirements();
    assert!(requirements.contains(&TraverserRequirement::Sack));
    assert!(requirements.contains(&TraverserRequirement::SideEffects));
}

#[test]
fn test_inspect_strategy_only_touches_root() {
    let strategies = TraversalStrategies::new()
        .add_strategy(InspectStrategy::new())
        .unwrap();
    let mut traversal = pipeline(strategies);
    traversal.apply_strategies().unwrap();

    assert_eq!(helper::count_recursively::<InspectStep, _, _>(&traversal), 1);
    assert!(traversal.end_step().is::<InspectStep>());
    assert_eq!(traversal.to_list().unwrap(), vec![6, 6]);
}

proptest! {
    #[test]
    fn prop_lazy_barrier_preserves_results(
        values in prop::collection::vec(0_i64..6, 0..40),
        size in 1_usize..8,
    ) {
        let build = |strategies: TraversalStrategies<i64>| {
            let mut traversal = Traversal::new().with_strategies(strategies);
            traversal
                .add_step(InjectStep::new(values.clone()))
                .unwrap()
                .add_step(FlatMapStep::new("halves", |v: &i64| vec![v / 2, v % 2]))
                .unwrap()
                .add_step(MapStep::new("inc", |v: &i64| v + 1))
                .unwrap();
            traversal
        };

        let mut plain = build(TraversalStrategies::new());
        let mut barriered = build(
            TraversalStrategies::new()
                .add_strategy(LazyBarrierStrategy::new(size))
                .unwrap(),
        );
        barriered.apply_strategies().unwrap();
        prop_assert!(barriered.step(2).unwrap().is::<NoOpBarrierStep<i64>>());

        let mut expected = plain.to_list().unwrap();
        let mut actual = barriered.to_list().unwrap();
        expected.sort_unstable();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);
    }
}
