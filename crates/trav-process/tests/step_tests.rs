use pretty_assertions::assert_eq;
use serde_json::json;
use trav_process::step::{
    CountStep, DedupStep, FlatMapStep, InjectStep, NoOpBarrierStep, SideEffectStep, WeightStep,
    MAX_AGGREGATE_REPEAT,
};
use trav_process::{
    LongCoefficient, RealCoefficient, Step, Traversal, TraversalError, TraversalStrategies,
    Traverse, TraverserRequirement,
};
use trav_test_utils::{
    bulked, inject, AppendInspectStrategy, StripInspectStrategy, UncloneableStep, UnitBulkStep,
};

fn count(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[test]
fn test_barrier_merges_equal_traversers() {
    let mut traversal = inject(&[1, 1, 2, 1]);
    traversal.add_step(NoOpBarrierStep::new(10)).unwrap();

    let first = traversal.next_traverser().unwrap();
    assert_eq!(*first.get(), 1);
    assert_eq!(first.multiplicity(), 3);

    traversal.reset();
    assert_eq!(traversal.to_list().unwrap(), vec![1, 1, 1, 2]);
}

#[test]
fn test_barrier_keeps_unit_bulk_traversers_apart() {
    let mut traversal = inject(&[5, 5, 5]);
    traversal
        .add_step(UnitBulkStep::new())
        .unwrap()
        .add_step(NoOpBarrierStep::new(10))
        .unwrap();

    let requirements = traversal.traverser_requirements();
    assert!(requirements.contains(&TraverserRequirement::OneBulk));
    assert!(!requirements.contains(&TraverserRequirement::Bulk));

    let mut multiplicities = Vec::new();
    while traversal.has_next().unwrap() {
        let traverser = traversal.next_traverser().unwrap();
        assert_eq!(*traverser.get(), 5);
        multiplicities.push(traverser.multiplicity());
    }
    assert_eq!(multiplicities, vec![1, 1, 1]);
}

#[test]
fn test_small_barrier_flushes_in_batches() {
    let mut traversal = inject(&[1, 2, 1, 2]);
    traversal.add_step(NoOpBarrierStep::new(1)).unwrap();

    let values = traversal.to_list().unwrap();
    assert_eq!(values.len(), 4);
}

#[test]
fn test_count_sums_multiplicity() {
    let mut traversal = inject(&[5, 5, 6]);
    traversal
        .add_step(NoOpBarrierStep::default())
        .unwrap()
        .add_step(CountStep::new(count))
        .unwrap();

    assert_eq!(traversal.to_list().unwrap(), vec![3]);
}

#[test]
fn test_count_of_nothing_is_zero() {
    let mut traversal = inject::<i64>(&[]);
    traversal.add_step(CountStep::new(count)).unwrap();
    assert_eq!(traversal.to_list().unwrap(), vec![0]);
}

#[test]
fn test_dedup() {
    let mut traversal = inject(&[1, 2, 1, 3, 2]);
    traversal.add_step(DedupStep::new()).unwrap();
    assert_eq!(traversal.to_list().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_flat_map_extends_labeled_path() {
    let mut traversal = inject(&[2]);
    let mut expand: FlatMapStep<i64> = FlatMapStep::new("and_next", |v: &i64| vec![*v, v + 1]);
    expand.base_mut().add_label("x");
    traversal.add_step(expand).unwrap();

    let first = traversal.next_traverser().unwrap();
    let path = first.path().unwrap();
    assert_eq!(path.len(), 2);
    assert_eq!(path.get("x"), Some(&2));

    assert_eq!(traversal.to_list().unwrap(), vec![3]);
}

#[test]
fn test_weight_produces_coefficient_traversers() {
    let mut traversal = inject(&[5]);
    traversal
        .add_step(WeightStep::new(LongCoefficient(3)))
        .unwrap();

    assert!(traversal
        .traverser_requirements()
        .contains(&TraverserRequirement::Coefficient));
    assert_eq!(traversal.to_list().unwrap(), vec![5, 5, 5]);
}

#[test]
fn test_real_weight_is_emitted_once() {
    let weight = RealCoefficient::new(0.5).unwrap();
    let mut traversal: Traversal<i64, RealCoefficient> = Traversal::new();
    traversal
        .add_step(InjectStep::new([1, 2]))
        .unwrap()
        .add_step(WeightStep::new(weight))
        .unwrap();

    assert_eq!(traversal.to_list().unwrap(), vec![1, 2]);
}

#[test]
fn test_counter_side_effect() {
    let mut traversal = inject(&[1, 2, 3]);
    traversal.add_step(SideEffectStep::counter("n")).unwrap();
    traversal.iterate().unwrap();

    assert_eq!(traversal.side_effects().get("n"), Some(json!(3)));
    assert!(traversal
        .traverser_requirements()
        .contains(&TraverserRequirement::SideEffects));
}

#[test]
fn test_aggregate_side_effect_respects_multiplicity() {
    let mut traversal = inject(&[1, 1, 2]);
    traversal
        .add_step(NoOpBarrierStep::default())
        .unwrap()
        .add_step(SideEffectStep::aggregate("xs"))
        .unwrap();
    traversal.iterate().unwrap();

    assert_eq!(traversal.side_effects().get("xs"), Some(json!([1, 1, 2])));
}

#[test]
fn test_aggregate_caps_huge_bulk() {
    let mut traversal: Traversal<i64> = Traversal::new();
    traversal.add_step(SideEffectStep::aggregate("xs")).unwrap();
    traversal.add_start(bulked(7, u64::MAX)).unwrap();
    traversal.add_start(bulked(8, 2)).unwrap();
    traversal.iterate().unwrap();

    let xs = traversal.side_effects().get("xs").unwrap();
    let items = xs.as_array().unwrap();
    assert_eq!(items.len(), MAX_AGGREGATE_REPEAT + 2);
    assert_eq!(items.first(), Some(&json!(7)));
    assert_eq!(&items[MAX_AGGREGATE_REPEAT..], &[json!(8), json!(8)]);
}

#[test]
fn test_clone_is_independent() {
    let mut original = inject(&[1, 2]);
    original
        .add_step(SideEffectStep::counter("n"))
        .unwrap()
        .add_step(DedupStep::new())
        .unwrap();
    original.apply_strategies().unwrap();

    let mut copy = original.try_clone().unwrap();
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.len(), original.len());
    assert!(copy.is_locked());
    assert!(!copy.side_effects().shares_store_with(original.side_effects()));

    let names: Vec<&str> = original.steps().map(|s| s.name()).collect();
    let copied: Vec<&str> = copy.steps().map(|s| s.name()).collect();
    assert_eq!(names, copied);
    for step in copy.steps() {
        assert_eq!(step.base().owner(), Some(copy.id()));
    }

    assert_eq!(copy.to_list().unwrap(), vec![1, 2]);
    assert_eq!(copy.side_effects().get("n"), Some(json!(2)));
    assert_eq!(original.side_effects().get("n"), Some(json!(0)));

    assert_eq!(original.to_list().unwrap(), vec![1, 2]);
}

#[test]
fn test_clone_failure() {
    let mut traversal = inject(&[1]);
    traversal.add_step(UncloneableStep::new()).unwrap();

    assert!(matches!(
        traversal.try_clone(),
        Err(TraversalError::CloneFailure(_))
    ));
}

#[test]
fn test_explain_leaves_traversal_untouched() {
    let strategies = TraversalStrategies::new()
        .add_strategy(AppendInspectStrategy)
        .unwrap()
        .add_strategy(StripInspectStrategy)
        .unwrap();
    let traversal = inject(&[1]).with_strategies(strategies);

    let explanation = traversal.explain().unwrap();
    assert_eq!(explanation.original(), "[InjectStep([1])]");
    assert_eq!(explanation.rows().len(), 2);
    assert_eq!(
        explanation.rows()[0].traversal,
        "[InjectStep([1]), InspectStep]"
    );
    assert_eq!(explanation.final_traversal(), "[InjectStep([1])]");
    assert!(!traversal.is_locked());
    assert_eq!(traversal.len(), 1);

    let rendered = explanation.to_string();
    assert!(rendered.contains("AppendInspectStrategy [D]"));
    assert!(rendered.contains("StripInspectStrategy [O]"));
}

#[test]
fn test_explain_works_on_locked_traversal() {
    let strategies = TraversalStrategies::new()
        .add_strategy(AppendInspectStrategy)
        .unwrap();
    let mut traversal = inject(&[1]).with_strategies(strategies);
    traversal.apply_strategies().unwrap();

    let explanation = traversal.explain().unwrap();
    assert_eq!(explanation.rows().len(), 1);
    assert!(traversal.is_locked());
}
