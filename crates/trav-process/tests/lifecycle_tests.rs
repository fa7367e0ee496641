use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use trav_process::step::{IdentityStep, InjectStep, InspectStep};
use trav_process::{EmptyStep, Traversal, TraversalError, TraversalStrategies, Traverse};
use trav_test_utils::{bulked, inject_filter_map, CloseCountingStep, RejectingStrategy};

#[test]
fn test_inject_filter_map() {
    let mut traversal = inject_filter_map(&[1, 2, 3]);
    assert_eq!(traversal.to_list().unwrap(), vec![20]);
}

#[test]
fn test_explicit_double_lock_fails() {
    let mut traversal = inject_filter_map(&[1, 2, 3]);
    traversal.apply_strategies().unwrap();
    assert_eq!(traversal.apply_strategies(), Err(TraversalError::Locked));

    // implicit lock is a no-op on a locked traversal
    assert!(traversal.has_next().unwrap());
}

#[test]
fn test_mutation_after_lock_fails() {
    let mut traversal = inject_filter_map(&[1]);
    traversal.apply_strategies().unwrap();

    assert_eq!(
        traversal.insert_step(0, Box::new(IdentityStep::new())),
        Err(TraversalError::Locked)
    );
    assert!(matches!(traversal.remove_step(0), Err(TraversalError::Locked)));
    assert!(matches!(
        traversal.add_step(InspectStep::new()),
        Err(TraversalError::Locked)
    ));
    assert_eq!(
        traversal.set_strategies(TraversalStrategies::new()),
        Err(TraversalError::Locked)
    );
    assert_eq!(traversal.len(), 3);
}

#[test]
fn test_empty_traversal() {
    let mut traversal: Traversal<i32> = Traversal::new();
    assert!(traversal.start_step().is::<EmptyStep>());
    assert!(traversal.end_step().is::<EmptyStep>());
    assert!(!traversal.has_next().unwrap());
    assert_eq!(traversal.next_value(), Err(TraversalError::NoSuchElement));
    assert!(traversal.is_closed());
}

#[test]
fn test_bulk_is_expanded_one_value_at_a_time() {
    let mut traversal: Traversal<&str> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();
    traversal.add_start(bulked("x", 3)).unwrap();

    assert_eq!(traversal.to_list().unwrap(), vec!["x", "x", "x"]);
}

#[test]
fn test_consumed_traversers_are_never_yielded() {
    let mut traversal: Traversal<&str> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();
    traversal
        .add_starts([bulked("dead", 0), bulked("live", 1)])
        .unwrap();

    assert_eq!(traversal.to_list().unwrap(), vec!["live"]);
}

#[test]
fn test_next_traverser_returns_remaining_multiplicity() {
    let mut traversal: Traversal<i32> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();
    traversal.add_start(bulked(1, 4)).unwrap();

    assert_eq!(traversal.next_value().unwrap(), 1);
    let rest = traversal.next_traverser().unwrap();
    assert_eq!(rest.multiplicity(), 3);
    assert_eq!(traversal.try_next().unwrap(), None);
}

#[test]
fn test_has_next_does_not_consume() {
    let mut traversal = inject_filter_map(&[2]);
    assert!(traversal.has_next().unwrap());
    assert!(traversal.has_next().unwrap());
    assert_eq!(traversal.next_value().unwrap(), 20);
    assert!(!traversal.has_next().unwrap());
}

#[test]
fn test_next_n() {
    let mut traversal = inject_filter_map(&[2, 4, 6, 8]);
    assert_eq!(traversal.next_n(3).unwrap(), vec![20, 40, 60]);
    assert_eq!(traversal.next_n(3).unwrap(), vec![80]);
}

#[test]
fn test_reset_reproduces_first_iteration() {
    let mut traversal = inject_filter_map(&[1, 2, 3, 4]);
    let first = traversal.to_list().unwrap();
    traversal.reset();
    let second = traversal.to_list().unwrap();
    assert_eq!(first, second);
    assert!(traversal.is_locked());
}

#[test]
fn test_reset_with_readded_starts() {
    let mut traversal: Traversal<i64> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();

    traversal.add_start_values([1, 2, 3]).unwrap();
    let first = traversal.to_list().unwrap();

    traversal.reset();
    traversal.add_start_values([1, 2, 3]).unwrap();
    let second = traversal.to_list().unwrap();

    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(first, second);
}

#[test]
fn test_add_start_locks_and_reopens() {
    let mut traversal: Traversal<i64> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();
    assert!(!traversal.is_locked());

    traversal.iterate().unwrap();
    assert!(traversal.is_closed());

    traversal.add_start_values([7]).unwrap();
    assert!(traversal.is_locked());
    assert!(!traversal.is_closed());
    assert_eq!(traversal.to_list().unwrap(), vec![7]);
}

#[test]
fn test_close_runs_hooks_once() {
    let counting = CloseCountingStep::new();
    let closes = counting.closes();

    let mut traversal: Traversal<i32> = Traversal::new();
    traversal
        .add_step(InjectStep::new([1, 2]))
        .unwrap()
        .add_step(counting)
        .unwrap();

    traversal.iterate().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    assert!(!traversal.has_next().unwrap());
    traversal.close();
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    traversal.reset();
    traversal.iterate().unwrap();
    assert_eq!(closes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_verification_failure_aborts_lock() {
    let strategies = TraversalStrategies::new()
        .add_strategy(RejectingStrategy)
        .unwrap();
    let mut traversal = inject_filter_map(&[2]).with_strategies(strategies);

    let err = traversal.has_next().unwrap_err();
    assert!(matches!(err, TraversalError::Verification { .. }));
    assert!(!err.is_recoverable());
    assert!(!traversal.is_locked());
}

#[test]
fn test_try_next_maps_exhaustion_to_none() {
    let mut traversal = inject_filter_map(&[1]);
    assert_eq!(traversal.try_next().unwrap(), None);
    assert_eq!(traversal.next_value(), Err(TraversalError::NoSuchElement));
}

#[test]
fn test_close_stops_iteration_until_reopened() {
    let counting = CloseCountingStep::new();
    let closes = counting.closes();

    let mut traversal: Traversal<i32> = Traversal::new();
    traversal
        .add_step(InjectStep::new([1, 2, 3]))
        .unwrap()
        .add_step(counting)
        .unwrap();

    assert_eq!(traversal.next_value().unwrap(), 1);
    assert!(traversal.has_next().unwrap());
    traversal.close();
    assert!(traversal.is_closed());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    assert!(!traversal.has_next().unwrap());
    assert_eq!(traversal.next_value(), Err(TraversalError::NoSuchElement));
    assert!(traversal.next_traverser().is_err());
    assert_eq!(traversal.to_list().unwrap(), Vec::<i32>::new());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    traversal.reset();
    assert_eq!(traversal.to_list().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_new_start_reopens_closed_traversal() {
    let mut traversal: Traversal<i32> = Traversal::new();
    traversal.add_step(IdentityStep::new()).unwrap();
    traversal.apply_strategies().unwrap();
    traversal.close();
    assert!(!traversal.has_next().unwrap());

    traversal.add_start_values([5]).unwrap();
    assert_eq!(traversal.to_list().unwrap(), vec![5]);
}
