//! Pipeline inspection and rewrite helpers used by strategies

use crate::error::Result;
use crate::step::Step;
use crate::traversal::Traversal;
use trav_traverser::{Coefficient, Payload};

/// Indices of steps of type `S`, in pipeline order
#[must_use]
pub fn step_indices<S, T, C>(traversal: &Traversal<T, C>) -> Vec<usize>
where
    S: Step<T, C>,
    T: Payload,
    C: Coefficient,
{
    traversal
        .steps()
        .enumerate()
        .filter(|(_, step)| step.is::<S>())
        .map(|(i, _)| i)
        .collect()
}

/// Check for a step of type `S` at the top level
#[must_use]
pub fn has_step<S, T, C>(traversal: &Traversal<T, C>) -> bool
where
    S: Step<T, C>,
    T: Payload,
    C: Coefficient,
{
    traversal.steps().any(|step| step.is::<S>())
}

/// Check whether any step in the tree satisfies `predicate`
pub fn any_step_recursively<T, C, P>(traversal: &Traversal<T, C>, predicate: &P) -> bool
where
    T: Payload,
    C: Coefficient,
    P: Fn(&dyn Step<T, C>) -> bool,
{
    traversal.steps().any(|step| {
        predicate(step)
            || step
                .children()
                .iter()
                .any(|child| any_step_recursively(child, predicate))
    })
}

/// Number of steps of type `S` in the whole tree
#[must_use]
pub fn count_recursively<S, T, C>(traversal: &Traversal<T, C>) -> usize
where
    S: Step<T, C>,
    T: Payload,
    C: Coefficient,
{
    traversal
        .steps()
        .map(|step| {
            usize::from(step.is::<S>())
                + step
                    .children()
                    .iter()
                    .map(count_recursively::<S, T, C>)
                    .sum::<usize>()
        })
        .sum()
}

/// Check whether any step in the tree carries a label
#[must_use]
pub fn has_labels<T: Payload, C: Coefficient>(traversal: &Traversal<T, C>) -> bool {
    any_step_recursively(traversal, &|step: &dyn Step<T, C>| {
        !step.base().labels().is_empty()
    })
}

/// Insert `step` right after `index`
///
/// # Errors
///
/// Propagates [`Traversal::insert_step`] errors.
pub fn insert_after<T, C>(
    traversal: &mut Traversal<T, C>,
    index: usize,
    step: Box<dyn Step<T, C>>,
) -> Result<()>
where
    T: Payload,
    C: Coefficient,
{
    traversal.insert_step(index + 1, step)
}

/// Remove every top-level step of type `S`, returning how many were removed
///
/// # Errors
///
/// Propagates [`Traversal::remove_step`] errors.
pub fn remove_all<S, T, C>(traversal: &mut Traversal<T, C>) -> Result<usize>
where
    S: Step<T, C>,
    T: Payload,
    C: Coefficient,
{
    let indices = step_indices::<S, T, C>(traversal);
    for index in indices.iter().rev() {
        traversal.remove_step(*index)?;
    }
    Ok(indices.len())
}
