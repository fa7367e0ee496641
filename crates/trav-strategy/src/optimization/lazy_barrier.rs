use super::{AdjacentFilterMergeStrategy, IdentityRemovalStrategy};
use tracing::trace;
use trav_process::helper;
use trav_process::step::{FlatMapStep, LocalStep, NoOpBarrierStep, DEFAULT_BARRIER_SIZE};
use trav_process::{
    Coefficient, Payload, Step, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
    TraverserRequirement,
};

/// Inserts bulking barriers after steps that fan out
///
/// Equal traversers produced by a flat-map or local step are merged before
/// the rest of the pipeline sees them. Only root traversals are rewritten,
/// and only when no step needs paths or unit bulk, since merging drops both.
#[derive(Debug, Clone, Copy)]
pub struct LazyBarrierStrategy {
    max_barrier_size: usize,
}

impl Default for LazyBarrierStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_BARRIER_SIZE)
    }
}

impl LazyBarrierStrategy {
    /// Strategy name
    pub const NAME: &'static str = "LazyBarrierStrategy";

    /// Barriers holding up to `max_barrier_size` distinct payloads
    #[must_use]
    pub fn new(max_barrier_size: usize) -> Self {
        Self {
            max_barrier_size: max_barrier_size.max(1),
        }
    }

    /// Size of inserted barriers
    #[inline]
    #[must_use]
    pub fn max_barrier_size(&self) -> usize {
        self.max_barrier_size
    }
}

fn fans_out<T: Payload, C: Coefficient>(step: &dyn Step<T, C>) -> bool {
    step.is::<FlatMapStep<T, C>>() || step.is::<LocalStep<T, C>>()
}

fn forbids_bulking<T: Payload, C: Coefficient>(traversal: &Traversal<T, C>) -> bool {
    helper::has_labels(traversal)
        || helper::any_step_recursively(traversal, &|step: &dyn Step<T, C>| {
            let requirements = step.requirements();
            requirements.contains(&TraverserRequirement::OneBulk)
                || requirements.iter().any(|r| r.needs_path())
        })
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for LazyBarrierStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        if !traversal.is_root() || forbids_bulking(traversal) {
            return Ok(());
        }

        let mut index = 0;
        while index + 1 < traversal.len() {
            let insert = match (traversal.step(index), traversal.step(index + 1)) {
                (Some(step), Some(next)) => fans_out(step) && !next.is::<NoOpBarrierStep<T, C>>(),
                _ => false,
            };
            if insert {
                trace!(traversal = %traversal.id(), index, "lazy barrier inserted");
                helper::insert_after(
                    traversal,
                    index,
                    Box::new(NoOpBarrierStep::<T, C>::new(self.max_barrier_size)),
                )?;
                index += 1;
            }
            index += 1;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }

    fn apply_prior(&self) -> &'static [&'static str] {
        &[IdentityRemovalStrategy::NAME, AdjacentFilterMergeStrategy::NAME]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trav_process::step::{InjectStep, MapStep};

    fn fan_out() -> Traversal<i32> {
        let mut traversal: Traversal<i32> = Traversal::new();
        traversal
            .add_step(InjectStep::new([1, 2]))
            .unwrap()
            .add_step(FlatMapStep::new("parity", |v: &i32| vec![v % 2, v % 2, 7]))
            .unwrap()
            .add_step(MapStep::new("inc", |v: &i32| v + 1))
            .unwrap();
        traversal
    }

    fn apply(traversal: &mut Traversal<i32>) {
        TraversalStrategy::<i32>::apply(&LazyBarrierStrategy::new(100), traversal).unwrap();
    }

    #[test]
    fn inserts_after_fan_out_once() {
        let mut traversal = fan_out();
        apply(&mut traversal);
        apply(&mut traversal);

        assert_eq!(traversal.len(), 4);
        assert!(traversal.step(2).unwrap().is::<NoOpBarrierStep<i32>>());

        let mut values = traversal.to_list().unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![1, 1, 2, 2, 8, 8]);
    }

    #[test]
    fn trailing_fan_out_gets_no_barrier() {
        let mut traversal: Traversal<i32> = Traversal::new();
        traversal
            .add_step(InjectStep::new([1]))
            .unwrap()
            .add_step(FlatMapStep::new("twice", |v: &i32| vec![*v, *v]))
            .unwrap();
        apply(&mut traversal);
        assert_eq!(traversal.len(), 2);
    }

    #[test]
    fn labels_disable_bulking() {
        let mut traversal = fan_out();
        traversal.step_mut(0).unwrap().base_mut().add_label("a");
        apply(&mut traversal);
        assert_eq!(traversal.len(), 3);
    }
}
