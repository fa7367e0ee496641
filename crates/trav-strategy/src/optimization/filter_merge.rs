use super::IdentityRemovalStrategy;
use trav_process::step::FilterStep;
use trav_process::{
    Coefficient, Payload, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
};

/// Folds runs of adjacent predicate filters into one conjunction
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentFilterMergeStrategy;

impl AdjacentFilterMergeStrategy {
    /// Strategy name
    pub const NAME: &'static str = "AdjacentFilterMergeStrategy";

    /// Create the strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn filter_at<T: Payload, C: Coefficient>(
    traversal: &Traversal<T, C>,
    index: usize,
) -> Option<&FilterStep<T>> {
    traversal
        .step(index)
        .and_then(|step| step.downcast_ref::<FilterStep<T>>())
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for AdjacentFilterMergeStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        let mut index = 0;
        while index + 1 < traversal.len() {
            let merged = match (filter_at(traversal, index), filter_at(traversal, index + 1)) {
                (Some(left), Some(right)) => left.and(right),
                _ => {
                    index += 1;
                    continue;
                }
            };
            traversal.remove_step(index + 1)?;
            traversal.replace_step(index, Box::new(merged))?;
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
        &[IdentityRemovalStrategy::NAME]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trav_process::step::{InjectStep, MapStep};

    #[test]
    fn merges_runs_of_filters() {
        let mut traversal: Traversal<i32> = Traversal::new();
        traversal
            .add_step(InjectStep::new(1..=12))
            .unwrap()
            .add_step(FilterStep::new("even", |v: &i32| v % 2 == 0))
            .unwrap()
            .add_step(FilterStep::new("by3", |v: &i32| v % 3 == 0))
            .unwrap()
            .add_step(FilterStep::new("gt6", |v: &i32| *v > 6))
            .unwrap()
            .add_step(MapStep::new("neg", |v: &i32| -v))
            .unwrap();
        traversal.step_mut(2).unwrap().base_mut().add_label("m");

        TraversalStrategy::<i32>::apply(&AdjacentFilterMergeStrategy, &mut traversal).unwrap();

        assert_eq!(
            traversal.to_string(),
            "[InjectStep([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]), \
             FilterStep(even && by3 && gt6)@[m], MapStep(neg)]"
        );
        assert_eq!(traversal.to_list().unwrap(), vec![-12]);
    }

    #[test]
    fn separated_filters_stay_apart() {
        let mut traversal: Traversal<i32> = Traversal::new();
        traversal
            .add_step(FilterStep::new("a", |_: &i32| true))
            .unwrap()
            .add_step(MapStep::new("id", |v: &i32| *v))
            .unwrap()
            .add_step(FilterStep::new("b", |_: &i32| true))
            .unwrap();

        TraversalStrategy::<i32>::apply(&AdjacentFilterMergeStrategy, &mut traversal).unwrap();
        assert_eq!(traversal.len(), 3);
    }
}
