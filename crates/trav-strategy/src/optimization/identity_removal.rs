use trav_process::step::IdentityStep;
use trav_process::{
    Coefficient, Payload, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
};

/// Removes pass-through steps
///
/// Labels of a removed step move to its predecessor. A labeled identity at
/// the head of a traversal has no predecessor to carry them and stays. A
/// single-step traversal is left as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRemovalStrategy;

impl IdentityRemovalStrategy {
    /// Strategy name
    pub const NAME: &'static str = "IdentityRemovalStrategy";

    /// Create the strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for IdentityRemovalStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        let mut index = 0;
        while index < traversal.len() && traversal.len() > 1 {
            let Some(step) = traversal.step(index) else {
                break;
            };
            if !step.is::<IdentityStep>() {
                index += 1;
                continue;
            }
            let labeled = !step.base().labels().is_empty();
            if index == 0 && labeled {
                index += 1;
                continue;
            }

            let mut removed = traversal.remove_step(index)?;
            let labels = removed.base_mut().take_labels();
            if let Some(previous) = index.checked_sub(1) {
                let previous = traversal.step_mut(previous)?;
                for label in labels {
                    previous.base_mut().add_label(label);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }
}
