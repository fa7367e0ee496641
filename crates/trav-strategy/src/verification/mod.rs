//! Verification strategies
//!
//! Reject pipelines that must not run. They only inspect, never rewrite.

use trav_process::{
    Coefficient, Payload, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
};

/// Rejects traversals containing steps that run caller-supplied closures
#[derive(Debug, Clone, Copy, Default)]
pub struct LambdaRestrictionStrategy;

impl LambdaRestrictionStrategy {
    /// Strategy name
    pub const NAME: &'static str = "LambdaRestrictionStrategy";

    /// Create the strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for LambdaRestrictionStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        match traversal.steps().find(|step| step.is_lambda()) {
            Some(step) => Err(TraversalError::verification(
                Self::NAME,
                format!("lambda step {} is not allowed", step.render()),
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Verification
    }
}
