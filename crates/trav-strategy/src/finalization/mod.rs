//! Finalization strategies

use trav_process::step::InspectStep;
use trav_process::{
    Coefficient, Payload, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
};

/// Appends an [`InspectStep`] to the root traversal
///
/// Every result is then reported as a `trace` event before it leaves the
/// pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct InspectStrategy;

impl InspectStrategy {
    /// Strategy name
    pub const NAME: &'static str = "InspectStrategy";

    /// Create the strategy
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for InspectStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        if !traversal.is_root() || traversal.end_step().is::<InspectStep>() {
            return Ok(());
        }
        traversal.add_step(InspectStep::new())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Finalization
    }
}
