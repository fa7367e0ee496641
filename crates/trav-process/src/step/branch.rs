//! Parent steps embedding child traversals

use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use crate::traversal::Traversal;
use std::slice;
use trav_traverser::{Coefficient, LongCoefficient, Payload, Traverser};

/// Keeps traversers for which the child traversal produces any result
#[derive(Debug)]
pub struct TraversalFilterStep<T: Payload, C: Coefficient = LongCoefficient> {
    base: StepBase,
    child: Traversal<T, C>,
}

impl<T: Payload, C: Coefficient> TraversalFilterStep<T, C> {
    /// Filter by `child`
    #[must_use]
    pub fn new(child: Traversal<T, C>) -> Self {
        Self {
            base: StepBase::new(),
            child,
        }
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for TraversalFilterStep<T, C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "TraversalFilterStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            let traverser = starts.next_start()?;
            self.child.reset();
            self.child.push_start(traverser.clone());
            if self.child.has_next_nested() {
                return Ok(traverser);
            }
        }
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            child: self.child.try_clone()?,
        }))
    }

    fn children(&self) -> &[Traversal<T, C>] {
        slice::from_ref(&self.child)
    }

    fn children_mut(&mut self) -> &mut [Traversal<T, C>] {
        slice::from_mut(&mut self.child)
    }

    fn params(&self) -> String {
        self.child.to_string()
    }
}

/// Runs the child traversal per start traverser and emits its results
#[derive(Debug)]
pub struct LocalStep<T: Payload, C: Coefficient = LongCoefficient> {
    base: StepBase,
    child: Traversal<T, C>,
}

impl<T: Payload, C: Coefficient> LocalStep<T, C> {
    /// Scope `child` to each start
    #[must_use]
    pub fn new(child: Traversal<T, C>) -> Self {
        Self {
            base: StepBase::new(),
            child,
        }
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for LocalStep<T, C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "LocalStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            if let Ok(traverser) = self.child.try_next_traverser() {
                return Ok(traverser);
            }
            let start = starts.next_start()?;
            self.child.reset();
            self.child.push_start(start);
        }
    }

    fn reset(&mut self) {
        self.child.reset();
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            child: self.child.try_clone()?,
        }))
    }

    fn children(&self) -> &[Traversal<T, C>] {
        slice::from_ref(&self.child)
    }

    fn children_mut(&mut self) -> &mut [Traversal<T, C>] {
        slice::from_mut(&mut self.child)
    }

    fn params(&self) -> String {
        self.child.to_string()
    }
}
