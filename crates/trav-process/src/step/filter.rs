use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use trav_traverser::{Coefficient, Payload, Traverse, Traverser};

/// Passes every traverser through unchanged
#[derive(Debug, Clone, Default)]
pub struct IdentityStep {
    base: StepBase,
}

impl IdentityStep {
    /// Create the step
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: StepBase::new(),
        }
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for IdentityStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "IdentityStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        starts.next_start()
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }
}

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Keeps traversers whose payload satisfies a predicate
#[derive(Clone)]
pub struct FilterStep<T> {
    base: StepBase,
    description: String,
    predicate: Predicate<T>,
}

impl<T: Payload> FilterStep<T> {
    /// Filter with a named predicate; the name is shown when rendering
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            base: StepBase::new(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Predicate name
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Evaluate the predicate
    #[must_use]
    pub fn test(&self, value: &T) -> bool {
        (self.predicate)(value)
    }

    /// Conjunction of this filter and `other`; labels of both are kept
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        let left = Arc::clone(&self.predicate);
        let right = Arc::clone(&other.predicate);
        let mut base = self.base.clone();
        for label in other.base.labels() {
            base.add_label(label.clone());
        }
        Self {
            base,
            description: format!("{} && {}", self.description, other.description),
            predicate: Arc::new(move |value| left(value) && right(value)),
        }
    }
}

impl<T> fmt::Debug for FilterStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterStep")
            .field("base", &self.base)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for FilterStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "FilterStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            let traverser = starts.next_start()?;
            if (self.predicate)(traverser.get()) {
                return Ok(traverser);
            }
        }
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }

    fn is_lambda(&self) -> bool {
        true
    }

    fn params(&self) -> String {
        self.description.clone()
    }
}

/// Emits each distinct payload once, with multiplicity one
#[derive(Debug, Clone)]
pub struct DedupStep<T> {
    base: StepBase,
    seen: HashSet<T>,
}

impl<T: Payload> DedupStep<T> {
    /// Create the step
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: StepBase::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: Payload> Default for DedupStep<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for DedupStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "DedupStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            let mut traverser = starts.next_start()?;
            if self.seen.insert(traverser.get().clone()) {
                traverser.set_multiplicity(1);
                return Ok(traverser);
            }
        }
    }

    fn reset(&mut self) {
        self.seen.clear();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            seen: HashSet::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_combines_predicates_and_labels() {
        let mut even = FilterStep::new("even", |v: &i32| v % 2 == 0);
        even.base.add_label("a");
        let mut positive = FilterStep::new("positive", |v: &i32| *v > 0);
        positive.base.add_label("b");

        let both = even.and(&positive);
        assert!(both.test(&4));
        assert!(!both.test(&-4));
        assert!(!both.test(&3));
        assert_eq!(both.description(), "even && positive");
        assert_eq!(both.base.labels().len(), 2);
    }
}
