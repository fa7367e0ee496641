use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use trav_traverser::{
    Coefficient, LongCoefficient, Payload, RequirementSet, Traverse, Traverser,
    TraverserRequirement, Via,
};

type Projection<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;
type Expansion<T> = Arc<dyn Fn(&T) -> Vec<T> + Send + Sync>;

/// Replaces each payload with a projection of it
#[derive(Clone)]
pub struct MapStep<T> {
    base: StepBase,
    description: String,
    projection: Projection<T>,
}

impl<T: Payload> MapStep<T> {
    /// Map with a named projection
    pub fn new<F>(description: impl Into<String>, projection: F) -> Self
    where
        F: Fn(&T) -> T + Send + Sync + 'static,
    {
        Self {
            base: StepBase::new(),
            description: description.into(),
            projection: Arc::new(projection),
        }
    }
}

impl<T> fmt::Debug for MapStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapStep")
            .field("base", &self.base)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for MapStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "MapStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        let traverser = starts.next_start()?;
        let mapped = (self.projection)(traverser.get());
        Ok(traverser.split(mapped, &Via::new(self.base.labels(), C::one())))
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

/// Expands each payload into zero or more payloads
pub struct FlatMapStep<T: Payload, C: Coefficient = LongCoefficient> {
    base: StepBase,
    description: String,
    expansion: Expansion<T>,
    pending: VecDeque<Traverser<T, C>>,
}

impl<T: Payload, C: Coefficient> FlatMapStep<T, C> {
    /// Flat-map with a named expansion
    pub fn new<F>(description: impl Into<String>, expansion: F) -> Self
    where
        F: Fn(&T) -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            base: StepBase::new(),
            description: description.into(),
            expansion: Arc::new(expansion),
            pending: VecDeque::new(),
        }
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for FlatMapStep<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatMapStep")
            .field("base", &self.base)
            .field("description", &self.description)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for FlatMapStep<T, C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "FlatMapStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            if let Some(traverser) = self.pending.pop_front() {
                return Ok(traverser);
            }
            let traverser = starts.next_start()?;
            let via = Via::new(self.base.labels(), C::one());
            self.pending.extend(
                (self.expansion)(traverser.get())
                    .into_iter()
                    .map(|value| traverser.split(value, &via)),
            );
        }
    }

    fn reset(&mut self) {
        self.pending.clear();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            description: self.description.clone(),
            expansion: Arc::clone(&self.expansion),
            pending: VecDeque::new(),
        }))
    }

    fn is_lambda(&self) -> bool {
        true
    }

    fn params(&self) -> String {
        self.description.clone()
    }
}

/// Multiplies the weight of coefficient traversers passing through
#[derive(Debug, Clone)]
pub struct WeightStep<C> {
    base: StepBase,
    weight: C,
}

impl<C: Coefficient> WeightStep<C> {
    /// Weight traversers by `weight`
    pub fn new(weight: C) -> Self {
        Self {
            base: StepBase::new(),
            weight,
        }
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for WeightStep<C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "WeightStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        let traverser = starts.next_start()?;
        let payload = traverser.get().clone();
        Ok(traverser.split(payload, &Via::new(self.base.labels(), self.weight.clone())))
    }

    fn requirements(&self) -> RequirementSet {
        std::iter::once(TraverserRequirement::Coefficient).collect()
    }

    fn coefficient(&self) -> C {
        self.weight.clone()
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }

    fn params(&self) -> String {
        format!("{:?}", self.weight)
    }
}
