use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use trav_traverser::{Coefficient, Payload, Traverser};

/// Source step emitting a fixed list of values, then its starts
#[derive(Debug, Clone)]
pub struct InjectStep<T> {
    base: StepBase,
    values: Vec<T>,
    cursor: usize,
}

impl<T: Payload> InjectStep<T> {
    /// Emit `values` in order
    pub fn new(values: impl IntoIterator<Item = T>) -> Self {
        Self {
            base: StepBase::new(),
            values: values.into_iter().collect(),
            cursor: 0,
        }
    }

    /// Injected values
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for InjectStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "InjectStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        if let Some(value) = self.values.get(self.cursor) {
            self.cursor += 1;
            let generator = starts.context().generator();
            return Ok(generator.generate_one(value.clone(), self.base.labels()));
        }
        starts.next_start()
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            values: self.values.clone(),
            cursor: 0,
        }))
    }

    fn params(&self) -> String {
        format!("{:?}", self.values)
    }
}
