use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use trav_traverser::{
    Coefficient, LongCoefficient, Payload, RequirementSet, Traverse, Traverser,
    TraverserRequirement,
};

/// Default number of distinct payloads a bulking barrier holds
pub const DEFAULT_BARRIER_SIZE: usize = 2500;

/// Reducing barrier counting every upstream traverser by multiplicity
///
/// Emits exactly one traverser, also when upstream is empty.
#[derive(Clone)]
pub struct CountStep<T> {
    base: StepBase,
    done: bool,
    make: Arc<dyn Fn(u64) -> T + Send + Sync>,
}

impl<T: Payload> CountStep<T> {
    /// Count, converting the total into a payload with `make`
    pub fn new<F>(make: F) -> Self
    where
        F: Fn(u64) -> T + Send + Sync + 'static,
    {
        Self {
            base: StepBase::new(),
            done: false,
            make: Arc::new(make),
        }
    }
}

impl<T> fmt::Debug for CountStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountStep")
            .field("base", &self.base)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for CountStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "CountStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        if self.done {
            return Err(StreamExhausted);
        }
        let mut total: u64 = 0;
        while let Ok(traverser) = starts.next_start() {
            total = total.saturating_add(traverser.multiplicity());
        }
        self.done = true;
        let generator = starts.context().generator();
        Ok(generator.generate_one((self.make)(total), self.base.labels()))
    }

    fn requirements(&self) -> RequirementSet {
        std::iter::once(TraverserRequirement::Bulk).collect()
    }

    fn reset(&mut self) {
        self.done = false;
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            done: false,
            make: Arc::clone(&self.make),
        }))
    }
}

/// Bulking barrier merging equal traversers before passing them on
pub struct NoOpBarrierStep<T: Payload, C: Coefficient = LongCoefficient> {
    base: StepBase,
    max_barrier_size: usize,
    barrier: IndexMap<T, Traverser<T, C>>,
    ready: VecDeque<Traverser<T, C>>,
}

impl<T: Payload, C: Coefficient> NoOpBarrierStep<T, C> {
    /// Barrier holding up to `max_barrier_size` distinct payloads
    #[must_use]
    pub fn new(max_barrier_size: usize) -> Self {
        Self {
            base: StepBase::new(),
            max_barrier_size: max_barrier_size.max(1),
            barrier: IndexMap::new(),
            ready: VecDeque::new(),
        }
    }

    /// Maximum number of distinct payloads held
    #[must_use]
    pub fn max_barrier_size(&self) -> usize {
        self.max_barrier_size
    }

    fn fill(&mut self, starts: &mut Starts<'_, T, C>) {
        // unit-bulk traversers are held as they come, never merged
        if starts.context().generator().is_one_bulk() {
            while self.ready.len() < self.max_barrier_size {
                let Ok(traverser) = starts.next_start() else {
                    break;
                };
                self.ready.push_back(traverser);
            }
            return;
        }
        while self.barrier.len() < self.max_barrier_size {
            let Ok(traverser) = starts.next_start() else {
                break;
            };
            match self.barrier.get_mut(traverser.get()) {
                Some(existing) => existing.merge(&traverser),
                None => {
                    self.barrier.insert(traverser.get().clone(), traverser);
                }
            }
        }
        self.ready.extend(self.barrier.drain(..).map(|(_, t)| t));
    }
}

impl<T: Payload, C: Coefficient> Default for NoOpBarrierStep<T, C> {
    fn default() -> Self {
        Self::new(DEFAULT_BARRIER_SIZE)
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for NoOpBarrierStep<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoOpBarrierStep")
            .field("base", &self.base)
            .field("max_barrier_size", &self.max_barrier_size)
            .field("held", &(self.barrier.len() + self.ready.len()))
            .finish()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for NoOpBarrierStep<T, C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "NoOpBarrierStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        if self.ready.is_empty() {
            self.fill(starts);
        }
        self.ready.pop_front().ok_or(StreamExhausted)
    }

    fn requirements(&self) -> RequirementSet {
        std::iter::once(TraverserRequirement::Bulk).collect()
    }

    fn reset(&mut self) {
        self.barrier.clear();
        self.ready.clear();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        let mut clone = Self::new(self.max_barrier_size);
        clone.base = self.base.clone();
        Ok(Box::new(clone))
    }

    fn params(&self) -> String {
        self.max_barrier_size.to_string()
    }
}
