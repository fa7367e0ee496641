//! Testing utilities for the traversal workspace
//!
//! Shared step and strategy fixtures plus pipeline builders.

#![allow(missing_docs)]

use parking_lot::Mutex;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use trav_process::helper;
use trav_process::step::{FilterStep, InjectStep, InspectStep, MapStep};
use trav_process::{
    Starts, Step, StepBase, StrategyCategory, StreamExhausted, Traversal, TraversalError,
    TraversalStrategy,
};
use trav_traverser::{
    Coefficient, CountingTraverser, LongCoefficient, Payload, RequirementSet, Traverser,
    TraverserRequirement,
};

/// Pass-through step counting close and reset hook invocations
#[derive(Debug, Clone, Default)]
pub struct CloseCountingStep {
    base: StepBase,
    closes: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl CloseCountingStep {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared close counter; clones of the step keep counting into it
    #[must_use]
    pub fn closes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    #[must_use]
    pub fn resets(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for CloseCountingStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "CloseCountingStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        starts.next_start()
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }
}

/// Step holding a resource that cannot be duplicated
#[derive(Debug, Default)]
pub struct UncloneableStep {
    base: StepBase,
}

impl UncloneableStep {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for UncloneableStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "UncloneableStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        starts.next_start()
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Err(TraversalError::CloneFailure(
            "exclusive handle cannot be duplicated".to_string(),
        ))
    }
}

/// Pass-through step declaring that every traverser stands for one occurrence
#[derive(Debug, Clone, Default)]
pub struct UnitBulkStep {
    base: StepBase,
}

impl UnitBulkStep {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for UnitBulkStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "UnitBulkStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        starts.next_start()
    }

    fn requirements(&self) -> RequirementSet {
        std::iter::once(TraverserRequirement::OneBulk).collect()
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }
}

/// Parent step whose child is a computation root
///
/// Behaves like a local step: each start runs through the child.
#[derive(Debug)]
pub struct ProgramStep<T: Payload, C: Coefficient = LongCoefficient> {
    base: StepBase,
    program: Traversal<T, C>,
}

impl<T: Payload, C: Coefficient> ProgramStep<T, C> {
    #[must_use]
    pub fn new(program: Traversal<T, C>) -> Self {
        Self {
            base: StepBase::new(),
            program: program.computation_root(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &Traversal<T, C> {
        &self.program
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for ProgramStep<T, C> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "ProgramStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        loop {
            if let Ok(traverser) = self.program.try_next_traverser() {
                return Ok(traverser);
            }
            let start = starts.next_start()?;
            self.program.reset();
            self.program.push_start(start);
        }
    }

    fn reset(&mut self) {
        self.program.reset();
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self {
            base: self.base.clone(),
            program: self.program.try_clone()?,
        }))
    }

    fn children(&self) -> &[Traversal<T, C>] {
        slice::from_ref(&self.program)
    }

    fn children_mut(&mut self) -> &mut [Traversal<T, C>] {
        slice::from_mut(&mut self.program)
    }
}

/// Shared log of strategy invocations
pub type StrategyLog = Arc<Mutex<Vec<String>>>;

/// Strategy recording `name@depth:steps` for every traversal it visits
#[derive(Debug, Clone)]
pub struct RecordingStrategy {
    name: &'static str,
    category: StrategyCategory,
    prior: &'static [&'static str],
    log: StrategyLog,
}

impl RecordingStrategy {
    #[must_use]
    pub fn new(name: &'static str, category: StrategyCategory, log: &StrategyLog) -> Self {
        Self {
            name,
            category,
            prior: &[],
            log: Arc::clone(log),
        }
    }

    #[must_use]
    pub fn after(mut self, prior: &'static [&'static str]) -> Self {
        self.prior = prior;
        self
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for RecordingStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        self.log
            .lock()
            .push(format!("{}@{}:{}", self.name, traversal.depth(), traversal.len()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn category(&self) -> StrategyCategory {
        self.category
    }

    fn apply_prior(&self) -> &'static [&'static str] {
        self.prior
    }
}

/// Appends an [`InspectStep`] to every traversal it visits
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendInspectStrategy;

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for AppendInspectStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        traversal.add_step(InspectStep::new())?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "AppendInspectStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Decoration
    }
}

/// Removes every [`InspectStep`] from every traversal it visits
#[derive(Debug, Clone, Copy, Default)]
pub struct StripInspectStrategy;

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for StripInspectStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        helper::remove_all::<InspectStep, T, C>(traversal)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "StripInspectStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Optimization
    }
}

/// Verification strategy rejecting every traversal
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingStrategy;

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for RejectingStrategy {
    fn apply(&self, _traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        Err(TraversalError::verification(
            "RejectingStrategy",
            "rejected for testing",
        ))
    }

    fn name(&self) -> &'static str {
        "RejectingStrategy"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Verification
    }
}

/// `[Inject(values), Filter(even), Map(x10)]`
#[must_use]
pub fn inject_filter_map(values: &[i64]) -> Traversal<i64> {
    let mut traversal = Traversal::new();
    traversal
        .add_step(InjectStep::new(values.iter().copied()))
        .and_then(|t| t.add_step(FilterStep::new("even", |v: &i64| v % 2 == 0)))
        .and_then(|t| t.add_step(MapStep::new("times10", |v: &i64| v * 10)))
        .expect("fresh traversal accepts steps");
    traversal
}

/// Single inject step over `values`
#[must_use]
pub fn inject<T: Payload>(values: &[T]) -> Traversal<T> {
    let mut traversal = Traversal::new();
    traversal
        .add_step(InjectStep::new(values.iter().cloned()))
        .expect("fresh traversal accepts steps");
    traversal
}

/// Counting traverser with the given bulk
#[must_use]
pub fn bulked<T: Payload>(value: T, bulk: u64) -> Traverser<T> {
    Traverser::Counting(CountingTraverser::new(value).with_bulk(bulk))
}
