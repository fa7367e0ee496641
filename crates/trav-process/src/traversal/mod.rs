//! Traversal orchestrator
//!
//! A [`Traversal`] owns an ordered arena of steps and drives them through
//! three states:
//!
//! - building: steps and strategies may change
//! - locked: strategies have been applied, only iteration state changes
//! - closed: the result stream was exhausted or [`Traversal::close`] was
//!   called; no more results until [`Traversal::reset`] or a new start
//!   reopens it
//!
//! Locking happens implicitly on the first iteration request or start, or
//! explicitly through [`Traversal::apply_strategies`].

mod explain;

pub use explain::{ExplanationRow, TraversalExplanation};

use crate::error::{Result, StreamExhausted, TraversalError};
use crate::graph::GraphHandle;
use crate::side_effects::SideEffects;
use crate::step::{self, Step, StepContext, StepId, StepPosition, StepRef, StepSlot, EMPTY_STEP};
use crate::strategy::TraversalStrategies;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, error, trace};
use trav_traverser::{
    requirement, Coefficient, Labels, LongCoefficient, Payload, RequirementSet, Traverse,
    Traverser, TraverserGenerator, TraverserRequirement,
};
use uuid::Uuid;

/// Unique traversal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraversalId(pub Uuid);

impl TraversalId {
    /// Fresh random id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TraversalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraversalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Back-reference from a nested traversal to the step that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentStep {
    step: StepId,
    depth: usize,
    child_index: usize,
    computation_root: bool,
}

impl ParentStep {
    /// Owning step id
    #[inline]
    #[must_use]
    pub fn step(&self) -> &StepId {
        &self.step
    }

    /// Nesting depth; children of a root have depth one
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Index among the owning step's children
    #[inline]
    #[must_use]
    pub fn child_index(&self) -> usize {
        self.child_index
    }

    /// Check whether the traversal locks itself with the full algorithm
    #[inline]
    #[must_use]
    pub fn is_computation_root(&self) -> bool {
        self.computation_root
    }
}

/// First lock failure raised by a nested traversal, shared across one tree
type NestedFault = Arc<Mutex<Option<TraversalError>>>;

/// Ordered pipeline of steps with its execution state
pub struct Traversal<T: Payload, C: Coefficient = LongCoefficient> {
    id: TraversalId,
    slots: Vec<StepSlot<T, C>>,
    position: StepPosition,
    parent: Option<ParentStep>,
    side_effects: SideEffects,
    fault: NestedFault,
    strategies: TraversalStrategies<T, C>,
    graph: Option<GraphHandle>,
    generator: TraverserGenerator<C>,
    requirements: Option<Arc<RequirementSet>>,
    last_traverser: Option<Traverser<T, C>>,
    end_step: Option<usize>,
    locked: bool,
    closed: bool,
}

impl<T: Payload, C: Coefficient> Default for Traversal<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, C: Coefficient> Traversal<T, C> {
    /// Empty root traversal
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: TraversalId::new(),
            slots: Vec::new(),
            position: StepPosition::root(),
            parent: None,
            side_effects: SideEffects::new(),
            fault: NestedFault::default(),
            strategies: TraversalStrategies::new(),
            graph: None,
            generator: TraverserGenerator::default(),
            requirements: None,
            last_traverser: None,
            end_step: None,
            locked: false,
            closed: false,
        }
    }

    /// Set the strategy set
    #[must_use]
    pub fn with_strategies(mut self, strategies: TraversalStrategies<T, C>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Set the graph handle
    #[must_use]
    pub fn with_graph(mut self, graph: GraphHandle) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Share an existing side-effect store
    #[must_use]
    pub fn with_side_effects(mut self, side_effects: SideEffects) -> Self {
        self.side_effects = side_effects;
        self
    }

    /// Mark this traversal as a computation root
    ///
    /// A computation root keeps its parent back-reference but locks itself
    /// with the full algorithm instead of being finalized by its parent.
    #[must_use]
    pub fn computation_root(mut self) -> Self {
        match self.parent.as_mut() {
            Some(parent) => parent.computation_root = true,
            None => {
                self.parent = Some(ParentStep {
                    step: StepId::default(),
                    depth: 1,
                    child_index: 0,
                    computation_root: true,
                });
            }
        }
        self
    }

    /// Traversal id
    #[inline]
    #[must_use]
    pub fn id(&self) -> TraversalId {
        self.id
    }

    /// Check for a root traversal (no parent step)
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Parent back-reference of a nested traversal
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&ParentStep> {
        self.parent.as_ref()
    }

    /// Check for a computation root
    #[inline]
    #[must_use]
    pub fn is_computation_root(&self) -> bool {
        self.parent.as_ref().is_some_and(ParentStep::is_computation_root)
    }

    /// Nesting depth; zero for a root
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, ParentStep::depth)
    }

    /// Check the lock flag
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Check the closed flag
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Shared side-effect store
    #[inline]
    #[must_use]
    pub fn side_effects(&self) -> &SideEffects {
        &self.side_effects
    }

    /// Strategy set
    #[inline]
    #[must_use]
    pub fn strategies(&self) -> &TraversalStrategies<T, C> {
        &self.strategies
    }

    /// Replace the strategy set
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked.
    pub fn set_strategies(&mut self, strategies: TraversalStrategies<T, C>) -> Result<()> {
        self.ensure_unlocked()?;
        self.strategies = strategies;
        Ok(())
    }

    /// Graph handle, if any
    #[inline]
    #[must_use]
    pub fn graph(&self) -> Option<&GraphHandle> {
        self.graph.as_ref()
    }

    /// Set the graph handle
    pub fn set_graph(&mut self, graph: GraphHandle) {
        self.graph = Some(graph);
    }

    /// Generator used by source steps
    #[inline]
    #[must_use]
    pub fn generator(&self) -> &TraverserGenerator<C> {
        &self.generator
    }

    /// Number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check for an empty pipeline
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Step at `index`
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&dyn Step<T, C>> {
        self.slots.get(index).map(|slot| slot.step.as_ref())
    }

    /// Mutable step at `index`
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked, or
    /// [`TraversalError::IndexOutOfBounds`].
    pub fn step_mut(&mut self, index: usize) -> Result<&mut dyn Step<T, C>> {
        self.ensure_unlocked()?;
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .map(|slot| slot.step.as_mut())
            .ok_or(TraversalError::IndexOutOfBounds { index, len })
    }

    /// Steps in execution order
    pub fn steps(&self) -> impl Iterator<Item = &dyn Step<T, C>> {
        self.slots.iter().map(|slot| slot.step.as_ref())
    }

    /// Index of the step with `id`
    #[must_use]
    pub fn index_of(&self, id: &StepId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.step.base().id() == id)
    }

    /// First step, or the sentinel on an empty pipeline
    #[must_use]
    pub fn start_step(&self) -> &dyn Step<T, C> {
        self.slots
            .first()
            .map_or(&EMPTY_STEP as &dyn Step<T, C>, |slot| slot.step.as_ref())
    }

    /// Last step, or the sentinel on an empty pipeline
    #[must_use]
    pub fn end_step(&self) -> &dyn Step<T, C> {
        self.slots
            .last()
            .map_or(&EMPTY_STEP as &dyn Step<T, C>, |slot| slot.step.as_ref())
    }

    /// Append a step
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked.
    pub fn add_step<S: Step<T, C>>(&mut self, step: S) -> Result<&mut Self> {
        let index = self.slots.len();
        self.insert_step(index, Box::new(step))?;
        Ok(self)
    }

    /// Insert a step at `index`
    ///
    /// The step gets a fresh id, is linked to its neighbors, registers its
    /// side-effect keys and adopts its child traversals.
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked, or
    /// [`TraversalError::IndexOutOfBounds`] when `index > len`.
    pub fn insert_step(&mut self, index: usize, mut step: Box<dyn Step<T, C>>) -> Result<()> {
        self.ensure_unlocked()?;
        let len = self.slots.len();
        if index > len {
            return Err(TraversalError::IndexOutOfBounds { index, len });
        }

        let id = self.position.next_x_id();
        step.base_mut().set_id(id.clone());
        step.base_mut().set_owner(self.id);
        let depth = self.depth() + 1;
        for (child_index, child) in step.children_mut().iter_mut().enumerate() {
            child.anchor(id.clone(), depth, child_index);
            child.side_effects = self.side_effects.clone();
            child.share_fault(&self.fault);
            child.strategies = self.strategies.clone();
            if let Some(graph) = &self.graph {
                child.graph = Some(Arc::clone(graph));
            }
        }
        step.register_side_effects(&self.side_effects);

        trace!(traversal = %self.id, step = %id, name = step.name(), index, "step inserted");
        self.slots.insert(index, StepSlot::new(step));
        self.relink();
        Ok(())
    }

    /// Remove and return the step at `index`, detached
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked, or
    /// [`TraversalError::IndexOutOfBounds`].
    pub fn remove_step(&mut self, index: usize) -> Result<Box<dyn Step<T, C>>> {
        self.ensure_unlocked()?;
        let len = self.slots.len();
        if index >= len {
            return Err(TraversalError::IndexOutOfBounds { index, len });
        }
        let mut step = self.slots.remove(index).step;
        trace!(traversal = %self.id, step = %step.base().id(), index, "step removed");
        step.base_mut().detach();
        self.relink();
        Ok(step)
    }

    /// Replace the step at `index`, returning the old one detached
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] once locked, or
    /// [`TraversalError::IndexOutOfBounds`].
    pub fn replace_step(
        &mut self,
        index: usize,
        step: Box<dyn Step<T, C>>,
    ) -> Result<Box<dyn Step<T, C>>> {
        let removed = self.remove_step(index)?;
        self.insert_step(index, step)?;
        Ok(removed)
    }

    /// Apply strategies and lock the traversal
    ///
    /// Only a root or a computation root rewrites its tree; any other nested
    /// traversal is re-identified and locked as is.
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Locked`] when already locked, or the first
    /// error raised by a strategy.
    pub fn apply_strategies(&mut self) -> Result<()> {
        if self.locked {
            return Err(TraversalError::Locked);
        }
        self.reassign_ids();

        let full = self.is_root() || self.is_computation_root();
        if full {
            debug!(
                traversal = %self.id,
                steps = self.slots.len(),
                strategies = self.strategies.len(),
                "applying strategies"
            );
            let graph = self.graph.clone();
            let strategies = self.strategies.clone();
            let side_effects = self.side_effects.clone();
            self.push_context(graph.as_ref(), &strategies, &side_effects);

            for strategy in strategies.iter() {
                let _span = debug_span!("strategy", name = strategy.name()).entered();
                self.apply_recursively(&mut |traversal: &mut Self| strategy.apply(traversal))?;
            }

            self.finalize_children()?;
        }

        self.end_step = self.slots.len().checked_sub(1);

        if full {
            self.requirements = None;
            let requirements = self.traverser_requirements();
            self.generator =
                TraverserGenerator::new(requirements, self.side_effects.sack_initial_value());
            let generator = self.generator.clone();
            self.publish_generator(&generator);
        }

        self.locked = true;
        debug!(traversal = %self.id, steps = self.slots.len(), "traversal locked");
        Ok(())
    }

    /// Capabilities traversers of this tree need
    ///
    /// Cached until the next root lock.
    pub fn traverser_requirements(&mut self) -> Arc<RequirementSet> {
        if let Some(requirements) = &self.requirements {
            return Arc::clone(requirements);
        }
        let mut requirements = RequirementSet::new();
        self.collect_requirements(&mut requirements);
        if !self.side_effects.is_empty() {
            requirements.insert(TraverserRequirement::SideEffects);
        }
        if self.side_effects.sack_initial_value().is_some() {
            requirements.insert(TraverserRequirement::Sack);
        }
        requirement::normalize(&mut requirements);
        let requirements = Arc::new(requirements);
        self.requirements = Some(Arc::clone(&requirements));
        requirements
    }

    fn collect_requirements(&self, requirements: &mut RequirementSet) {
        for slot in &self.slots {
            requirements.extend(slot.step.requirements());
            if !slot.step.base().labels().is_empty() {
                requirements.insert(TraverserRequirement::LabeledPath);
            }
            for child in slot.step.children() {
                child.collect_requirements(requirements);
            }
        }
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(TraversalError::Locked)
        } else {
            Ok(())
        }
    }

    fn ensure_locked(&mut self) -> Result<()> {
        if self.locked {
            Ok(())
        } else {
            self.apply_strategies()
        }
    }

    fn anchor(&mut self, step: StepId, depth: usize, child_index: usize) {
        let computation_root = self.is_computation_root();
        self.parent = Some(ParentStep {
            step,
            depth,
            child_index,
            computation_root,
        });
    }

    fn reassign_ids(&mut self) {
        self.position = match &self.parent {
            None => StepPosition::root(),
            Some(parent) => StepPosition::nested(parent.depth, parent.child_index, &parent.step),
        };
        let depth = self.depth() + 1;
        for slot in &mut self.slots {
            let id = self.position.next_x_id();
            slot.step.base_mut().set_id(id.clone());
            slot.step.base_mut().set_owner(self.id);
            for (child_index, child) in slot.step.children_mut().iter_mut().enumerate() {
                child.anchor(id.clone(), depth, child_index);
            }
        }
        self.relink();
    }

    fn relink(&mut self) {
        let ids: Vec<StepId> = self
            .slots
            .iter()
            .map(|slot| slot.step.base().id().clone())
            .collect();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let previous = i
                .checked_sub(1)
                .and_then(|p| ids.get(p))
                .map_or(StepRef::Empty, |id| StepRef::Step(id.clone()));
            let next = ids
                .get(i + 1)
                .map_or(StepRef::Empty, |id| StepRef::Step(id.clone()));
            slot.step.base_mut().link(previous, next);
        }
    }

    fn push_context(
        &mut self,
        graph: Option<&GraphHandle>,
        strategies: &TraversalStrategies<T, C>,
        side_effects: &SideEffects,
    ) {
        if let Some(graph) = graph {
            self.graph = Some(Arc::clone(graph));
        }
        self.strategies = strategies.clone();
        self.side_effects = side_effects.clone();
        for slot in &mut self.slots {
            slot.step.register_side_effects(side_effects);
            for child in slot.step.children_mut() {
                child.push_context(graph, strategies, side_effects);
            }
        }
    }

    fn apply_recursively<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Self) -> Result<()>,
    {
        f(self)?;
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                if !child.locked {
                    child.apply_recursively(f)?;
                }
            }
        }
        Ok(())
    }

    fn finalize_children(&mut self) -> Result<()> {
        let graph = self.graph.clone();
        let side_effects = self.side_effects.clone();
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                if let Some(graph) = &graph {
                    child.graph = Some(Arc::clone(graph));
                }
                if child.is_computation_root() {
                    continue;
                }
                if !child.is_root() && !child.locked {
                    child.side_effects = side_effects.clone();
                    child.apply_strategies()?;
                }
                child.finalize_children()?;
            }
        }
        Ok(())
    }

    fn publish_generator(&mut self, generator: &TraverserGenerator<C>) {
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                child.generator = generator.clone();
                child.publish_generator(generator);
            }
        }
    }

    fn pull_end(&mut self) -> std::result::Result<Traverser<T, C>, StreamExhausted> {
        let Some(end) = self.end_step else {
            return Err(StreamExhausted);
        };
        let ctx = StepContext::new(&self.generator, &self.side_effects, self.graph.as_deref());
        let upto = (end + 1).min(self.slots.len());
        step::pull(&mut self.slots[..upto], &ctx)
    }

    fn buffered(&self) -> bool {
        self.last_traverser
            .as_ref()
            .is_some_and(|t| !t.is_exhausted())
    }

    fn fill_buffer(&mut self) -> std::result::Result<(), StreamExhausted> {
        if self.closed {
            return Err(StreamExhausted);
        }
        if self.buffered() {
            return Ok(());
        }
        match self.pull_end() {
            Ok(traverser) => {
                self.last_traverser = Some(traverser);
                Ok(())
            }
            Err(exhausted) => {
                self.last_traverser = None;
                self.close();
                Err(exhausted)
            }
        }
    }

    fn translate(&self, exhausted: StreamExhausted) -> TraversalError {
        if self.is_root() {
            TraversalError::NoSuchElement
        } else {
            TraversalError::Exhausted(exhausted)
        }
    }

    fn advance(&mut self) -> Result<bool> {
        self.ensure_locked()?;
        let filled = self.fill_buffer().is_ok();
        if let Some(err) = self.fault.lock().take() {
            self.last_traverser = None;
            return Err(err);
        }
        Ok(filled)
    }

    /// Check whether another result is available
    ///
    /// Always `false` once closed.
    ///
    /// # Errors
    ///
    /// Fails when the implicit lock fails or a nested traversal could not
    /// be locked.
    pub fn has_next(&mut self) -> Result<bool> {
        self.advance()
    }

    /// Next result, one per unit of multiplicity
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::NoSuchElement`] on an exhausted root,
    /// [`TraversalError::Exhausted`] on an exhausted nested traversal, or a
    /// lock failure.
    pub fn next_value(&mut self) -> Result<T> {
        if !self.advance()? {
            return Err(self.translate(StreamExhausted));
        }
        let Some(traverser) = self.last_traverser.as_mut() else {
            return Err(self.translate(StreamExhausted));
        };
        let value = traverser.get().clone();
        let remaining = traverser.multiplicity().saturating_sub(1);
        traverser.set_multiplicity(remaining);
        if remaining == 0 {
            self.last_traverser = None;
        }
        Ok(value)
    }

    /// Next whole traverser, with its remaining multiplicity
    ///
    /// # Errors
    ///
    /// Same as [`Traversal::next_value`].
    pub fn next_traverser(&mut self) -> Result<Traverser<T, C>> {
        if !self.advance()? {
            return Err(self.translate(StreamExhausted));
        }
        self.last_traverser
            .take()
            .ok_or_else(|| self.translate(StreamExhausted))
    }

    /// Next result, `None` once exhausted
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn try_next(&mut self) -> Result<Option<T>> {
        match self.next_value() {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_exhaustion() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Up to `n` results
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn next_n(&mut self, n: usize) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(n);
        while values.len() < n {
            match self.try_next()? {
                Some(value) => values.push(value),
                None => break,
            }
        }
        Ok(values)
    }

    /// All remaining results
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn to_list(&mut self) -> Result<Vec<T>> {
        let mut values = Vec::new();
        while let Some(value) = self.try_next()? {
            values.push(value);
        }
        Ok(values)
    }

    /// Drain the traversal for its side effects
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn iterate(&mut self) -> Result<()> {
        while self.advance()? {
            self.last_traverser = None;
        }
        Ok(())
    }

    /// Stop iteration and run every step's close hook
    ///
    /// Idempotent until reopened by [`Traversal::reset`] or a new start.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.last_traverser = None;
        for slot in &mut self.slots {
            slot.step.close();
        }
        debug!(traversal = %self.id, "traversal closed");
    }

    /// Clear iteration state, keeping the lock
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.starts.clear();
            slot.step.reset();
        }
        self.last_traverser = None;
        self.closed = false;
    }

    /// Feed a traverser to the first step
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn add_start(&mut self, start: Traverser<T, C>) -> Result<()> {
        self.ensure_locked()?;
        self.feed(start);
        Ok(())
    }

    /// Feed several traversers to the first step
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn add_starts<I>(&mut self, starts: I) -> Result<()>
    where
        I: IntoIterator<Item = Traverser<T, C>>,
    {
        self.ensure_locked()?;
        for start in starts {
            self.feed(start);
        }
        Ok(())
    }

    /// Generate traversers for `values` and feed them to the first step
    ///
    /// # Errors
    ///
    /// Fails only when the implicit lock fails.
    pub fn add_start_values<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        self.ensure_locked()?;
        let labels: Labels = self.start_step().base().labels().clone();
        for value in values {
            let start = self.generator.generate_one(value, &labels);
            self.feed(start);
        }
        Ok(())
    }

    fn feed(&mut self, start: Traverser<T, C>) {
        if let Some(first) = self.slots.first_mut() {
            first.starts.push_back(start);
        }
        self.closed = false;
    }

    fn lock_nested(&mut self) -> bool {
        if self.locked {
            return true;
        }
        match self.apply_strategies() {
            Ok(()) => true,
            Err(err) => {
                error!(traversal = %self.id, error = %err, "nested traversal failed to lock");
                self.fault.lock().get_or_insert(err);
                false
            }
        }
    }

    /// Feed a start to a nested traversal
    ///
    /// The start is dropped when the traversal cannot be locked. The lock
    /// error is then raised by the next pull on the root.
    pub fn push_start(&mut self, start: Traverser<T, C>) {
        if self.lock_nested() {
            self.feed(start);
        }
    }

    /// Next traverser of a nested traversal
    ///
    /// # Errors
    ///
    /// Returns [`StreamExhausted`] once the nested stream is drained.
    pub fn try_next_traverser(&mut self) -> std::result::Result<Traverser<T, C>, StreamExhausted> {
        if !self.lock_nested() {
            return Err(StreamExhausted);
        }
        self.fill_buffer()?;
        self.last_traverser.take().ok_or(StreamExhausted)
    }

    /// Check whether a nested traversal has another traverser
    pub fn has_next_nested(&mut self) -> bool {
        self.lock_nested() && self.fill_buffer().is_ok()
    }

    /// Fully independent copy with fresh iteration state
    ///
    /// Steps are deep-cloned and reset, links rebuilt, the side-effect store
    /// deep-cloned and shared with every nested traversal of the copy.
    /// Strategies stay shared.
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::CloneFailure`] when a step cannot be cloned.
    pub fn try_clone(&self) -> Result<Self> {
        let mut clone = Self {
            id: TraversalId::new(),
            slots: Vec::with_capacity(self.slots.len()),
            position: self.position.clone(),
            parent: self.parent.clone(),
            side_effects: self.side_effects.deep_clone(),
            fault: NestedFault::default(),
            strategies: self.strategies.clone(),
            graph: self.graph.clone(),
            generator: self.generator.clone(),
            requirements: self.requirements.clone(),
            last_traverser: None,
            end_step: self.end_step,
            locked: self.locked,
            closed: false,
        };
        for slot in &self.slots {
            let mut step = slot.step.clone_step()?;
            step.reset();
            step.base_mut().set_owner(clone.id);
            clone.slots.push(StepSlot::new(step));
        }
        clone.relink();
        let side_effects = clone.side_effects.clone();
        let fault = Arc::clone(&clone.fault);
        clone.share_state(&side_effects, &fault);
        Ok(clone)
    }

    fn share_state(&mut self, side_effects: &SideEffects, fault: &NestedFault) {
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                child.side_effects = side_effects.clone();
                child.fault = Arc::clone(fault);
                child.share_state(side_effects, fault);
            }
        }
    }

    fn share_fault(&mut self, fault: &NestedFault) {
        self.fault = Arc::clone(fault);
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                child.share_fault(fault);
            }
        }
    }
}

impl<T: Payload, C: Coefficient> fmt::Display for Traversal<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, step) in self.steps().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&step.render())?;
        }
        f.write_str("]")
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for Traversal<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traversal")
            .field("id", &self.id)
            .field("steps", &self.slots)
            .field("parent", &self.parent)
            .field("strategies", &self.strategies)
            .field("locked", &self.locked)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}
