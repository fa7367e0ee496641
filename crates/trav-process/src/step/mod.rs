//! Step contract and pull protocol
//!
//! A traversal stores its steps in an arena of [`StepSlot`]s. Links between
//! steps are ids, not pointers, and pulling from the previous step is done by
//! splitting the arena: the last slot is the step being asked for a
//! traverser, the slice before it is everything upstream.
//!
//! # Core Concepts
//!
//! - [`Step`]: one processing stage
//! - [`StepBase`]: identity, labels and links every step carries
//! - [`Starts`]: a step's view of its upstream
//! - [`StepContext`]: generator, side effects and graph of the running traversal
//! - [`EmptyStep`]: sentinel returned instead of a missing neighbor

use crate::error::{StreamExhausted, TraversalError};
use crate::graph::Graph;
use crate::side_effects::SideEffects;
use crate::traversal::{Traversal, TraversalId};
use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use trav_traverser::{
    Coefficient, Labels, LongCoefficient, Payload, RequirementSet, Traverse, Traverser,
    TraverserGenerator,
};

mod barrier;
mod branch;
mod filter;
mod map;
mod side_effect;
mod source;

pub use barrier::{CountStep, NoOpBarrierStep, DEFAULT_BARRIER_SIZE};
pub use branch::{LocalStep, TraversalFilterStep};
pub use filter::{DedupStep, FilterStep, IdentityStep};
pub use map::{FlatMapStep, MapStep, WeightStep};
pub use side_effect::{InspectStep, SideEffectStep, MAX_AGGREGATE_REPEAT};
pub use source::InjectStep;

/// Position-assigned step identifier, `x.y.z(parentId)`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StepId(String);

impl StepId {
    /// Wrap an id string
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    const fn unassigned() -> Self {
        Self(String::new())
    }

    /// Id as a string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Link to a neighboring step
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum StepRef {
    /// No neighbor; stands in for the sentinel step
    #[default]
    Empty,

    /// Neighbor in the same traversal
    Step(StepId),
}

impl StepRef {
    /// Check for the sentinel
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Neighbor id, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<&StepId> {
        match self {
            Self::Empty => None,
            Self::Step(id) => Some(id),
        }
    }
}

/// Id generator for one traversal
///
/// `x` counts steps; `y` is the nesting depth and `z` the child index under
/// the parent step named in parentheses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepPosition {
    x: usize,
    y: usize,
    z: usize,
    parent_id: String,
}

impl StepPosition {
    /// Position for a root traversal
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Position for a child traversal of `parent`
    #[must_use]
    pub fn nested(depth: usize, child_index: usize, parent: &StepId) -> Self {
        Self {
            x: 0,
            y: depth,
            z: child_index,
            parent_id: parent.as_str().to_string(),
        }
    }

    /// Next id; monotonically increasing within this position
    pub fn next_x_id(&mut self) -> StepId {
        let id = format!("{}.{}.{}({})", self.x, self.y, self.z, self.parent_id);
        self.x += 1;
        StepId(id)
    }
}

/// State every step carries
#[derive(Debug, Clone, Default)]
pub struct StepBase {
    id: StepId,
    labels: Labels,
    previous: StepRef,
    next: StepRef,
    owner: Option<TraversalId>,
}

impl StepBase {
    /// Detached base with no id
    #[must_use]
    pub const fn new() -> Self {
        Self {
            id: StepId::unassigned(),
            labels: Labels::new(),
            previous: StepRef::Empty,
            next: StepRef::Empty,
            owner: None,
        }
    }

    /// Step id
    #[inline]
    #[must_use]
    pub fn id(&self) -> &StepId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: StepId) {
        self.id = id;
    }

    /// Step labels
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Add a label
    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.insert(label.into());
    }

    /// Remove a label
    pub fn remove_label(&mut self, label: &str) -> bool {
        self.labels.remove(label)
    }

    /// Remove and return all labels
    pub fn take_labels(&mut self) -> Labels {
        std::mem::take(&mut self.labels)
    }

    /// Previous step link
    #[inline]
    #[must_use]
    pub fn previous(&self) -> &StepRef {
        &self.previous
    }

    /// Next step link
    #[inline]
    #[must_use]
    pub fn next(&self) -> &StepRef {
        &self.next
    }

    pub(crate) fn link(&mut self, previous: StepRef, next: StepRef) {
        self.previous = previous;
        self.next = next;
    }

    /// Owning traversal, `None` while detached
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<TraversalId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: TraversalId) {
        self.owner = Some(owner);
    }

    pub(crate) fn detach(&mut self) {
        self.previous = StepRef::Empty;
        self.next = StepRef::Empty;
        self.owner = None;
    }
}

/// Downcasting support for steps
pub trait AsAny: Any {
    /// View as [`Any`]
    fn as_any(&self) -> &dyn Any;

    /// Mutable view as [`Any`]
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: Any> AsAny for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// One processing stage of a traversal
///
/// `process_next` is asked for one traverser at a time. It pulls from
/// `starts` as needed and returns `Err(StreamExhausted)` when it has nothing
/// more to produce. Returned traversers with zero multiplicity are dropped by
/// the caller.
pub trait Step<T: Payload, C: Coefficient = LongCoefficient>: AsAny + fmt::Debug + Send {
    /// Identity, labels and links
    fn base(&self) -> &StepBase;

    /// Mutable identity, labels and links
    fn base_mut(&mut self) -> &mut StepBase;

    /// Step type name used in rendering
    fn name(&self) -> &'static str;

    /// Produce the next traverser
    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted>;

    /// Traverser capabilities this step needs
    fn requirements(&self) -> RequirementSet {
        RequirementSet::new()
    }

    /// Weight applied to traversers passing through
    fn coefficient(&self) -> C {
        C::one()
    }

    /// Clear cursor state so the step can run again
    fn reset(&mut self) {}

    /// Release resources once the traversal is exhausted
    fn close(&mut self) {}

    /// Deep copy with fresh cursor state
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::CloneFailure`] when the step holds a
    /// resource that cannot be duplicated.
    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError>;

    /// Nested traversals owned by this step
    fn children(&self) -> &[Traversal<T, C>] {
        &[]
    }

    /// Mutable nested traversals owned by this step
    fn children_mut(&mut self) -> &mut [Traversal<T, C>] {
        &mut []
    }

    /// Register side-effect keys this step writes
    fn register_side_effects(&self, _side_effects: &SideEffects) {}

    /// Check whether the step runs caller-supplied closures
    fn is_lambda(&self) -> bool {
        false
    }

    /// Parameters shown in the rendered pipeline
    fn params(&self) -> String {
        String::new()
    }
}

impl<T: Payload, C: Coefficient> dyn Step<T, C> {
    /// Check the concrete step type
    #[must_use]
    pub fn is<S: Step<T, C>>(&self) -> bool {
        self.as_any().is::<S>()
    }

    /// Downcast to a concrete step type
    #[must_use]
    pub fn downcast_ref<S: Step<T, C>>(&self) -> Option<&S> {
        self.as_any().downcast_ref::<S>()
    }

    /// Mutable downcast to a concrete step type
    pub fn downcast_mut<S: Step<T, C>>(&mut self) -> Option<&mut S> {
        self.as_any_mut().downcast_mut::<S>()
    }

    /// Render as `Name(params)@[labels]`
    #[must_use]
    pub fn render(&self) -> String {
        let params = self.params();
        let mut out = if params.is_empty() {
            self.name().to_string()
        } else {
            format!("{}({params})", self.name())
        };
        let labels = self.base().labels();
        if !labels.is_empty() {
            let joined: Vec<&str> = labels.iter().map(String::as_str).collect();
            out.push_str(&format!("@[{}]", joined.join(", ")));
        }
        out
    }
}

/// Sentinel standing in for a missing step; always exhausted
#[derive(Debug, Default)]
pub struct EmptyStep {
    base: StepBase,
}

impl EmptyStep {
    /// Create the sentinel
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: StepBase::new(),
        }
    }
}

/// Shared sentinel instance
pub static EMPTY_STEP: EmptyStep = EmptyStep::new();

impl<T: Payload, C: Coefficient> Step<T, C> for EmptyStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "EmptyStep"
    }

    fn process_next(
        &mut self,
        _starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        Err(StreamExhausted)
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(Self::new()))
    }
}

/// Execution context shared by every step of a running traversal
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a, C> {
    generator: &'a TraverserGenerator<C>,
    side_effects: &'a SideEffects,
    graph: Option<&'a dyn Graph>,
}

impl<'a, C: Coefficient> StepContext<'a, C> {
    pub(crate) fn new(
        generator: &'a TraverserGenerator<C>,
        side_effects: &'a SideEffects,
        graph: Option<&'a dyn Graph>,
    ) -> Self {
        Self {
            generator,
            side_effects,
            graph,
        }
    }

    /// Generator published by the root traversal
    #[inline]
    #[must_use]
    pub fn generator(&self) -> &'a TraverserGenerator<C> {
        self.generator
    }

    /// Shared side-effect store
    #[inline]
    #[must_use]
    pub fn side_effects(&self) -> &'a SideEffects {
        self.side_effects
    }

    /// Graph handle, if one was pushed
    #[inline]
    #[must_use]
    pub fn graph(&self) -> Option<&'a dyn Graph> {
        self.graph
    }
}

/// A step in the arena together with its start buffer
pub struct StepSlot<T: Payload, C: Coefficient> {
    pub(crate) step: Box<dyn Step<T, C>>,
    pub(crate) starts: VecDeque<Traverser<T, C>>,
}

impl<T: Payload, C: Coefficient> StepSlot<T, C> {
    pub(crate) fn new(step: Box<dyn Step<T, C>>) -> Self {
        Self {
            step,
            starts: VecDeque::new(),
        }
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for StepSlot<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSlot")
            .field("step", &self.step)
            .field("starts", &self.starts.len())
            .finish()
    }
}

/// Upstream of the step currently being asked for a traverser
///
/// Traversers added directly to the step are served first, then the
/// previous step is pulled.
pub struct Starts<'a, T: Payload, C: Coefficient> {
    buffered: &'a mut VecDeque<Traverser<T, C>>,
    previous: &'a mut [StepSlot<T, C>],
    ctx: &'a StepContext<'a, C>,
}

impl<'a, T: Payload, C: Coefficient> Starts<'a, T, C> {
    /// Next live upstream traverser
    ///
    /// # Errors
    ///
    /// Returns [`StreamExhausted`] when the buffer is drained and the
    /// previous step is exhausted.
    pub fn next_start(&mut self) -> Result<Traverser<T, C>, StreamExhausted> {
        while let Some(traverser) = self.buffered.pop_front() {
            if !traverser.is_exhausted() {
                return Ok(traverser);
            }
        }
        pull(self.previous, self.ctx)
    }

    /// Check for directly added traversers
    #[inline]
    #[must_use]
    pub fn has_buffered(&self) -> bool {
        !self.buffered.is_empty()
    }

    /// Context of the running traversal
    #[inline]
    #[must_use]
    pub fn context(&self) -> &StepContext<'a, C> {
        self.ctx
    }
}

/// Pull one traverser from the last slot of `slots`
///
/// An empty slice behaves as the sentinel step.
pub(crate) fn pull<T: Payload, C: Coefficient>(
    slots: &mut [StepSlot<T, C>],
    ctx: &StepContext<'_, C>,
) -> Result<Traverser<T, C>, StreamExhausted> {
    let Some((last, previous)) = slots.split_last_mut() else {
        return Err(StreamExhausted);
    };
    loop {
        let mut starts = Starts {
            buffered: &mut last.starts,
            previous: &mut *previous,
            ctx,
        };
        let traverser = last.step.process_next(&mut starts)?;
        if !traverser.is_exhausted() {
            return Ok(traverser);
        }
    }
}
