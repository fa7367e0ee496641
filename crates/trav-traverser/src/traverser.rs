//! Traverser contract and its two representations
//!
//! [`Traverse`] is the contract every traverser satisfies. Two
//! representations implement it:
//!
//! - [`CountingTraverser`]: integer bulk ("this payload occurred N times"),
//!   optional path history, loop counter and sack value.
//! - [`CoefficientTraverser`]: a [`Coefficient`] weight that is multiplied on
//!   every split. Path tracking and loop counting are disabled for this
//!   representation; it exists for weight-only aggregation.
//!
//! [`Traverser`] is the tagged sum the pipeline moves around.
//!
//! Equality and hashing of every representation look at the payload only,
//! so equal traversers can be merged by aggregating steps.

use crate::coefficient::{Coefficient, LongCoefficient};
use crate::path::{Labels, Path};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Values that can flow through a traversal
///
/// Payloads are immutable from the traverser's perspective and may be
/// shared between a traverser and its splits.
pub trait Payload: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// Step-side data consumed by [`Traverse::split`]
#[derive(Debug, Clone)]
pub struct Via<'a, C> {
    labels: &'a Labels,
    coefficient: C,
}

impl<'a, C: Coefficient> Via<'a, C> {
    /// Split through a step with the given labels and weight
    #[inline]
    #[must_use]
    pub fn new(labels: &'a Labels, coefficient: C) -> Self {
        Self {
            labels,
            coefficient,
        }
    }

    /// Labels recorded on the new path hop
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &'a Labels {
        self.labels
    }

    /// Weight of the step
    #[inline]
    #[must_use]
    pub fn coefficient(&self) -> &C {
        &self.coefficient
    }
}

/// Common traverser contract
pub trait Traverse<T: Payload>: Clone {
    /// Weight representation
    type Weight: Coefficient;

    /// Payload
    fn get(&self) -> &T;

    /// Replace the payload
    fn set(&mut self, payload: T);

    /// Number of pending emissions; zero means consumed
    fn multiplicity(&self) -> u64;

    /// Overwrite the number of pending emissions
    fn set_multiplicity(&mut self, multiplicity: u64);

    /// Multiplicity expressed as a weight
    fn weight(&self) -> Self::Weight;

    /// Path history, `None` when not tracked
    fn path(&self) -> Option<&Path<T>>;

    /// Increment the loop counter
    fn incr_loops(&mut self);

    /// Current loop counter
    fn loops(&self) -> u32;

    /// Reset the loop counter
    fn reset_loops(&mut self);

    /// Produce an independent traverser carrying `payload`
    ///
    /// The path is copied and extended by one hop; the multiplicity is
    /// combined with the step weight according to the representation.
    #[must_use]
    fn split(&self, payload: T, via: &Via<'_, Self::Weight>) -> Self;

    /// Absorb an equal traverser's multiplicity
    fn merge(&mut self, other: &Self);

    /// Check for the consumed sentinel
    #[inline]
    fn is_exhausted(&self) -> bool {
        self.multiplicity() == 0
    }
}

/// Representation tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraverserKind {
    /// Integer bulk
    Counting,

    /// Algebraic weight
    Coefficient,
}

/// Traverser with an integer bulk
#[derive(Debug, Clone)]
pub struct CountingTraverser<T> {
    object: T,
    bulk: u64,
    path: Option<Path<T>>,
    loops: u32,
    sack: Option<Value>,
}

impl<T: Payload> CountingTraverser<T> {
    /// Traverser with bulk one and no path tracking
    #[must_use]
    pub fn new(object: T) -> Self {
        Self {
            object,
            bulk: 1,
            path: None,
            loops: 0,
            sack: None,
        }
    }

    /// Set the initial bulk
    #[inline]
    #[must_use]
    pub fn with_bulk(mut self, bulk: u64) -> Self {
        self.bulk = bulk;
        self
    }

    /// Enable path tracking, starting at the current object
    #[must_use]
    pub fn with_path(mut self, labels: &Labels) -> Self {
        self.path = Some(Path::start(self.object.clone(), labels));
        self
    }

    /// Seed the sack
    #[inline]
    #[must_use]
    pub fn with_sack(mut self, sack: Value) -> Self {
        self.sack = Some(sack);
        self
    }

    /// Sack value, if sacks are enabled
    #[inline]
    #[must_use]
    pub fn sack(&self) -> Option<&Value> {
        self.sack.as_ref()
    }

    /// Replace the sack value
    #[inline]
    pub fn set_sack(&mut self, sack: Value) {
        self.sack = Some(sack);
    }

    /// Check whether the path is tracked
    #[inline]
    #[must_use]
    pub fn tracks_path(&self) -> bool {
        self.path.is_some()
    }
}

impl<T: Payload> Traverse<T> for CountingTraverser<T> {
    type Weight = LongCoefficient;

    #[inline]
    fn get(&self) -> &T {
        &self.object
    }

    #[inline]
    fn set(&mut self, payload: T) {
        self.object = payload;
    }

    #[inline]
    fn multiplicity(&self) -> u64 {
        self.bulk
    }

    #[inline]
    fn set_multiplicity(&mut self, multiplicity: u64) {
        self.bulk = multiplicity;
    }

    #[inline]
    fn weight(&self) -> LongCoefficient {
        LongCoefficient(self.bulk)
    }

    #[inline]
    fn path(&self) -> Option<&Path<T>> {
        self.path.as_ref()
    }

    #[inline]
    fn incr_loops(&mut self) {
        self.loops = self.loops.saturating_add(1);
    }

    #[inline]
    fn loops(&self) -> u32 {
        self.loops
    }

    #[inline]
    fn reset_loops(&mut self) {
        self.loops = 0;
    }

    fn split(&self, payload: T, via: &Via<'_, LongCoefficient>) -> Self {
        let mut clone = self.clone();
        if let Some(path) = clone.path.as_mut() {
            path.extend(payload.clone(), via.labels());
        }
        clone.object = payload;
        clone
    }

    #[inline]
    fn merge(&mut self, other: &Self) {
        self.bulk = self.bulk.saturating_add(other.bulk);
    }
}

impl<T: PartialEq> PartialEq for CountingTraverser<T> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl<T: Eq> Eq for CountingTraverser<T> {}

impl<T: Hash> Hash for CountingTraverser<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
    }
}

/// Traverser weighted by a [`Coefficient`]
#[derive(Debug, Clone)]
pub struct CoefficientTraverser<T, C> {
    object: T,
    coefficient: C,
}

impl<T: Payload, C: Coefficient> CoefficientTraverser<T, C> {
    /// Traverser with the given weight
    #[inline]
    #[must_use]
    pub fn new(object: T, coefficient: C) -> Self {
        Self {
            object,
            coefficient,
        }
    }

    /// Current weight
    #[inline]
    #[must_use]
    pub fn coefficient(&self) -> &C {
        &self.coefficient
    }
}

impl<T: Payload, C: Coefficient> Traverse<T> for CoefficientTraverser<T, C> {
    type Weight = C;

    #[inline]
    fn get(&self) -> &T {
        &self.object
    }

    #[inline]
    fn set(&mut self, payload: T) {
        self.object = payload;
    }

    #[inline]
    fn multiplicity(&self) -> u64 {
        self.coefficient.count()
    }

    #[inline]
    fn set_multiplicity(&mut self, multiplicity: u64) {
        self.coefficient.set_count(multiplicity);
    }

    #[inline]
    fn weight(&self) -> C {
        self.coefficient.clone()
    }

    #[inline]
    fn path(&self) -> Option<&Path<T>> {
        None
    }

    #[inline]
    fn incr_loops(&mut self) {}

    #[inline]
    fn loops(&self) -> u32 {
        0
    }

    #[inline]
    fn reset_loops(&mut self) {}

    fn split(&self, payload: T, via: &Via<'_, C>) -> Self {
        let mut coefficient = self.coefficient.clone();
        coefficient.multiply(via.coefficient());
        Self {
            object: payload,
            coefficient,
        }
    }

    #[inline]
    fn merge(&mut self, other: &Self) {
        self.coefficient.sum(&other.coefficient);
    }
}

impl<T: PartialEq, C> PartialEq for CoefficientTraverser<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object
    }
}

impl<T: Eq, C> Eq for CoefficientTraverser<T, C> {}

impl<T: Hash, C> Hash for CoefficientTraverser<T, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.object.hash(state);
    }
}

/// A traverser in either representation
#[derive(Debug, Clone)]
pub enum Traverser<T, C = LongCoefficient> {
    /// Integer bulk
    Counting(CountingTraverser<T>),

    /// Algebraic weight
    Coefficient(CoefficientTraverser<T, C>),
}

impl<T: Payload, C: Coefficient> Traverser<T, C> {
    /// Counting traverser with bulk one and no path
    #[inline]
    #[must_use]
    pub fn counting(object: T) -> Self {
        Self::Counting(CountingTraverser::new(object))
    }

    /// Coefficient traverser with the given weight
    #[inline]
    #[must_use]
    pub fn weighted(object: T, coefficient: C) -> Self {
        Self::Coefficient(CoefficientTraverser::new(object, coefficient))
    }

    /// Representation tag
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TraverserKind {
        match self {
            Self::Counting(_) => TraverserKind::Counting,
            Self::Coefficient(_) => TraverserKind::Coefficient,
        }
    }

    /// Counting representation, if this is one
    #[inline]
    #[must_use]
    pub fn as_counting(&self) -> Option<&CountingTraverser<T>> {
        match self {
            Self::Counting(t) => Some(t),
            Self::Coefficient(_) => None,
        }
    }

    /// Coefficient representation, if this is one
    #[inline]
    #[must_use]
    pub fn as_coefficient(&self) -> Option<&CoefficientTraverser<T, C>> {
        match self {
            Self::Counting(_) => None,
            Self::Coefficient(t) => Some(t),
        }
    }

    /// Sack value (counting representation only)
    #[inline]
    #[must_use]
    pub fn sack(&self) -> Option<&Value> {
        self.as_counting().and_then(CountingTraverser::sack)
    }

    /// Consume the traverser, returning its payload
    #[must_use]
    pub fn into_payload(self) -> T {
        match self {
            Self::Counting(t) => t.object,
            Self::Coefficient(t) => t.object,
        }
    }
}

impl<T: Payload, C: Coefficient> Traverse<T> for Traverser<T, C> {
    type Weight = C;

    fn get(&self) -> &T {
        match self {
            Self::Counting(t) => t.get(),
            Self::Coefficient(t) => t.get(),
        }
    }

    fn set(&mut self, payload: T) {
        match self {
            Self::Counting(t) => t.set(payload),
            Self::Coefficient(t) => t.set(payload),
        }
    }

    fn multiplicity(&self) -> u64 {
        match self {
            Self::Counting(t) => t.multiplicity(),
            Self::Coefficient(t) => t.multiplicity(),
        }
    }

    fn set_multiplicity(&mut self, multiplicity: u64) {
        match self {
            Self::Counting(t) => t.set_multiplicity(multiplicity),
            Self::Coefficient(t) => t.set_multiplicity(multiplicity),
        }
    }

    fn weight(&self) -> C {
        match self {
            Self::Counting(t) => C::from_count(t.multiplicity()),
            Self::Coefficient(t) => t.weight(),
        }
    }

    fn path(&self) -> Option<&Path<T>> {
        match self {
            Self::Counting(t) => t.path(),
            Self::Coefficient(t) => t.path(),
        }
    }

    fn incr_loops(&mut self) {
        match self {
            Self::Counting(t) => t.incr_loops(),
            Self::Coefficient(t) => t.incr_loops(),
        }
    }

    fn loops(&self) -> u32 {
        match self {
            Self::Counting(t) => t.loops(),
            Self::Coefficient(t) => t.loops(),
        }
    }

    fn reset_loops(&mut self) {
        match self {
            Self::Counting(t) => t.reset_loops(),
            Self::Coefficient(t) => t.reset_loops(),
        }
    }

    fn split(&self, payload: T, via: &Via<'_, C>) -> Self {
        match self {
            // bulk is inherited as-is; the step weight only applies to coefficients
            Self::Counting(t) => {
                Self::Counting(t.split(payload, &Via::new(via.labels(), LongCoefficient::one())))
            }
            Self::Coefficient(t) => Self::Coefficient(t.split(payload, via)),
        }
    }

    fn merge(&mut self, other: &Self) {
        match (self, other) {
            (Self::Counting(a), Self::Counting(b)) => a.merge(b),
            (Self::Coefficient(a), Self::Coefficient(b)) => a.merge(b),
            (a, b) => {
                let total = a.multiplicity().saturating_add(b.multiplicity());
                a.set_multiplicity(total);
            }
        }
    }
}

impl<T: Payload, C: Coefficient> PartialEq for Traverser<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl<T: Payload, C: Coefficient> Eq for Traverser<T, C> {}

impl<T: Payload, C: Coefficient> Hash for Traverser<T, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.get().hash(state);
    }
}

impl<T: Payload, C: Coefficient> fmt::Display for Traverser<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.get())
    }
}
