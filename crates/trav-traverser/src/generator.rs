//! Traverser construction from a requirement set
//!
//! Source steps never build traversers directly; they ask the generator
//! published by the root traversal at lock time, so every traverser in a
//! pipeline carries exactly the capabilities the pipeline needs.

use crate::coefficient::{Coefficient, LongCoefficient};
use crate::path::Labels;
use crate::requirement::{requires_path, RequirementSet, TraverserRequirement};
use crate::traverser::{CoefficientTraverser, CountingTraverser, Payload, Traverser, TraverserKind};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Factory for traversers matching a requirement set
#[derive(Debug)]
pub struct TraverserGenerator<C = LongCoefficient> {
    requirements: Arc<RequirementSet>,
    kind: TraverserKind,
    track_path: bool,
    one_bulk: bool,
    sack: Option<Value>,
    _weight: PhantomData<fn() -> C>,
}

impl<C> Clone for TraverserGenerator<C> {
    fn clone(&self) -> Self {
        Self {
            requirements: Arc::clone(&self.requirements),
            kind: self.kind,
            track_path: self.track_path,
            one_bulk: self.one_bulk,
            sack: self.sack.clone(),
            _weight: PhantomData,
        }
    }
}

impl<C: Coefficient> TraverserGenerator<C> {
    /// Build a generator for `requirements`
    ///
    /// `sack` is only used when the set contains [`TraverserRequirement::Sack`].
    #[must_use]
    pub fn new(requirements: Arc<RequirementSet>, sack: Option<Value>) -> Self {
        let kind = if requirements.contains(&TraverserRequirement::Coefficient) {
            TraverserKind::Coefficient
        } else {
            TraverserKind::Counting
        };
        let track_path = requires_path(&requirements);
        let one_bulk = requirements.contains(&TraverserRequirement::OneBulk);
        let sack = if requirements.contains(&TraverserRequirement::Sack) {
            sack
        } else {
            None
        };

        Self {
            requirements,
            kind,
            track_path,
            one_bulk,
            sack,
            _weight: PhantomData,
        }
    }

    /// Requirement set this generator was built from
    #[inline]
    #[must_use]
    pub fn requirements(&self) -> &Arc<RequirementSet> {
        &self.requirements
    }

    /// Representation of generated traversers
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TraverserKind {
        self.kind
    }

    /// Check whether generated traversers track their path
    #[inline]
    #[must_use]
    pub fn tracks_path(&self) -> bool {
        self.track_path
    }

    /// Check whether every traverser must stand for exactly one occurrence
    ///
    /// Bulking steps must not merge traversers when this holds.
    #[inline]
    #[must_use]
    pub fn is_one_bulk(&self) -> bool {
        self.one_bulk
    }

    /// Create a traverser for a start object
    ///
    /// `initial` is the starting weight; counting traversers take its count
    /// as bulk (forced to one under `OneBulk`).
    #[must_use]
    pub fn generate<T: Payload>(&self, object: T, labels: &Labels, initial: C) -> Traverser<T, C> {
        match self.kind {
            TraverserKind::Coefficient => {
                Traverser::Coefficient(CoefficientTraverser::new(object, initial))
            }
            TraverserKind::Counting => {
                let bulk = if self.one_bulk { 1 } else { initial.count() };
                let mut traverser = CountingTraverser::new(object).with_bulk(bulk);
                if self.track_path {
                    traverser = traverser.with_path(labels);
                }
                if let Some(sack) = &self.sack {
                    traverser = traverser.with_sack(sack.clone());
                }
                Traverser::Counting(traverser)
            }
        }
    }

    /// Create a traverser with unit weight
    #[inline]
    #[must_use]
    pub fn generate_one<T: Payload>(&self, object: T, labels: &Labels) -> Traverser<T, C> {
        self.generate(object, labels, C::one())
    }
}

impl<C: Coefficient> Default for TraverserGenerator<C> {
    fn default() -> Self {
        Self::new(Arc::new(RequirementSet::new()), None)
    }
}
