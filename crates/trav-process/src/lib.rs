//! Step pipeline execution for the traversal engine
//!
//! Evaluates a query expressed as an ordered pipeline of steps over a lazily
//! pulled stream of traversers. A pipeline is mutable while it is built,
//! rewritten by its strategies when it locks, and then iterated.
//!
//! # Core Concepts
//!
//! - [`Traversal`]: step arena, lock lifecycle and pull surface
//! - [`Step`]: one processing stage; built-ins live in [`step`]
//! - [`TraversalStrategy`]: a rewrite applied at lock time
//! - [`TraversalStrategies`]: immutable, ordered, shared strategy set
//! - [`SideEffects`]: key/value store shared across a traversal tree
//!
//! # Example
//!
//! ```rust
//! use trav_process::step::{FilterStep, InjectStep, MapStep};
//! use trav_process::Traversal;
//!
//! let mut traversal: Traversal<i64> = Traversal::new();
//! traversal
//!     .add_step(InjectStep::new([1, 2, 3]))?
//!     .add_step(FilterStep::new("even", |v: &i64| v % 2 == 0))?
//!     .add_step(MapStep::new("times10", |v: &i64| v * 10))?;
//!
//! assert_eq!(traversal.to_list()?, vec![20]);
//! # Ok::<(), trav_process::TraversalError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod graph;
pub mod helper;
mod side_effects;
pub mod step;
mod strategy;
mod traversal;

pub use error::{Result, StreamExhausted, TraversalError};
pub use graph::{EmptyGraph, Graph, GraphHandle};
pub use side_effects::SideEffects;
pub use step::{EmptyStep, Starts, Step, StepBase, StepContext, StepId, StepRef, EMPTY_STEP};
pub use strategy::{StrategyCategory, StrategyHandle, TraversalStrategies, TraversalStrategy};
pub use traversal::{ExplanationRow, ParentStep, Traversal, TraversalExplanation, TraversalId};

/// Re-exported traverser types
pub use trav_traverser::{
    Coefficient, Labels, LongCoefficient, Path, Payload, RealCoefficient, RequirementSet, Traverse,
    Traverser, TraverserGenerator, TraverserRequirement, Via,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and running traversals
    pub use crate::step::{
        CountStep, DedupStep, FilterStep, FlatMapStep, IdentityStep, InjectStep, InspectStep,
        LocalStep, MapStep, NoOpBarrierStep, SideEffectStep, TraversalFilterStep, WeightStep,
    };
    pub use crate::{
        SideEffects, Step, StrategyCategory, Traversal, TraversalError, TraversalStrategies,
        TraversalStrategy, Traverse, Traverser,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
