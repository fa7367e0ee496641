//! Traverser representations for the traversal engine
//!
//! A traverser is the unit of work flowing through a step pipeline: a
//! payload plus a multiplicity saying how many times that payload is
//! logically present.
//!
//! # Core Concepts
//!
//! - [`Traverse`]: contract shared by every representation
//! - [`CountingTraverser`]: integer bulk, optional path, loops and sack
//! - [`CoefficientTraverser`]: semiring weight multiplied on split
//! - [`Traverser`]: tagged sum moved through the pipeline
//! - [`TraverserGenerator`]: builds traversers matching a [`RequirementSet`]
//!
//! # Example
//!
//! ```rust
//! use trav_traverser::{Labels, LongCoefficient, Traverse, Traverser, Via};
//!
//! let source: Traverser<i64> = Traverser::weighted(1, LongCoefficient(2));
//! let split = source.split(2, &Via::new(&Labels::new(), LongCoefficient(3)));
//! assert_eq!(split.weight(), LongCoefficient(6));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod coefficient;
mod generator;
mod path;
pub mod requirement;
mod traverser;

pub use coefficient::{Coefficient, LongCoefficient, RealCoefficient};
pub use generator::TraverserGenerator;
pub use path::{Labels, Path, PathEntry};
pub use requirement::{RequirementSet, TraverserRequirement};
pub use traverser::{
    CoefficientTraverser, CountingTraverser, Payload, Traverse, Traverser, TraverserKind, Via,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
