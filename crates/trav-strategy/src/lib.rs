//! Built-in traversal strategies
//!
//! Rewrites applied to a traversal when it locks, grouped by the phase they
//! run in.
//!
//! # Core Concepts
//!
//! - [`SideEffectStrategy`]: seeds side-effect keys and the sack
//! - [`IdentityRemovalStrategy`]: drops pass-through steps
//! - [`AdjacentFilterMergeStrategy`]: folds adjacent filters into one
//! - [`LazyBarrierStrategy`]: bulks traversers after fan-out steps
//! - [`InspectStrategy`]: reports every result as a trace event
//! - [`LambdaRestrictionStrategy`]: rejects closure-based steps
//! - [`StrategyRegistry`]: strategies by name
//! - [`StrategyProfile`]: named selections (`standard`, `strict`, `none`)
//!
//! # Example
//!
//! ```rust
//! use trav_process::step::{FilterStep, IdentityStep, InjectStep};
//! use trav_process::Traversal;
//! use trav_strategy::{StrategyProfile, StrategyRegistry};
//!
//! let registry = StrategyRegistry::with_defaults();
//! let strategies = registry.profile(StrategyProfile::Standard)?;
//!
//! let mut traversal: Traversal<i64> = Traversal::new().with_strategies(strategies);
//! traversal
//!     .add_step(InjectStep::new(1..=10))?
//!     .add_step(IdentityStep::new())?
//!     .add_step(FilterStep::new("even", |v: &i64| v % 2 == 0))?
//!     .add_step(FilterStep::new("small", |v: &i64| *v < 5))?;
//!
//! assert_eq!(traversal.to_list()?, vec![2, 4]);
//! assert_eq!(traversal.len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod decoration;
mod finalization;
mod optimization;
mod registry;
mod verification;

// Re-exports
pub use decoration::SideEffectStrategy;
pub use finalization::InspectStrategy;
pub use optimization::{AdjacentFilterMergeStrategy, IdentityRemovalStrategy, LazyBarrierStrategy};
pub use registry::{StrategyError, StrategyProfile, StrategyRegistry, BUILTIN_STRATEGIES};
pub use verification::LambdaRestrictionStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
