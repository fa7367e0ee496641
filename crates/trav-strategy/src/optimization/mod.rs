//! Optimization strategies
//!
//! Engine-independent rewrites that keep results intact.

mod filter_merge;
mod identity_removal;
mod lazy_barrier;

pub use filter_merge::AdjacentFilterMergeStrategy;
pub use identity_removal::IdentityRemovalStrategy;
pub use lazy_barrier::LazyBarrierStrategy;
