//! Error types for traversal construction and execution
//!
//! Two levels of failure exist:
//! - [`StreamExhausted`]: zero-sized signal passed between steps on the hot
//!   path when a step has nothing more to produce
//! - [`TraversalError`]: everything a caller can observe

/// A step has no more traversers to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, thiserror::Error)]
#[error("traverser stream exhausted")]
pub struct StreamExhausted;

/// Main traversal error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraversalError {
    /// Structural mutation or explicit strategy application after lock
    #[error("traversal is locked and can no longer be modified")]
    Locked,

    /// A root traversal has no more results
    #[error("no such element")]
    NoSuchElement,

    /// A nested traversal has no more results
    #[error("nested traversal exhausted: {0}")]
    Exhausted(#[from] StreamExhausted),

    /// A step could not duplicate its resources
    #[error("step clone failed: {0}")]
    CloneFailure(String),

    /// Step index outside the pipeline
    #[error("step index {index} out of bounds for traversal of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Pipeline length
        len: usize,
    },

    /// Strategy prior/post constraints cannot be satisfied
    #[error("strategy ordering unsatisfiable: {0}")]
    StrategyOrder(String),

    /// A strategy rejected the pipeline
    #[error("strategy {strategy} rejected traversal: {reason}")]
    Verification {
        /// Rejecting strategy
        strategy: String,
        /// Rejection reason
        reason: String,
    },
}

impl TraversalError {
    /// Create a verification failure
    #[inline]
    pub fn verification(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Verification {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Check if the traversal is still usable after this error
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Locked
                | Self::NoSuchElement
                | Self::Exhausted(_)
                | Self::IndexOutOfBounds { .. }
        )
    }

    /// Check if the error only signals the end of results
    #[inline]
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::NoSuchElement | Self::Exhausted(_))
    }
}

/// Result alias for traversal operations
pub type Result<T> = std::result::Result<T, TraversalError>;
