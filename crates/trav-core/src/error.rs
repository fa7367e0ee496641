//! Error types for the engine surface
//!
//! Wraps the lower-level errors a caller of this crate can run into:
//! - configuration parsing and validation
//! - strategy lookup and ordering
//! - traversal construction and execution
//! - worker pool creation

use trav_process::TraversalError;
use trav_strategy::StrategyError;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration could not be written as TOML
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// A strategy name is not a built-in strategy
    #[error("unknown strategy in configuration: {0}")]
    UnknownStrategy(String),
}

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Strategy selection failed
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// Traversal construction or execution failed
    #[error("traversal error: {0}")]
    Traversal(#[from] TraversalError),

    /// Worker pool could not be built
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

impl EngineError {
    /// Check if the error only signals the end of results
    #[inline]
    #[must_use]
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::Traversal(e) if e.is_exhaustion())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
