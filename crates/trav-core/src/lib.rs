//! Traversal engine surface
//!
//! Ties the step pipeline and the built-in strategies together:
//! - [`EngineConfig`] loads strategy selection and seeds from TOML
//! - [`TraversalSource`] spawns configured root traversals
//! - [`execute_partitioned`] runs clones of a locked traversal on rayon
//! - [`init_tracing`] installs a subscriber for the engine's events
//!
//! # Example
//!
//! ```rust
//! use trav_core::prelude::*;
//!
//! let config = EngineConfig::from_toml_str(
//!     r#"
//!     profile = "standard"
//!     barrier_size = 64
//!     "#,
//! )?;
//! let source: TraversalSource<i64> = TraversalSource::from_config(&config)?;
//!
//! let mut traversal = source.inject(1..=6)?;
//! traversal
//!     .add_step(FilterStep::new("odd", |v: &i64| v % 2 == 1))?
//!     .add_step(MapStep::new("square", |v: &i64| v * v))?;
//!
//! assert_eq!(traversal.to_list()?, vec![1, 9, 25]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod logging;
pub mod parallel;
pub mod source;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, Result};
pub use logging::{init_tracing, init_tracing_with, LogFormat};
pub use parallel::execute_partitioned;
pub use source::TraversalSource;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and running traversals
    pub use crate::{
        execute_partitioned, init_tracing, EngineConfig, EngineError, TraversalSource,
    };
    pub use trav_process::prelude::*;
    pub use trav_strategy::{StrategyProfile, StrategyRegistry};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
