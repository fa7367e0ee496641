//! Opaque storage handle
//!
//! The engine never reads the graph itself; the handle is only pushed into
//! every nested traversal so steps can reach it through their context.

use std::fmt;
use std::sync::Arc;

/// A graph storage backend
pub trait Graph: Send + Sync + fmt::Debug {
    /// Backend name used in diagnostics
    fn name(&self) -> &str;

    /// Release backend resources
    fn close(&self) {}
}

/// Shared graph handle
pub type GraphHandle = Arc<dyn Graph>;

/// Placeholder backend with no data
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyGraph;

impl EmptyGraph {
    /// Shared handle to an empty graph
    #[must_use]
    pub fn handle() -> GraphHandle {
        Arc::new(Self)
    }
}

impl Graph for EmptyGraph {
    fn name(&self) -> &str {
        "emptygraph"
    }
}

impl fmt::Display for dyn Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
