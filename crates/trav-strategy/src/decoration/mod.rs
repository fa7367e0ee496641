//! Decoration strategies
//!
//! Add state or steps the caller did not write explicitly.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;
use trav_process::{
    Coefficient, Payload, StrategyCategory, Traversal, TraversalError, TraversalStrategy,
};

/// Seeds the side-effect store and the sack initial value
///
/// Keys already present in the store are left alone, so applying the
/// strategy twice changes nothing.
#[derive(Debug, Clone, Default)]
pub struct SideEffectStrategy {
    side_effects: IndexMap<String, Value>,
    sack: Option<Value>,
}

impl SideEffectStrategy {
    /// Strategy name
    pub const NAME: &'static str = "SideEffectStrategy";

    /// Empty decoration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `key` with `value`
    #[must_use]
    pub fn with_side_effect(mut self, key: impl Into<String>, value: Value) -> Self {
        self.side_effects.insert(key.into(), value);
        self
    }

    /// Give every traverser a sack starting at `value`
    #[must_use]
    pub fn with_sack(mut self, value: Value) -> Self {
        self.sack = Some(value);
        self
    }

    /// Seeded keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.side_effects.keys().map(String::as_str)
    }

    /// Sack initial value, if any
    #[must_use]
    pub fn sack(&self) -> Option<&Value> {
        self.sack.as_ref()
    }

    /// Check whether the strategy seeds nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.side_effects.is_empty() && self.sack.is_none()
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategy<T, C> for SideEffectStrategy {
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError> {
        // nested traversals share the root store
        if !traversal.is_root() {
            return Ok(());
        }
        let store = traversal.side_effects();
        for (key, value) in &self.side_effects {
            if store.register_if_absent(key, || value.clone()) {
                debug!(traversal = %traversal.id(), key = %key, "side effect seeded");
            }
        }
        if let Some(sack) = &self.sack {
            if store.sack_initial_value().is_none() {
                store.set_sack_initial_value(sack.clone());
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::Decoration
    }
}
