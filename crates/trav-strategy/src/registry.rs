//! Strategy registry and named profiles
//!
//! Provides [`StrategyRegistry`] for looking strategies up by name and
//! [`StrategyProfile`] for the common selections.

use crate::decoration::SideEffectStrategy;
use crate::finalization::InspectStrategy;
use crate::optimization::{
    AdjacentFilterMergeStrategy, IdentityRemovalStrategy, LazyBarrierStrategy,
};
use crate::verification::LambdaRestrictionStrategy;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use trav_process::{
    Coefficient, LongCoefficient, Payload, StrategyHandle, TraversalError, TraversalStrategies,
    TraversalStrategy,
};

/// Names of every built-in strategy, in registration order
pub const BUILTIN_STRATEGIES: [&str; 6] = [
    SideEffectStrategy::NAME,
    IdentityRemovalStrategy::NAME,
    AdjacentFilterMergeStrategy::NAME,
    LazyBarrierStrategy::NAME,
    InspectStrategy::NAME,
    LambdaRestrictionStrategy::NAME,
];

/// Registry and profile errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// No strategy registered under the name
    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    /// No profile with the name
    #[error("unknown strategy profile: {0}")]
    UnknownProfile(String),

    /// Selected strategies cannot be ordered
    #[error(transparent)]
    Traversal(#[from] TraversalError),
}

/// Named strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyProfile {
    /// Rewrites that keep results intact - default
    #[default]
    Standard,

    /// Standard rewrites plus rejection of closure-based steps
    Strict,

    /// No strategies at all
    #[serde(rename = "none")]
    Empty,
}

impl StrategyProfile {
    /// Every profile
    pub const ALL: [Self; 3] = [Self::Standard, Self::Strict, Self::Empty];

    /// Strategy names this profile selects
    #[must_use]
    pub const fn strategy_names(self) -> &'static [&'static str] {
        match self {
            Self::Standard => &[
                IdentityRemovalStrategy::NAME,
                AdjacentFilterMergeStrategy::NAME,
                LazyBarrierStrategy::NAME,
            ],
            Self::Strict => &[
                IdentityRemovalStrategy::NAME,
                AdjacentFilterMergeStrategy::NAME,
                LazyBarrierStrategy::NAME,
                LambdaRestrictionStrategy::NAME,
            ],
            Self::Empty => &[],
        }
    }

    /// Profile name as written in configuration
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Strict => "strict",
            Self::Empty => "none",
        }
    }
}

impl fmt::Display for StrategyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyProfile {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.as_str() == s)
            .ok_or_else(|| StrategyError::UnknownProfile(s.to_string()))
    }
}

/// Strategies available by name
///
/// Strategies are stateless or immutable, so one handle serves every
/// traversal built from the registry.
pub struct StrategyRegistry<T: Payload, C: Coefficient = LongCoefficient> {
    strategies: IndexMap<&'static str, StrategyHandle<T, C>>,
}

impl<T: Payload, C: Coefficient> StrategyRegistry<T, C> {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: IndexMap::new(),
        }
    }

    /// Create registry with built-in strategies
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SideEffectStrategy::new());
        registry.register(IdentityRemovalStrategy::new());
        registry.register(AdjacentFilterMergeStrategy::new());
        registry.register(LazyBarrierStrategy::default());
        registry.register(InspectStrategy::new());
        registry.register(LambdaRestrictionStrategy::new());
        registry
    }

    /// Register a strategy, returning the one it replaces
    pub fn register<S>(&mut self, strategy: S) -> Option<StrategyHandle<T, C>>
    where
        S: TraversalStrategy<T, C> + 'static,
    {
        self.register_handle(Arc::new(strategy))
    }

    /// Register a shared handle, returning the one it replaces
    pub fn register_handle(
        &mut self,
        strategy: StrategyHandle<T, C>,
    ) -> Option<StrategyHandle<T, C>> {
        self.strategies.insert(strategy.name(), strategy)
    }

    /// Check if strategy exists
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Strategy by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StrategyHandle<T, C>> {
        self.strategies.get(name)
    }

    /// Remove strategy
    pub fn remove(&mut self, name: &str) -> Option<StrategyHandle<T, C>> {
        self.strategies.shift_remove(name)
    }

    /// Registered names in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.keys().copied().collect()
    }

    /// Get number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Iterate over all strategies
    pub fn iter(&self) -> impl Iterator<Item = &StrategyHandle<T, C>> {
        self.strategies.values()
    }

    /// Ordered strategy set holding the named strategies
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::UnknownStrategy`] for a name not registered,
    /// or [`StrategyError::Traversal`] when the set cannot be ordered.
    pub fn resolve<I, N>(&self, names: I) -> Result<TraversalStrategies<T, C>, StrategyError>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let handles = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name)
                    .cloned()
                    .ok_or_else(|| StrategyError::UnknownStrategy(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TraversalStrategies::from_strategies(handles)?)
    }

    /// Ordered strategy set for `profile`
    ///
    /// # Errors
    ///
    /// Same as [`StrategyRegistry::resolve`].
    pub fn profile(
        &self,
        profile: StrategyProfile,
    ) -> Result<TraversalStrategies<T, C>, StrategyError> {
        self.resolve(profile.strategy_names())
    }
}

impl<T: Payload, C: Coefficient> Default for StrategyRegistry<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, C: Coefficient> Clone for StrategyRegistry<T, C> {
    fn clone(&self) -> Self {
        Self {
            strategies: self.strategies.clone(),
        }
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for StrategyRegistry<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.strategies.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_new_empty() {
        let registry: StrategyRegistry<i32> = StrategyRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_with_defaults() {
        let registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        assert_eq!(registry.names(), BUILTIN_STRATEGIES.to_vec());
        for profile in StrategyProfile::ALL {
            for name in profile.strategy_names() {
                assert!(registry.contains(name), "{name} missing");
            }
        }
    }

    #[test]
    fn registry_register_replaces() {
        let mut registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        let replaced = registry.register(LazyBarrierStrategy::new(16));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn registry_remove() {
        let mut registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        assert!(registry.remove(InspectStrategy::NAME).is_some());
        assert!(!registry.contains(InspectStrategy::NAME));
        assert!(registry.remove(InspectStrategy::NAME).is_none());
    }

    #[test]
    fn resolve_sorts_by_category() {
        let registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        let set = registry
            .resolve([
                LambdaRestrictionStrategy::NAME,
                InspectStrategy::NAME,
                LazyBarrierStrategy::NAME,
                IdentityRemovalStrategy::NAME,
            ])
            .unwrap();
        assert_eq!(
            set.names(),
            vec![
                IdentityRemovalStrategy::NAME,
                LazyBarrierStrategy::NAME,
                InspectStrategy::NAME,
                LambdaRestrictionStrategy::NAME,
            ]
        );
    }

    #[test]
    fn resolve_unknown_name() {
        let registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        assert_eq!(
            registry.resolve(["NoSuchStrategy"]).unwrap_err(),
            StrategyError::UnknownStrategy("NoSuchStrategy".to_string())
        );
    }

    #[test]
    fn profile_names_round_trip() {
        for profile in StrategyProfile::ALL {
            assert_eq!(profile.as_str().parse::<StrategyProfile>().unwrap(), profile);
        }
        assert!("fast".parse::<StrategyProfile>().is_err());
        assert_eq!(StrategyProfile::default(), StrategyProfile::Standard);
    }

    #[test]
    fn empty_profile_resolves_to_empty_set() {
        let registry: StrategyRegistry<i32> = StrategyRegistry::with_defaults();
        assert!(registry.profile(StrategyProfile::Empty).unwrap().is_empty());
        assert_eq!(registry.profile(StrategyProfile::Strict).unwrap().len(), 4);
    }
}
