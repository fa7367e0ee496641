//! Traversal strategy trait and the ordered strategy set
//!
//! Strategies rewrite an unlocked traversal before execution. A
//! [`TraversalStrategies`] set is immutable and shared by every traversal of
//! a tree; adding or removing a strategy produces a new set.
//!
//! Ordering is category-major ([`StrategyCategory`]), then topological within
//! a category according to each strategy's `apply_prior` / `apply_post`
//! names. Registration order breaks ties.

use crate::error::TraversalError;
use crate::traversal::Traversal;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use trav_traverser::{Coefficient, LongCoefficient, Payload};

/// Phase a strategy belongs to, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    /// Adds steps the user did not write (side effects, sacks)
    Decoration,

    /// Engine-independent rewrites
    Optimization,

    /// Storage-specific rewrites
    ProviderOptimization,

    /// Last-minute adjustments (inspection, profiling)
    Finalization,

    /// Rejects pipelines that must not run
    Verification,
}

impl fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Decoration => "decoration",
            Self::Optimization => "optimization",
            Self::ProviderOptimization => "provider_optimization",
            Self::Finalization => "finalization",
            Self::Verification => "verification",
        };
        f.write_str(name)
    }
}

/// A traversal rewrite
///
/// `apply` is invoked once per traversal in the tree (root first, then
/// nested, pre-order) and must leave an already-rewritten traversal
/// unchanged when applied again.
pub trait TraversalStrategy<T: Payload, C: Coefficient = LongCoefficient>:
    Send + Sync + fmt::Debug
{
    /// Rewrite `traversal` in place
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::Verification`] to reject the pipeline, or
    /// any error raised while mutating it.
    fn apply(&self, traversal: &mut Traversal<T, C>) -> Result<(), TraversalError>;

    /// Unique strategy name
    fn name(&self) -> &'static str;

    /// Phase of this strategy
    fn category(&self) -> StrategyCategory;

    /// Strategies that must run before this one
    fn apply_prior(&self) -> &'static [&'static str] {
        &[]
    }

    /// Strategies that must run after this one
    fn apply_post(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Shared strategy handle
pub type StrategyHandle<T, C = LongCoefficient> = Arc<dyn TraversalStrategy<T, C>>;

/// Immutable ordered strategy set
pub struct TraversalStrategies<T: Payload, C: Coefficient = LongCoefficient> {
    strategies: Arc<Vec<StrategyHandle<T, C>>>,
}

impl<T: Payload, C: Coefficient> Clone for TraversalStrategies<T, C> {
    fn clone(&self) -> Self {
        Self {
            strategies: Arc::clone(&self.strategies),
        }
    }
}

impl<T: Payload, C: Coefficient> Default for TraversalStrategies<T, C> {
    fn default() -> Self {
        Self {
            strategies: Arc::new(Vec::new()),
        }
    }
}

impl<T: Payload, C: Coefficient> TraversalStrategies<T, C> {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a sorted set from handles
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::StrategyOrder`] when the ordering
    /// constraints cannot be satisfied.
    pub fn from_strategies<I>(strategies: I) -> Result<Self, TraversalError>
    where
        I: IntoIterator<Item = StrategyHandle<T, C>>,
    {
        Self::new().add_strategies(strategies)
    }

    /// New set with `strategy` added, replacing a same-named one
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::StrategyOrder`] when the ordering
    /// constraints cannot be satisfied.
    pub fn add_strategy<S>(&self, strategy: S) -> Result<Self, TraversalError>
    where
        S: TraversalStrategy<T, C> + 'static,
    {
        self.add_strategies(std::iter::once(Arc::new(strategy) as StrategyHandle<T, C>))
    }

    /// New set with every handle added, replacing same-named ones
    ///
    /// # Errors
    ///
    /// Returns [`TraversalError::StrategyOrder`] when the ordering
    /// constraints cannot be satisfied.
    pub fn add_strategies<I>(&self, strategies: I) -> Result<Self, TraversalError>
    where
        I: IntoIterator<Item = StrategyHandle<T, C>>,
    {
        let mut list: Vec<StrategyHandle<T, C>> = self.strategies.as_ref().clone();
        for strategy in strategies {
            list.retain(|existing| existing.name() != strategy.name());
            list.push(strategy);
        }
        Ok(Self {
            strategies: Arc::new(sort(list)?),
        })
    }

    /// New set without the named strategy
    #[must_use]
    pub fn remove_strategy(&self, name: &str) -> Self {
        let list: Vec<StrategyHandle<T, C>> = self
            .strategies
            .iter()
            .filter(|s| s.name() != name)
            .cloned()
            .collect();
        Self {
            strategies: Arc::new(list),
        }
    }

    /// Check for a strategy by name
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.strategies.iter().any(|s| s.name() == name)
    }

    /// Strategy by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&StrategyHandle<T, C>> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    /// Names in application order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Strategies in application order
    pub fn iter(&self) -> impl Iterator<Item = &StrategyHandle<T, C>> {
        self.strategies.iter()
    }

    /// Number of strategies
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Check for an empty set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Check whether both handles share the same underlying sequence
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.strategies, &other.strategies)
    }
}

impl<T: Payload, C: Coefficient> fmt::Debug for TraversalStrategies<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Sort category-major, then topologically inside each category
fn sort<T: Payload, C: Coefficient>(
    list: Vec<StrategyHandle<T, C>>,
) -> Result<Vec<StrategyHandle<T, C>>, TraversalError> {
    let categories: HashMap<&'static str, StrategyCategory> =
        list.iter().map(|s| (s.name(), s.category())).collect();

    for strategy in &list {
        for prior in strategy.apply_prior() {
            if categories.get(prior).is_some_and(|c| *c > strategy.category()) {
                return Err(TraversalError::StrategyOrder(format!(
                    "{} must run after {prior}, which belongs to a later category",
                    strategy.name()
                )));
            }
        }
        for post in strategy.apply_post() {
            if categories.get(post).is_some_and(|c| *c < strategy.category()) {
                return Err(TraversalError::StrategyOrder(format!(
                    "{} must run before {post}, which belongs to an earlier category",
                    strategy.name()
                )));
            }
        }
    }

    let mut groups: Vec<(StrategyCategory, Vec<StrategyHandle<T, C>>)> = Vec::new();
    for strategy in list {
        match groups.iter_mut().find(|(c, _)| *c == strategy.category()) {
            Some((_, group)) => group.push(strategy),
            None => groups.push((strategy.category(), vec![strategy])),
        }
    }
    groups.sort_by_key(|(category, _)| *category);

    let mut sorted = Vec::new();
    for (_, group) in groups {
        sorted.extend(toposort_group(group)?);
    }
    Ok(sorted)
}

/// Order one category, registration order breaking ties
fn toposort_group<T: Payload, C: Coefficient>(
    group: Vec<StrategyHandle<T, C>>,
) -> Result<Vec<StrategyHandle<T, C>>, TraversalError> {
    let index: HashMap<&'static str, usize> = group
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name(), i))
        .collect();

    let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for (i, strategy) in group.iter().enumerate() {
        graph.add_node(i);
        for prior in strategy.apply_prior() {
            if let Some(&p) = index.get(prior) {
                graph.add_edge(p, i, ());
            }
        }
        for post in strategy.apply_post() {
            if let Some(&q) = index.get(post) {
                graph.add_edge(i, q, ());
            }
        }
    }

    if petgraph::algo::is_cyclic_directed(&graph) {
        let names: Vec<&str> = group.iter().map(|s| s.name()).collect();
        return Err(TraversalError::StrategyOrder(format!(
            "cyclic prior/post constraints among [{}]",
            names.join(", ")
        )));
    }

    let mut in_degree: Vec<usize> = (0..group.len())
        .map(|i| graph.neighbors_directed(i, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = (0..group.len()).filter(|i| in_degree[*i] == 0).collect();
    let mut order = Vec::with_capacity(group.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for successor in graph.neighbors_directed(next, Direction::Outgoing) {
            in_degree[successor] -= 1;
            if in_degree[successor] == 0 {
                ready.insert(successor);
            }
        }
    }

    let mut slots: Vec<Option<StrategyHandle<T, C>>> = group.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|i| slots.get_mut(i).and_then(Option::take))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Named {
        name: &'static str,
        category: StrategyCategory,
        prior: &'static [&'static str],
        post: &'static [&'static str],
    }

    impl TraversalStrategy<i32> for Named {
        fn apply(&self, _traversal: &mut Traversal<i32>) -> Result<(), TraversalError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn category(&self) -> StrategyCategory {
            self.category
        }

        fn apply_prior(&self) -> &'static [&'static str] {
            self.prior
        }

        fn apply_post(&self) -> &'static [&'static str] {
            self.post
        }
    }

    fn named(name: &'static str, category: StrategyCategory) -> Named {
        Named {
            name,
            category,
            prior: &[],
            post: &[],
        }
    }

    #[test]
    fn sorted_by_category() {
        let set = TraversalStrategies::<i32>::new()
            .add_strategy(named("v", StrategyCategory::Verification))
            .unwrap()
            .add_strategy(named("d", StrategyCategory::Decoration))
            .unwrap()
            .add_strategy(named("o", StrategyCategory::Optimization))
            .unwrap();
        assert_eq!(set.names(), vec!["d", "o", "v"]);
    }

    #[test]
    fn prior_reorders_within_category() {
        let set = TraversalStrategies::<i32>::new()
            .add_strategy(Named {
                name: "b",
                category: StrategyCategory::Optimization,
                prior: &["a"],
                post: &[],
            })
            .unwrap()
            .add_strategy(named("a", StrategyCategory::Optimization))
            .unwrap();
        assert_eq!(set.names(), vec!["a", "b"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let result = TraversalStrategies::<i32>::new()
            .add_strategy(Named {
                name: "a",
                category: StrategyCategory::Optimization,
                prior: &["b"],
                post: &[],
            })
            .unwrap()
            .add_strategy(Named {
                name: "b",
                category: StrategyCategory::Optimization,
                prior: &["a"],
                post: &[],
            });
        assert!(matches!(result, Err(TraversalError::StrategyOrder(_))));
    }

    #[test]
    fn cross_category_violation_is_rejected() {
        let result = TraversalStrategies::<i32>::new()
            .add_strategy(named("late", StrategyCategory::Finalization))
            .unwrap()
            .add_strategy(Named {
                name: "early",
                category: StrategyCategory::Decoration,
                prior: &["late"],
                post: &[],
            });
        assert!(matches!(result, Err(TraversalError::StrategyOrder(_))));
    }

    #[test]
    fn same_name_replaces() {
        let set = TraversalStrategies::<i32>::new()
            .add_strategy(named("x", StrategyCategory::Decoration))
            .unwrap()
            .add_strategy(named("x", StrategyCategory::Verification))
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("x").unwrap().category(), StrategyCategory::Verification);
    }

    #[test]
    fn remove_leaves_original_untouched() {
        let set = TraversalStrategies::<i32>::new()
            .add_strategy(named("x", StrategyCategory::Decoration))
            .unwrap();
        let removed = set.remove_strategy("x");
        assert!(set.contains("x"));
        assert!(!removed.contains("x"));
        assert!(removed.is_empty());
    }
}
