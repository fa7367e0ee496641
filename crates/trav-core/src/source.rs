//! Traversal source
//!
//! Spawns root traversals that share one strategy set, one graph handle and
//! one decoration. Each spawned traversal has its own side-effect store.

use crate::config::EngineConfig;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use trav_process::step::InjectStep;
use trav_process::{
    Coefficient, GraphHandle, LongCoefficient, Payload, Traversal, TraversalStrategies,
    TraversalStrategy,
};
use trav_strategy::{InspectStrategy, LazyBarrierStrategy, SideEffectStrategy, StrategyRegistry};

/// Factory for root traversals
#[derive(Debug, Clone)]
pub struct TraversalSource<T: Payload, C: Coefficient = LongCoefficient> {
    strategies: TraversalStrategies<T, C>,
    graph: Option<GraphHandle>,
    decoration: SideEffectStrategy,
    parallelism: Option<usize>,
}

impl<T: Payload, C: Coefficient> Default for TraversalSource<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Payload, C: Coefficient> TraversalSource<T, C> {
    /// Source without strategies
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: TraversalStrategies::new(),
            graph: None,
            decoration: SideEffectStrategy::new(),
            parallelism: None,
        }
    }

    /// Source configured from `config`
    ///
    /// The profile's strategies come first, then the extra names, then the
    /// inspection strategy when enabled. The set is sorted by category, so
    /// the listing order only matters for replacement.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid `config` and a strategy
    /// error when the selection cannot be ordered.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut registry: StrategyRegistry<T, C> = StrategyRegistry::with_defaults();
        registry.register(LazyBarrierStrategy::new(config.barrier_size));

        let mut names: Vec<&str> = config.profile.strategy_names().to_vec();
        names.extend(config.strategies.iter().map(String::as_str));
        if config.inspect_traversers {
            names.push(InspectStrategy::NAME);
        }
        let strategies = registry.resolve(names)?;

        let mut decoration = SideEffectStrategy::new();
        for (key, value) in &config.side_effects {
            decoration = decoration.with_side_effect(key.clone(), value.clone());
        }
        if let Some(sack) = &config.sack {
            decoration = decoration.with_sack(sack.clone());
        }

        debug!(
            profile = %config.profile,
            strategies = ?strategies.names(),
            "traversal source configured"
        );
        Ok(Self {
            strategies,
            graph: None,
            decoration,
            parallelism: config.parallelism,
        })
    }

    /// With an added strategy, replacing a same-named one
    ///
    /// # Errors
    ///
    /// Returns a traversal error when the set cannot be ordered.
    pub fn with_strategy<S>(mut self, strategy: S) -> Result<Self>
    where
        S: TraversalStrategy<T, C> + 'static,
    {
        self.strategies = self.strategies.add_strategy(strategy)?;
        Ok(self)
    }

    /// Without the named strategy
    #[must_use]
    pub fn without_strategy(mut self, name: &str) -> Self {
        self.strategies = self.strategies.remove_strategy(name);
        self
    }

    /// With a side-effect key seeded in every spawned traversal
    #[must_use]
    pub fn with_side_effect(mut self, key: impl Into<String>, value: Value) -> Self {
        self.decoration = self.decoration.with_side_effect(key, value);
        self
    }

    /// With a sack initial value for every spawned traversal
    #[must_use]
    pub fn with_sack(mut self, value: Value) -> Self {
        self.decoration = self.decoration.with_sack(value);
        self
    }

    /// With a graph handle pushed into every spawned traversal
    #[must_use]
    pub fn with_graph(mut self, graph: GraphHandle) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Shared strategy set, without the decoration
    #[inline]
    #[must_use]
    pub fn strategies(&self) -> &TraversalStrategies<T, C> {
        &self.strategies
    }

    /// Worker thread count from configuration
    #[inline]
    #[must_use]
    pub fn parallelism(&self) -> Option<usize> {
        self.parallelism
    }

    /// Empty root traversal
    ///
    /// # Errors
    ///
    /// Returns a traversal error when the decoration cannot be ordered
    /// into the strategy set.
    pub fn traversal(&self) -> Result<Traversal<T, C>> {
        let strategies = if self.decoration.is_empty() {
            self.strategies.clone()
        } else {
            self.strategies.add_strategy(self.decoration.clone())?
        };
        let traversal = Traversal::new().with_strategies(strategies);
        Ok(match &self.graph {
            Some(graph) => traversal.with_graph(graph.clone()),
            None => traversal,
        })
    }

    /// Root traversal starting with `values`
    ///
    /// # Errors
    ///
    /// Same as [`TraversalSource::traversal`].
    pub fn inject<I>(&self, values: I) -> Result<Traversal<T, C>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut traversal = self.traversal()?;
        traversal.add_step(InjectStep::new(values))?;
        Ok(traversal)
    }
}
