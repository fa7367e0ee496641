//! Engine configuration
//!
//! Loaded from TOML. Every field has a default, so an empty document is a
//! valid configuration.
//!
//! ```toml
//! profile = "strict"
//! strategies = ["InspectStrategy"]
//! barrier_size = 512
//! parallelism = 4
//! sack = 1.0
//!
//! [side_effects]
//! visited = 0
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use trav_process::step::DEFAULT_BARRIER_SIZE;
use trav_strategy::{StrategyProfile, BUILTIN_STRATEGIES};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base strategy selection
    pub profile: StrategyProfile,
    /// Strategies added on top of the profile
    pub strategies: Vec<String>,
    /// Capacity of barriers inserted by the lazy barrier rewrite
    pub barrier_size: usize,
    /// Report every result traverser as a trace event
    pub inspect_traversers: bool,
    /// Worker threads for partitioned execution, `None` for the global pool
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelism: Option<usize>,
    /// Initial sack value of every traverser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sack: Option<Value>,
    /// Side-effect keys seeded before iteration
    pub side_effects: BTreeMap<String, Value>,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With strategy profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: StrategyProfile) -> Self {
        self.profile = profile;
        self
    }

    /// With an extra strategy by name
    #[must_use]
    pub fn with_strategy(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.strategies.contains(&name) {
            self.strategies.push(name);
        }
        self
    }

    /// With barrier size
    #[inline]
    #[must_use]
    pub fn with_barrier_size(mut self, size: usize) -> Self {
        self.barrier_size = size;
        self
    }

    /// With traverser inspection
    #[inline]
    #[must_use]
    pub fn with_inspection(mut self, enabled: bool) -> Self {
        self.inspect_traversers = enabled;
        self
    }

    /// With worker thread count
    #[inline]
    #[must_use]
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// With sack initial value
    #[must_use]
    pub fn with_sack(mut self, value: Value) -> Self {
        self.sack = Some(value);
        self
    }

    /// With a seeded side-effect key
    #[must_use]
    pub fn with_side_effect(mut self, key: impl Into<String>, value: Value) -> Self {
        self.side_effects.insert(key.into(), value);
        self
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and the errors of
    /// [`EngineConfig::validate`] otherwise.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] when a JSON value has no TOML
    /// form, such as `null`.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Check value ranges and strategy names
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero barrier size or thread
    /// count, and [`ConfigError::UnknownStrategy`] for a name that is not a
    /// built-in strategy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.barrier_size == 0 {
            return Err(ConfigError::Invalid("barrier_size must be positive".into()));
        }
        if self.parallelism == Some(0) {
            return Err(ConfigError::Invalid("parallelism must be positive".into()));
        }
        if let Some(unknown) = self
            .strategies
            .iter()
            .find(|name| !BUILTIN_STRATEGIES.contains(&name.as_str()))
        {
            return Err(ConfigError::UnknownStrategy(unknown.clone()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: StrategyProfile::default(),
            strategies: Vec::new(),
            barrier_size: DEFAULT_BARRIER_SIZE,
            inspect_traversers: false,
            parallelism: None,
            sack: None,
            side_effects: BTreeMap::new(),
        }
    }
}
