//! Traverser capability flags

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Capability a step needs its traversers to carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraverserRequirement {
    /// Integer bulk is meaningful
    Bulk,

    /// Every traverser carries bulk one
    OneBulk,

    /// Weighted (coefficient) traversers
    Coefficient,

    /// Path with step labels
    LabeledPath,

    /// Full path history
    Path,

    /// Loop counters for nested repeats
    NestedLoop,

    /// Loop counter for a single repeat
    SingleLoop,

    /// The payload itself
    Object,

    /// Access to the side-effect store
    SideEffects,

    /// Per-traverser sack value
    Sack,
}

impl TraverserRequirement {
    /// Every requirement, in declaration order
    pub const ALL: [Self; 10] = [
        Self::Bulk,
        Self::OneBulk,
        Self::Coefficient,
        Self::LabeledPath,
        Self::Path,
        Self::NestedLoop,
        Self::SingleLoop,
        Self::Object,
        Self::SideEffects,
        Self::Sack,
    ];

    /// Stable snake-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::OneBulk => "one_bulk",
            Self::Coefficient => "coefficient",
            Self::LabeledPath => "labeled_path",
            Self::Path => "path",
            Self::NestedLoop => "nested_loop",
            Self::SingleLoop => "single_loop",
            Self::Object => "object",
            Self::SideEffects => "side_effects",
            Self::Sack => "sack",
        }
    }

    /// Check whether this requirement needs path history
    #[inline]
    #[must_use]
    pub const fn needs_path(self) -> bool {
        matches!(self, Self::Path | Self::LabeledPath)
    }
}

impl fmt::Display for TraverserRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of requirements
pub type RequirementSet = BTreeSet<TraverserRequirement>;

/// Apply the set-level rules: `OneBulk` cancels `Bulk`
pub fn normalize(requirements: &mut RequirementSet) {
    if requirements.contains(&TraverserRequirement::OneBulk) {
        requirements.remove(&TraverserRequirement::Bulk);
    }
}

/// Check whether any requirement in the set needs path history
#[must_use]
pub fn requires_path(requirements: &RequirementSet) -> bool {
    requirements.iter().any(|r| r.needs_path())
}
