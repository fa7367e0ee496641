use super::Traversal;
use crate::error::Result;
use crate::strategy::StrategyCategory;
use std::fmt;
use trav_traverser::{Coefficient, Payload};

/// Pipeline rendering after one strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationRow {
    /// Strategy name
    pub strategy: String,
    /// Strategy category
    pub category: StrategyCategory,
    /// Rendered pipeline after the strategy ran
    pub traversal: String,
}

/// Step-by-step record of strategy application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalExplanation {
    original: String,
    rows: Vec<ExplanationRow>,
}

impl TraversalExplanation {
    /// Pipeline before any strategy
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// One row per strategy, in application order
    #[must_use]
    pub fn rows(&self) -> &[ExplanationRow] {
        &self.rows
    }

    /// Pipeline after every strategy
    #[must_use]
    pub fn final_traversal(&self) -> &str {
        self.rows
            .last()
            .map_or(self.original.as_str(), |row| row.traversal.as_str())
    }
}

fn category_code(category: StrategyCategory) -> char {
    match category {
        StrategyCategory::Decoration => 'D',
        StrategyCategory::Optimization => 'O',
        StrategyCategory::ProviderOptimization => 'P',
        StrategyCategory::Finalization => 'F',
        StrategyCategory::Verification => 'V',
    }
}

impl fmt::Display for TraversalExplanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ORIGINAL: &str = "Original Traversal";
        const FINAL: &str = "Final Traversal";

        let width = self
            .rows
            .iter()
            .map(|row| row.strategy.len() + 4)
            .chain([ORIGINAL.len(), FINAL.len()])
            .max()
            .unwrap_or(0);

        writeln!(f, "Traversal Explanation")?;
        writeln!(f, "{}", "=".repeat(width + 1 + self.original.len()))?;
        writeln!(f, "{ORIGINAL:<width$} {}", self.original)?;
        writeln!(f)?;
        for row in &self.rows {
            let label = format!("{} [{}]", row.strategy, category_code(row.category));
            writeln!(f, "{label:<width$} {}", row.traversal)?;
        }
        writeln!(f)?;
        write!(f, "{FINAL:<width$} {}", self.final_traversal())
    }
}

impl<T: Payload, C: Coefficient> Traversal<T, C> {
    /// Record how each strategy rewrites this traversal
    ///
    /// Works on an unlocked copy; the traversal itself is left untouched.
    ///
    /// # Errors
    ///
    /// Returns a clone failure or the first strategy error.
    pub fn explain(&self) -> Result<TraversalExplanation> {
        let mut copy = self.try_clone()?;
        copy.unlock_tree();
        let original = copy.to_string();

        let graph = copy.graph.clone();
        let strategies = copy.strategies.clone();
        let side_effects = copy.side_effects.clone();
        copy.push_context(graph.as_ref(), &strategies, &side_effects);

        let mut rows = Vec::with_capacity(strategies.len());
        for strategy in strategies.iter() {
            copy.apply_recursively(&mut |traversal: &mut Self| strategy.apply(traversal))?;
            rows.push(ExplanationRow {
                strategy: strategy.name().to_string(),
                category: strategy.category(),
                traversal: copy.to_string(),
            });
        }

        Ok(TraversalExplanation { original, rows })
    }

    fn unlock_tree(&mut self) {
        self.locked = false;
        for slot in &mut self.slots {
            for child in slot.step.children_mut() {
                child.unlock_tree();
            }
        }
    }
}
