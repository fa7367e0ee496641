//! Algebraic weights carried by coefficient traversers
//!
//! A [`Coefficient`] is an element of a commutative semiring: `multiply` is
//! applied when a traverser passes through a weighted step, `sum` when two
//! equal traversers are merged. `count` projects the weight onto the number
//! of times the payload is emitted by the pull protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Commutative semiring element used as traverser multiplicity
pub trait Coefficient: Clone + fmt::Debug + PartialEq + Send + Sync + 'static {
    /// Multiplicative identity
    fn one() -> Self;

    /// Additive identity
    fn zero() -> Self;

    /// Weight representing `count` plain occurrences
    fn from_count(count: u64) -> Self;

    /// `self = self * other`
    fn multiply(&mut self, other: &Self);

    /// `self = self + other`
    fn sum(&mut self, other: &Self);

    /// Number of times the payload is emitted
    fn count(&self) -> u64;

    /// Overwrite the emission count
    fn set_count(&mut self, count: u64);

    /// Check for the additive identity
    #[inline]
    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

/// Natural-number weight; the counting semiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LongCoefficient(pub u64);

impl LongCoefficient {
    /// Wrapped value
    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl Default for LongCoefficient {
    fn default() -> Self {
        Self(1)
    }
}

impl Coefficient for LongCoefficient {
    #[inline]
    fn one() -> Self {
        Self(1)
    }

    #[inline]
    fn zero() -> Self {
        Self(0)
    }

    #[inline]
    fn from_count(count: u64) -> Self {
        Self(count)
    }

    #[inline]
    fn multiply(&mut self, other: &Self) {
        self.0 = self.0.saturating_mul(other.0);
    }

    #[inline]
    fn sum(&mut self, other: &Self) {
        self.0 = self.0.saturating_add(other.0);
    }

    #[inline]
    fn count(&self) -> u64 {
        self.0
    }

    #[inline]
    fn set_count(&mut self, count: u64) {
        self.0 = count;
    }
}

impl fmt::Display for LongCoefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative real weight (probability-like accumulation)
///
/// A real weight is not a number of occurrences: a traverser carrying any
/// non-zero real weight is emitted exactly once, and consuming it zeroes the
/// weight.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct RealCoefficient(f64);

impl RealCoefficient {
    /// Create a weight; `None` for negative or non-finite input
    #[must_use]
    pub fn new(weight: f64) -> Option<Self> {
        (weight.is_finite() && weight >= 0.0).then_some(Self(weight))
    }

    /// Wrapped value
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Coefficient for RealCoefficient {
    #[inline]
    fn one() -> Self {
        Self(1.0)
    }

    #[inline]
    fn zero() -> Self {
        Self(0.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_count(count: u64) -> Self {
        Self(count as f64)
    }

    #[inline]
    fn multiply(&mut self, other: &Self) {
        self.0 *= other.0;
    }

    #[inline]
    fn sum(&mut self, other: &Self) {
        self.0 += other.0;
    }

    #[inline]
    fn count(&self) -> u64 {
        u64::from(self.0 > 0.0)
    }

    fn set_count(&mut self, count: u64) {
        if count == 0 {
            self.0 = 0.0;
        } else if self.0 == 0.0 {
            self.0 = 1.0;
        }
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }
}

impl fmt::Display for RealCoefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
