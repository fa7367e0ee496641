use super::{Starts, Step, StepBase};
use crate::error::{StreamExhausted, TraversalError};
use crate::side_effects::SideEffects;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};
use trav_traverser::{
    Coefficient, Payload, RequirementSet, Traverse, Traverser, TraverserRequirement,
};

/// Most copies one traverser appends to an aggregate
pub const MAX_AGGREGATE_REPEAT: usize = 65_536;

type Encoder<T> = Arc<dyn Fn(&T) -> serde_json::Result<Value> + Send + Sync>;

#[derive(Clone)]
enum SideEffectKind<T> {
    Counter,
    Aggregate(Encoder<T>),
}

/// Writes into the shared side-effect store and passes traversers through
#[derive(Clone)]
pub struct SideEffectStep<T> {
    base: StepBase,
    key: String,
    kind: SideEffectKind<T>,
}

impl<T: Payload> SideEffectStep<T> {
    /// Add each traverser's multiplicity to the number under `key`
    pub fn counter(key: impl Into<String>) -> Self {
        Self {
            base: StepBase::new(),
            key: key.into(),
            kind: SideEffectKind::Counter,
        }
    }

    /// Append each payload, once per multiplicity, to the array under `key`
    pub fn aggregate(key: impl Into<String>) -> Self
    where
        T: Serialize,
    {
        Self {
            base: StepBase::new(),
            key: key.into(),
            kind: SideEffectKind::Aggregate(Arc::new(|value: &T| serde_json::to_value(value))),
        }
    }

    /// Store key written by this step
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    fn record(&self, side_effects: &SideEffects, traverser: &Traverser<T, impl Coefficient>) {
        let multiplicity = traverser.multiplicity();
        let updated = match &self.kind {
            SideEffectKind::Counter => side_effects.update(&self.key, |value| {
                let current = value.as_u64().unwrap_or(0);
                *value = Value::from(current.saturating_add(multiplicity));
            }),
            SideEffectKind::Aggregate(encode) => match encode(traverser.get()) {
                Ok(encoded) => side_effects.update(&self.key, |value| {
                    if let Value::Array(items) = value {
                        let repeat = match usize::try_from(multiplicity) {
                            Ok(n) if n <= MAX_AGGREGATE_REPEAT => n,
                            _ => {
                                warn!(key = %self.key, multiplicity, "aggregate repeat capped");
                                MAX_AGGREGATE_REPEAT
                            }
                        };
                        items.extend(std::iter::repeat(encoded).take(repeat));
                    } else {
                        warn!(key = %self.key, "side-effect value is not an array, skipping");
                    }
                }),
                Err(err) => {
                    warn!(key = %self.key, error = %err, "payload could not be serialized");
                    true
                }
            },
        };
        if !updated {
            warn!(key = %self.key, "side-effect key not registered");
        }
    }
}

impl<T> fmt::Debug for SideEffectStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            SideEffectKind::Counter => "counter",
            SideEffectKind::Aggregate(_) => "aggregate",
        };
        f.debug_struct("SideEffectStep")
            .field("base", &self.base)
            .field("key", &self.key)
            .field("kind", &kind)
            .finish()
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for SideEffectStep<T> {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "SideEffectStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        let traverser = starts.next_start()?;
        self.record(starts.context().side_effects(), &traverser);
        Ok(traverser)
    }

    fn requirements(&self) -> RequirementSet {
        std::iter::once(TraverserRequirement::SideEffects).collect()
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }

    fn register_side_effects(&self, side_effects: &SideEffects) {
        side_effects.register_if_absent(&self.key, || match self.kind {
            SideEffectKind::Counter => Value::from(0_u64),
            SideEffectKind::Aggregate(_) => Value::Array(Vec::new()),
        });
    }

    fn params(&self) -> String {
        self.key.clone()
    }
}

/// Emits a `tracing` event for every traverser passing through
#[derive(Debug, Clone, Default)]
pub struct InspectStep {
    base: StepBase,
}

impl InspectStep {
    /// Create the step
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base: StepBase::new(),
        }
    }
}

impl<T: Payload, C: Coefficient> Step<T, C> for InspectStep {
    fn base(&self) -> &StepBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut StepBase {
        &mut self.base
    }

    fn name(&self) -> &'static str {
        "InspectStep"
    }

    fn process_next(
        &mut self,
        starts: &mut Starts<'_, T, C>,
    ) -> Result<Traverser<T, C>, StreamExhausted> {
        let traverser = starts.next_start()?;
        trace!(
            step = %self.base.id(),
            payload = ?traverser.get(),
            multiplicity = traverser.multiplicity(),
            "traverser"
        );
        Ok(traverser)
    }

    fn clone_step(&self) -> Result<Box<dyn Step<T, C>>, TraversalError> {
        Ok(Box::new(self.clone()))
    }
}
