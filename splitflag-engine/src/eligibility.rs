//! Cohort eligibility — evaluators and the per-player state machine.
//!
//! Eligibility for a player moves `Uninitialized -> Pending -> Settled` and
//! never leaves `Settled` for the rest of the session: settling freezes the
//! per-key map, and later triggers return the frozen map without re-running
//! anything. Only a still-`Pending` player re-attempts evaluation.
//!
//! A single evaluation pass is all-or-nothing: one `Pending` answer — from a
//! store read or from an evaluator — discards every per-key result computed
//! in that pass and leaves the player `Pending`.

use crate::error::{EngineError, EngineResult};
use crate::registry::KeyRegistry;
use splitflag_types::{structural_eq, ConfigValue, EligibilitySpec, KeyScope, PlayerId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Answer from a single evaluator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    /// The evaluator cannot answer yet (external data still loading).
    Pending,
}

/// Decides whether a player belongs to an experiment's cohort.
///
/// Registered per `EligibilitySpec::kind`; the spec's `params` are opaque to
/// the engine and interpreted by the evaluator alone. Implementations must
/// be cheap and non-blocking — anything slow belongs behind `Pending`.
pub trait EligibilityEvaluator: Send + Sync {
    fn evaluate(&self, player: PlayerId, spec: &EligibilitySpec) -> EligibilityStatus;
}

/// Per-player eligibility state. Settling is one-way for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EligibilityState {
    /// No evaluation attempted yet.
    Uninitialized,
    /// Last attempt could not complete; retried on the next trigger.
    Pending,
    /// Frozen per-key cohort map for the rest of the session.
    Settled(BTreeMap<String, bool>),
}

impl EligibilityState {
    /// Whether the state is frozen.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled(_))
    }

    /// The frozen cohort map, if settled.
    pub fn settled(&self) -> Option<&BTreeMap<String, bool>> {
        match self {
            Self::Settled(map) => Some(map),
            _ => None,
        }
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EvalOutcome {
    Settled(BTreeMap<String, bool>),
    /// Some input was missing; nothing from this pass is kept.
    Pending,
}

/// Persisted cohort data read from the store before a pass.
pub(crate) struct StoredCohorts<'a> {
    pub eligibility: &'a HashMap<String, bool>,
    pub enrolled_values: &'a HashMap<String, ConfigValue>,
}

/// Runs one eligibility pass over every player-scoped key.
///
/// `stored` is `None` when no persistence collaborator is configured (the
/// caller maps "store configured but not yet loaded" to `EvalOutcome::Pending`
/// before ever getting here). `control_values` must hold the current control
/// value for every player-scoped key.
pub(crate) fn evaluate_pass(
    registry: &KeyRegistry,
    evaluators: &HashMap<String, Arc<dyn EligibilityEvaluator>>,
    player: PlayerId,
    stored: Option<StoredCohorts<'_>>,
    control_values: &HashMap<String, ConfigValue>,
) -> EngineResult<EvalOutcome> {
    let mut eligible = BTreeMap::new();

    for definition in registry.all().values() {
        if definition.scope != KeyScope::Player {
            continue;
        }
        let name = definition.name.as_str();

        let Some(spec) = &definition.eligibility else {
            // Keys without an experiment are served to everyone.
            eligible.insert(name.to_string(), true);
            continue;
        };

        if let Some(cohorts) = &stored {
            let previously_enrolled = cohorts.eligibility.get(name).copied().unwrap_or(false);
            if previously_enrolled {
                if let Some(stored_value) = cohorts.enrolled_values.get(name) {
                    let control = control_values
                        .get(name)
                        .ok_or_else(|| EngineError::UnknownKey(name.to_string()))?;
                    if !structural_eq(stored_value, control) {
                        // The control value has not caught up with the stored
                        // treatment: the experiment is still live, keep the
                        // player enrolled without consulting the evaluator.
                        debug!(key = name, %player, "still enrolled, treatment differs from control");
                        eligible.insert(name.to_string(), true);
                        continue;
                    }
                    // Control now equals the stored treatment: the experiment
                    // ended or was rolled back. Fall through and re-ask.
                    debug!(key = name, %player, "stored treatment matches control, re-evaluating");
                }
            }

            match run_evaluator(evaluators, player, spec)? {
                EligibilityStatus::Pending => return Ok(EvalOutcome::Pending),
                status => {
                    eligible.insert(name.to_string(), status == EligibilityStatus::Eligible);
                }
            }
        } else {
            // No store: there is no retry state worth holding the session in,
            // so a pending evaluator counts as ineligible for this session.
            let status = run_evaluator(evaluators, player, spec)?;
            eligible.insert(name.to_string(), status == EligibilityStatus::Eligible);
        }
    }

    Ok(EvalOutcome::Settled(eligible))
}

fn run_evaluator(
    evaluators: &HashMap<String, Arc<dyn EligibilityEvaluator>>,
    player: PlayerId,
    spec: &EligibilitySpec,
) -> EngineResult<EligibilityStatus> {
    let evaluator = evaluators
        .get(&spec.kind)
        .ok_or_else(|| EngineError::UnknownEligibilityKind(spec.kind.clone()))?;
    Ok(evaluator.evaluate(player, spec))
}
