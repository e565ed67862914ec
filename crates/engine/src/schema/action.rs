//! Governance actions and the action-kind tag used by override blocking.

use serde::{Deserialize, Serialize};

/// A governance action requested by a matching basic rule.
///
/// YAML representation is internally tagged:
///
/// ```yaml
/// action:
///   type: turn_off
///   revert:
///     enabled: true
///     at: "07:00"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Pause delivery, optionally re-enabling at a local wall-clock time.
    TurnOff {
        #[serde(default)]
        revert: Option<RevertSpec>,
    },
    /// Raise the budget by a percentage of its current value.
    IncreaseBudget { percent: f64 },
    /// Lower the budget by a percentage of its current value.
    DecreaseBudget { percent: f64 },
}

impl Action {
    /// The parameter-free tag of this action, used for override blocking
    /// and revert idempotency keys.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::TurnOff { .. } => ActionKind::TurnOff,
            Action::IncreaseBudget { .. } => ActionKind::IncreaseBudget,
            Action::DecreaseBudget { .. } => ActionKind::DecreaseBudget,
        }
    }

    /// Revert spec, when this is a TurnOff carrying one.
    pub fn revert_spec(&self) -> Option<&RevertSpec> {
        match self {
            Action::TurnOff { revert } => revert.as_ref(),
            _ => None,
        }
    }
}

/// The category of an action, independent of parameters.
///
/// Overrides block by kind: an override blocking `increase_budget` blocks
/// a 10% raise and a 50% raise alike.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    TurnOff,
    IncreaseBudget,
    DecreaseBudget,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::TurnOff => "turn_off",
            ActionKind::IncreaseBudget => "increase_budget",
            ActionKind::DecreaseBudget => "decrease_budget",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-deferred reversal of a TurnOff.
///
/// `at` is a "HH:MM" wall-clock string in the entity's local time zone;
/// validated at load time, parsed again at schedule time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RevertSpec {
    #[serde(default = "super::metadata::default_true")]
    pub enabled: bool,
    pub at: String,
}
