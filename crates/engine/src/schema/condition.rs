//! Metric conditions and the ALL/ANY combination logic.

use adpilot_core::MetricId;
use serde::{Deserialize, Serialize};

/// A single metric comparison, e.g. `spend >= 100000`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    pub metric: MetricId,
    pub op: ConditionOp,
    pub value: f64,
}

/// Comparison operators for conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

/// How a rule combines its condition list.
///
/// `All` over an empty list is vacuously true; `Any` over an empty list is
/// false (no condition can be "any" true). The evaluator tests pin this
/// asymmetry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionLogic {
    All,
    Any,
}

impl Default for ConditionLogic {
    fn default() -> Self {
        ConditionLogic::All
    }
}
