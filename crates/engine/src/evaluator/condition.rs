//! Pure condition evaluation against a metric snapshot.

use adpilot_core::MetricSnapshot;

use crate::schema::{Condition, ConditionLogic, ConditionOp};

/// Evaluate one condition against a snapshot.
///
/// A metric absent from the snapshot makes the condition false (fail
/// closed: an unmeasurable condition cannot trigger an action). NaN on
/// either side compares false under every operator, which IEEE-754 gives
/// us for free except `neq`, handled explicitly.
pub fn evaluate(condition: &Condition, snapshot: &MetricSnapshot) -> bool {
    let Some(actual) = snapshot.get(condition.metric) else {
        return false;
    };
    if actual.is_nan() || condition.value.is_nan() {
        return false;
    }
    let expected = condition.value;
    match condition.op {
        ConditionOp::Gt => actual > expected,
        ConditionOp::Gte => actual >= expected,
        ConditionOp::Lt => actual < expected,
        ConditionOp::Lte => actual <= expected,
        ConditionOp::Eq => actual == expected,
        ConditionOp::Neq => actual != expected,
    }
}

/// Evaluate a condition list under the given logic.
///
/// `All` over an empty list is vacuously true; `Any` over an empty list is
/// false.
pub fn matches(conditions: &[Condition], logic: ConditionLogic, snapshot: &MetricSnapshot) -> bool {
    match logic {
        ConditionLogic::All => conditions.iter().all(|c| evaluate(c, snapshot)),
        ConditionLogic::Any => conditions.iter().any(|c| evaluate(c, snapshot)),
    }
}

#[cfg(test)]
mod tests {
    use adpilot_core::{MetricId, TimeRange};

    use super::*;

    fn snap() -> MetricSnapshot {
        MetricSnapshot::new("c1", TimeRange::Today)
            .with_value(MetricId::Spend, 150_000.0)
            .with_value(MetricId::Ctr, 1.2)
    }

    fn cond(metric: MetricId, op: ConditionOp, value: f64) -> Condition {
        Condition { metric, op, value }
    }

    #[test]
    fn operators_compare_numerically() {
        let s = snap();
        assert!(evaluate(&cond(MetricId::Spend, ConditionOp::Gt, 100_000.0), &s));
        assert!(evaluate(&cond(MetricId::Spend, ConditionOp::Gte, 150_000.0), &s));
        assert!(!evaluate(&cond(MetricId::Spend, ConditionOp::Lt, 150_000.0), &s));
        assert!(evaluate(&cond(MetricId::Spend, ConditionOp::Lte, 150_000.0), &s));
        assert!(evaluate(&cond(MetricId::Ctr, ConditionOp::Eq, 1.2), &s));
        assert!(evaluate(&cond(MetricId::Ctr, ConditionOp::Neq, 2.0), &s));
    }

    #[test]
    fn missing_metric_is_false_for_every_operator() {
        let s = snap();
        for op in [
            ConditionOp::Gt,
            ConditionOp::Gte,
            ConditionOp::Lt,
            ConditionOp::Lte,
            ConditionOp::Eq,
            ConditionOp::Neq,
        ] {
            assert!(!evaluate(&cond(MetricId::Reach, op, 0.0), &s));
        }
    }

    #[test]
    fn nan_compares_false_even_for_neq() {
        let s = snap().with_value(MetricId::Frequency, f64::NAN);
        assert!(!evaluate(&cond(MetricId::Frequency, ConditionOp::Neq, 1.0), &s));
        assert!(!evaluate(&cond(MetricId::Spend, ConditionOp::Neq, f64::NAN), &s));
        assert!(!evaluate(&cond(MetricId::Spend, ConditionOp::Gt, f64::NAN), &s));
    }

    #[test]
    fn empty_conditions_all_is_true_any_is_false() {
        let s = snap();
        assert!(matches(&[], ConditionLogic::All, &s));
        assert!(!matches(&[], ConditionLogic::Any, &s));
    }

    #[test]
    fn all_requires_every_condition() {
        let s = snap();
        let conds = [
            cond(MetricId::Spend, ConditionOp::Gte, 100_000.0),
            cond(MetricId::Ctr, ConditionOp::Gt, 2.0),
        ];
        assert!(!matches(&conds, ConditionLogic::All, &s));
        assert!(matches(&conds, ConditionLogic::Any, &s));
    }

    #[test]
    fn any_with_one_missing_metric_still_matches() {
        let s = snap();
        let conds = [
            cond(MetricId::Reach, ConditionOp::Gt, 0.0),
            cond(MetricId::Spend, ConditionOp::Gt, 0.0),
        ];
        assert!(matches(&conds, ConditionLogic::Any, &s));
    }
}
