//! Override resolution: which action kinds are blocked, and why.

use adpilot_core::MetricSnapshot;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{ActionKind, Override};

use super::condition::matches;

/// One override's contribution to a blocked action kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockReason {
    pub override_id: String,
    pub override_name: String,
    pub reason: String,
}

/// Blocked action kinds with the full reason list per kind.
///
/// Multiple overrides may block the same kind; every reason is retained in
/// override order for the audit trail, not just the first. Backed by an
/// `IndexMap` so report output order is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BlockedActions {
    kinds: IndexMap<ActionKind, Vec<BlockReason>>,
}

impl BlockedActions {
    pub fn is_blocked(&self, kind: ActionKind) -> bool {
        self.kinds.contains_key(&kind)
    }

    /// Reasons for a blocked kind, empty when the kind is not blocked.
    pub fn reasons(&self, kind: ActionKind) -> &[BlockReason] {
        self.kinds.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn blocked_kinds(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.kinds.keys().copied()
    }

    fn block(&mut self, kind: ActionKind, reason: BlockReason) {
        self.kinds.entry(kind).or_default().push(reason);
    }
}

/// Evaluate every override against the snapshot and union the blocked kinds.
///
/// Side-effect-free; overrides whose conditions do not match contribute
/// nothing.
pub fn resolve(overrides: &[Override], snapshot: &MetricSnapshot) -> BlockedActions {
    let mut blocked = BlockedActions::default();
    for ov in overrides {
        if !matches(&ov.conditions, ov.logic, snapshot) {
            continue;
        }
        for kind in &ov.blocks {
            blocked.block(
                *kind,
                BlockReason {
                    override_id: ov.id.clone(),
                    override_name: ov.name.clone(),
                    reason: ov.reason.clone(),
                },
            );
        }
    }
    blocked
}

#[cfg(test)]
mod tests {
    use adpilot_core::{MetricId, TimeRange};

    use crate::schema::{Condition, ConditionLogic, ConditionOp};

    use super::*;

    fn override_blocking(id: &str, metric: MetricId, threshold: f64, kinds: &[ActionKind]) -> Override {
        Override {
            id: id.to_string(),
            name: format!("override {}", id),
            conditions: vec![Condition {
                metric,
                op: ConditionOp::Gte,
                value: threshold,
            }],
            logic: ConditionLogic::All,
            blocks: kinds.iter().copied().collect(),
            reason: format!("{} is protected", id),
        }
    }

    #[test]
    fn matching_override_blocks_its_kinds() {
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::SdtRate, 60.0);
        let overrides = vec![override_blocking(
            "ov1",
            MetricId::SdtRate,
            50.0,
            &[ActionKind::TurnOff, ActionKind::DecreaseBudget],
        )];

        let blocked = resolve(&overrides, &snap);
        assert!(blocked.is_blocked(ActionKind::TurnOff));
        assert!(blocked.is_blocked(ActionKind::DecreaseBudget));
        assert!(!blocked.is_blocked(ActionKind::IncreaseBudget));
        assert_eq!(blocked.reasons(ActionKind::TurnOff)[0].override_id, "ov1");
    }

    #[test]
    fn non_matching_override_blocks_nothing() {
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::SdtRate, 10.0);
        let overrides = vec![override_blocking("ov1", MetricId::SdtRate, 50.0, &[ActionKind::TurnOff])];
        assert!(resolve(&overrides, &snap).is_empty());
    }

    #[test]
    fn all_reasons_are_retained_in_override_order() {
        let snap = MetricSnapshot::new("c1", TimeRange::Today)
            .with_value(MetricId::SdtRate, 60.0)
            .with_value(MetricId::PurchaseRoas, 5.0);
        let overrides = vec![
            override_blocking("ov1", MetricId::SdtRate, 50.0, &[ActionKind::TurnOff]),
            override_blocking("ov2", MetricId::PurchaseRoas, 3.0, &[ActionKind::TurnOff]),
        ];

        let blocked = resolve(&overrides, &snap);
        let reasons = blocked.reasons(ActionKind::TurnOff);
        assert_eq!(reasons.len(), 2);
        assert_eq!(reasons[0].override_id, "ov1");
        assert_eq!(reasons[1].override_id, "ov2");
    }

    #[test]
    fn override_with_missing_metric_fails_closed() {
        let snap = MetricSnapshot::new("c1", TimeRange::Today);
        let overrides = vec![override_blocking("ov1", MetricId::SdtRate, 50.0, &[ActionKind::TurnOff])];
        assert!(resolve(&overrides, &snap).is_empty());
    }
}
