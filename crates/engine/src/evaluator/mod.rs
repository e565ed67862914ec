//! Policy engine: per-entity conflict-resolved action decisions.
//!
//! Evaluation order within one entity is fixed: overrides resolve first,
//! then basic rules match, then (in the coordinator) non-blocked decisions
//! execute. The engine itself is pure and in-memory; malformed rule sets
//! never reach it because the loader rejects them.

pub mod condition;
pub mod overrides;

use adpilot_core::{Entity, EntityId, MetricSnapshot};
use serde::{Deserialize, Serialize};

use crate::schema::{Action, RuleSet};

pub use condition::{evaluate, matches};
pub use overrides::{resolve, BlockReason, BlockedActions};

/// How basic rules within one rule set are arbitrated when several match.
///
/// The default is first-match-wins: rules are walked in array order and the
/// first match ends the walk. `AllMatches` lets every matching rule
/// contribute a decision instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchArbitration {
    #[default]
    FirstMatch,
    AllMatches,
}

/// A per-entity decision produced by one evaluation run.
///
/// `blocked_by` is empty for decisions that may execute; a non-empty list
/// means the action was suppressed by overrides but is still recorded so
/// operators can see "would have fired, but was blocked".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDecision {
    pub entity_id: EntityId,
    pub rule_id: String,
    pub rule_name: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<BlockReason>,
}

impl ActionDecision {
    pub fn is_blocked(&self) -> bool {
        !self.blocked_by.is_empty()
    }
}

/// Stateless decision maker combining rule matching and override resolution.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    arbitration: MatchArbitration,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_arbitration(arbitration: MatchArbitration) -> Self {
        Self { arbitration }
    }

    /// Produce the decision list for one entity under one rule set.
    ///
    /// Returns nothing when the rule set is disabled or does not cover the
    /// entity. Blocked candidates are returned with `blocked_by` filled in;
    /// the caller must not execute them.
    pub fn decide(
        &self,
        rule_set: &RuleSet,
        entity: &Entity,
        snapshot: &MetricSnapshot,
    ) -> Vec<ActionDecision> {
        if !rule_set.metadata.enabled || !rule_set.covers(entity) {
            return Vec::new();
        }

        let blocked = overrides::resolve(&rule_set.overrides, snapshot);

        let mut decisions = Vec::new();
        for rule in &rule_set.basic_rules {
            if !condition::matches(&rule.conditions, rule.logic, snapshot) {
                continue;
            }
            decisions.push(ActionDecision {
                entity_id: entity.id.clone(),
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                action: rule.action.clone(),
                blocked_by: blocked.reasons(rule.action.kind()).to_vec(),
            });
            if self.arbitration == MatchArbitration::FirstMatch {
                break;
            }
        }
        decisions
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use adpilot_core::{EntityKind, MetricId, TimeRange};

    use crate::schema::*;

    use super::*;

    fn condition(metric: MetricId, op: ConditionOp, value: f64) -> Condition {
        Condition { metric, op, value }
    }

    fn basic_rule(id: &str, cond: Condition, action: Action) -> BasicRule {
        BasicRule {
            id: id.to_string(),
            name: format!("rule {}", id),
            conditions: vec![cond],
            logic: ConditionLogic::All,
            action,
        }
    }

    fn rule_set(basic_rules: Vec<BasicRule>, overrides: Vec<Override>) -> RuleSet {
        RuleSet {
            api_version: "v1".into(),
            kind: "RuleSet".into(),
            metadata: RuleSetMetadata {
                id: "rs-1".into(),
                name: "test".into(),
                description: None,
                enabled: true,
            },
            scope: EntityKind::Campaign,
            time_range: TimeRange::Today,
            target_labels: ["tier-1".to_string()].into_iter().collect(),
            schedule: Schedule {
                cron: "0 * * * *".into(),
                cooldown: None,
            },
            basic_rules,
            overrides,
        }
    }

    fn campaign() -> Entity {
        Entity {
            id: "c1".into(),
            kind: EntityKind::Campaign,
            labels: ["tier-1".to_string()].into_iter().collect(),
            utc_offset_minutes: 0,
        }
    }

    fn turn_off() -> Action {
        Action::TurnOff { revert: None }
    }

    #[test]
    fn matching_rule_without_overrides_is_not_blocked() {
        let rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Gte, 100_000.0),
                turn_off(),
            )],
            Vec::new(),
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 150_000.0);

        let decisions = PolicyEngine::new().decide(&rs, &campaign(), &snap);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].rule_id, "r1");
        assert!(!decisions[0].is_blocked());
    }

    #[test]
    fn matching_override_blocks_but_still_emits_decision() {
        let rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Gte, 100_000.0),
                turn_off(),
            )],
            vec![Override {
                id: "ov1".into(),
                name: "Protect messaging".into(),
                conditions: vec![condition(MetricId::SdtRate, ConditionOp::Gte, 50.0)],
                logic: ConditionLogic::All,
                blocks: [ActionKind::TurnOff].into_iter().collect(),
                reason: "messaging volume healthy".into(),
            }],
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today)
            .with_value(MetricId::Spend, 150_000.0)
            .with_value(MetricId::SdtRate, 60.0);

        let decisions = PolicyEngine::new().decide(&rs, &campaign(), &snap);
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].is_blocked());
        assert_eq!(decisions[0].blocked_by[0].override_id, "ov1");
    }

    #[test]
    fn override_blocks_by_kind_not_parameter() {
        let rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Lt, 50_000.0),
                Action::IncreaseBudget { percent: 35.0 },
            )],
            vec![Override {
                id: "ov1".into(),
                name: "Budget freeze".into(),
                conditions: Vec::new(),
                logic: ConditionLogic::All, // vacuously true
                blocks: [ActionKind::IncreaseBudget].into_iter().collect(),
                reason: "month-end freeze".into(),
            }],
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 10_000.0);

        let decisions = PolicyEngine::new().decide(&rs, &campaign(), &snap);
        assert!(decisions[0].is_blocked());
    }

    #[test]
    fn first_match_wins_in_array_order() {
        let rs = rule_set(
            vec![
                basic_rule(
                    "r1",
                    condition(MetricId::Spend, ConditionOp::Gte, 100_000.0),
                    turn_off(),
                ),
                basic_rule(
                    "r2",
                    condition(MetricId::Spend, ConditionOp::Gte, 50_000.0),
                    Action::DecreaseBudget { percent: 20.0 },
                ),
            ],
            Vec::new(),
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 150_000.0);

        let decisions = PolicyEngine::new().decide(&rs, &campaign(), &snap);
        assert_eq!(decisions.len(), 1, "later matching rules are not evaluated");
        assert_eq!(decisions[0].rule_id, "r1");
    }

    #[test]
    fn all_matches_arbitration_emits_every_match() {
        let rs = rule_set(
            vec![
                basic_rule(
                    "r1",
                    condition(MetricId::Spend, ConditionOp::Gte, 100_000.0),
                    turn_off(),
                ),
                basic_rule(
                    "r2",
                    condition(MetricId::Spend, ConditionOp::Gte, 50_000.0),
                    Action::DecreaseBudget { percent: 20.0 },
                ),
            ],
            Vec::new(),
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 150_000.0);

        let engine = PolicyEngine::with_arbitration(MatchArbitration::AllMatches);
        let decisions = engine.decide(&rs, &campaign(), &snap);
        assert_eq!(decisions.len(), 2);
    }

    #[test]
    fn no_matching_rule_yields_no_decisions() {
        let rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Gte, 100_000.0),
                turn_off(),
            )],
            Vec::new(),
        );
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 10.0);
        assert!(PolicyEngine::new().decide(&rs, &campaign(), &snap).is_empty());
    }

    #[test]
    fn disabled_rule_set_is_never_evaluated() {
        let mut rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Gte, 0.0),
                turn_off(),
            )],
            Vec::new(),
        );
        rs.metadata.enabled = false;
        let snap = MetricSnapshot::new("c1", TimeRange::Today).with_value(MetricId::Spend, 1.0);
        assert!(PolicyEngine::new().decide(&rs, &campaign(), &snap).is_empty());
    }

    #[test]
    fn uncovered_entity_yields_no_decisions() {
        let rs = rule_set(
            vec![basic_rule(
                "r1",
                condition(MetricId::Spend, ConditionOp::Gte, 0.0),
                turn_off(),
            )],
            Vec::new(),
        );
        let snap = MetricSnapshot::new("a1", TimeRange::Today).with_value(MetricId::Spend, 1.0);

        let wrong_kind = Entity {
            id: "a1".into(),
            kind: EntityKind::Ad,
            labels: ["tier-1".to_string()].into_iter().collect(),
            utc_offset_minutes: 0,
        };
        assert!(PolicyEngine::new().decide(&rs, &wrong_kind, &snap).is_empty());

        let wrong_labels = Entity {
            labels: BTreeSet::new(),
            ..campaign()
        };
        assert!(PolicyEngine::new().decide(&rs, &wrong_labels, &snap).is_empty());
    }
}
