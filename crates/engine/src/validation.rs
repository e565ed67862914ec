//! Load-time rule-set validation with structured errors.
//!
//! Errors block the load (the rule set is never evaluated); warnings are
//! advisory and surfaced in logs. Validation runs after deserialization,
//! so type-level problems (unknown metrics, operators, action kinds) have
//! already been rejected by serde; this layer checks the semantics the
//! type system cannot express: cron syntax, percent ranges, revert times,
//! duplicate IDs, and fail-closed targeting.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::revert::parse_local_time;
use crate::scheduler::{parse_cooldown, CompiledSchedule, ScheduleError};
use crate::schema::{Action, BasicRule, Condition, ConditionLogic, Override, RuleSet, API_VERSION, KIND};

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// JSON-path-like location, e.g. `"basic_rules[0].action.percent"`.
    pub path: String,
    pub message: String,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// All error messages joined for log output.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate a parsed [`RuleSet`].
pub fn validate_rule_set(rs: &RuleSet) -> ValidationResult {
    let mut result = ValidationResult::new();
    check_header(rs, &mut result);
    check_targeting(rs, &mut result);
    check_schedule(rs, &mut result);
    check_basic_rules(&rs.basic_rules, &mut result);
    check_overrides(&rs.overrides, &mut result);
    result
}

// ── Checks ──────────────────────────────────────────────────────────

fn check_header(rs: &RuleSet, result: &mut ValidationResult) {
    if rs.api_version != API_VERSION {
        result.error(
            "apiVersion",
            format!("expected '{}', got '{}'", API_VERSION, rs.api_version),
        );
    }
    if rs.kind != KIND {
        result.error("kind", format!("expected '{}', got '{}'", KIND, rs.kind));
    }
    if rs.metadata.id.is_empty() {
        result.error("metadata.id", "must not be empty");
    }
    if rs.metadata.name.is_empty() {
        result.error("metadata.name", "must not be empty");
    }
}

fn check_targeting(rs: &RuleSet, result: &mut ValidationResult) {
    // Empty targeting fails closed at runtime; reject it at save time so the
    // mistake is visible instead of a silently idle rule set.
    if rs.target_labels.is_empty() {
        result.error("target_labels", "must name at least one label, empty targeting matches no entities");
    }
}

fn check_schedule(rs: &RuleSet, result: &mut ValidationResult) {
    match CompiledSchedule::compile(&rs.schedule) {
        Ok(_) => {}
        Err(e @ ScheduleError::Cooldown(_)) => result.error("schedule.cooldown", e.to_string()),
        Err(e @ ScheduleError::Cron { .. }) => {
            result.error("schedule.cron", e.to_string());
            // Compilation stops at the cron error; still report a bad
            // cooldown so the author fixes both in one pass.
            if let Some(cooldown) = rs.schedule.cooldown.as_deref() {
                if parse_cooldown(cooldown).is_none() {
                    result.error(
                        "schedule.cooldown",
                        format!("unparseable cooldown '{}', expected e.g. '2h30m'", cooldown),
                    );
                }
            }
        }
    }
}

fn check_basic_rules(rules: &[BasicRule], result: &mut ValidationResult) {
    if rules.is_empty() {
        result.warn("basic_rules", "rule set has no basic rules, evaluation can never fire an action");
    }

    let mut seen = HashSet::new();
    for (i, rule) in rules.iter().enumerate() {
        let path = format!("basic_rules[{}]", i);
        if rule.id.is_empty() {
            result.error(format!("{}.id", path), "must not be empty");
        } else if !seen.insert(rule.id.as_str()) {
            result.error(format!("{}.id", path), format!("duplicate rule id '{}'", rule.id));
        }
        check_conditions(&rule.conditions, rule.logic, &path, result);
        check_action(&rule.action, &path, result);
    }
}

fn check_conditions(
    conditions: &[Condition],
    logic: ConditionLogic,
    path: &str,
    result: &mut ValidationResult,
) {
    if conditions.is_empty() && logic == ConditionLogic::Any {
        result.warn(
            format!("{}.conditions", path),
            "empty condition list with 'any' logic never matches",
        );
    }
    for (i, cond) in conditions.iter().enumerate() {
        if !cond.value.is_finite() {
            result.error(
                format!("{}.conditions[{}].value", path, i),
                "must be a finite number",
            );
        }
    }
}

fn check_action(action: &Action, path: &str, result: &mut ValidationResult) {
    match action {
        Action::TurnOff { revert: Some(spec) } => {
            if parse_local_time(&spec.at).is_none() {
                result.error(
                    format!("{}.action.revert.at", path),
                    format!("invalid time '{}', expected 'HH:MM'", spec.at),
                );
            }
        }
        Action::TurnOff { revert: None } => {}
        Action::IncreaseBudget { percent } => {
            if !percent.is_finite() || *percent <= 0.0 || *percent > 1000.0 {
                result.error(
                    format!("{}.action.percent", path),
                    "must be in (0, 1000]",
                );
            }
        }
        Action::DecreaseBudget { percent } => {
            // Decreasing by 100% zeroes the budget; anything above is nonsense.
            if !percent.is_finite() || *percent <= 0.0 || *percent > 100.0 {
                result.error(
                    format!("{}.action.percent", path),
                    "must be in (0, 100]",
                );
            }
        }
    }
}

fn check_overrides(overrides: &[Override], result: &mut ValidationResult) {
    let mut seen = HashSet::new();
    for (i, ov) in overrides.iter().enumerate() {
        let path = format!("overrides[{}]", i);
        if ov.id.is_empty() {
            result.error(format!("{}.id", path), "must not be empty");
        } else if !seen.insert(ov.id.as_str()) {
            result.error(format!("{}.id", path), format!("duplicate override id '{}'", ov.id));
        }
        if ov.blocks.is_empty() {
            result.warn(format!("{}.blocks", path), "override blocks no action kinds");
        }
        if ov.reason.is_empty() {
            result.warn(
                format!("{}.reason", path),
                "empty reason gives operators nothing to act on",
            );
        }
        check_conditions(&ov.conditions, ov.logic, &path, result);
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use adpilot_core::{EntityKind, MetricId, TimeRange};

    use crate::schema::*;

    use super::*;

    fn base_rule_set() -> RuleSet {
        RuleSet {
            api_version: "v1".into(),
            kind: "RuleSet".into(),
            metadata: RuleSetMetadata {
                id: "rs-1".into(),
                name: "Test rules".into(),
                description: None,
                enabled: true,
            },
            scope: EntityKind::Campaign,
            time_range: TimeRange::Today,
            target_labels: ["tier-1".to_string()].into_iter().collect(),
            schedule: Schedule {
                cron: "*/30 * * * *".into(),
                cooldown: Some("1h".into()),
            },
            basic_rules: vec![BasicRule {
                id: "r1".into(),
                name: "Stop overspend".into(),
                conditions: vec![Condition {
                    metric: MetricId::Spend,
                    op: ConditionOp::Gte,
                    value: 100_000.0,
                }],
                logic: ConditionLogic::All,
                action: Action::TurnOff { revert: None },
            }],
            overrides: Vec::new(),
        }
    }

    #[test]
    fn valid_rule_set_passes() {
        let result = validate_rule_set(&base_rule_set());
        assert!(result.valid, "{}", result.error_summary());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn empty_target_labels_is_an_error() {
        let mut rs = base_rule_set();
        rs.target_labels.clear();
        let result = validate_rule_set(&rs);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "target_labels"));
    }

    #[test]
    fn bad_cron_is_an_error() {
        let mut rs = base_rule_set();
        rs.schedule.cron = "every thirty minutes".into();
        assert!(!validate_rule_set(&rs).valid);
    }

    #[test]
    fn bad_cron_and_cooldown_are_both_reported() {
        let mut rs = base_rule_set();
        rs.schedule.cron = "every thirty minutes".into();
        rs.schedule.cooldown = Some("soonish".into());
        let result = validate_rule_set(&rs);
        assert!(result.errors.iter().any(|e| e.path == "schedule.cron"));
        assert!(result.errors.iter().any(|e| e.path == "schedule.cooldown"));
    }

    #[test]
    fn bad_cooldown_is_an_error() {
        let mut rs = base_rule_set();
        rs.schedule.cooldown = Some("soonish".into());
        assert!(!validate_rule_set(&rs).valid);
    }

    #[test]
    fn bad_revert_time_is_an_error() {
        let mut rs = base_rule_set();
        rs.basic_rules[0].action = Action::TurnOff {
            revert: Some(RevertSpec {
                enabled: true,
                at: "25:99".into(),
            }),
        };
        let result = validate_rule_set(&rs);
        assert!(!result.valid);
        assert!(result.errors[0].path.contains("revert.at"));
    }

    #[test]
    fn out_of_range_percents_are_errors() {
        let mut rs = base_rule_set();
        rs.basic_rules[0].action = Action::IncreaseBudget { percent: 0.0 };
        assert!(!validate_rule_set(&rs).valid);

        rs.basic_rules[0].action = Action::DecreaseBudget { percent: 150.0 };
        assert!(!validate_rule_set(&rs).valid);

        rs.basic_rules[0].action = Action::DecreaseBudget { percent: 100.0 };
        assert!(validate_rule_set(&rs).valid);
    }

    #[test]
    fn duplicate_rule_ids_are_errors() {
        let mut rs = base_rule_set();
        let mut dup = rs.basic_rules[0].clone();
        dup.action = Action::IncreaseBudget { percent: 10.0 };
        rs.basic_rules.push(dup);
        let result = validate_rule_set(&rs);
        assert!(!result.valid);
        assert!(result.error_summary().contains("duplicate rule id"));
    }

    #[test]
    fn wrong_header_is_an_error() {
        let mut rs = base_rule_set();
        rs.api_version = "v2".into();
        rs.kind = "Policy".into();
        let result = validate_rule_set(&rs);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn advisory_cases_warn_but_pass() {
        let mut rs = base_rule_set();
        rs.overrides.push(Override {
            id: "ov1".into(),
            name: "No-op override".into(),
            conditions: Vec::new(),
            logic: ConditionLogic::Any,
            blocks: BTreeSet::new(),
            reason: String::new(),
        });
        let result = validate_rule_set(&rs);
        assert!(result.valid);
        assert!(result.warnings.len() >= 3, "blocks, reason, and any-logic warnings");
    }
}
