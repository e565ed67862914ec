//! Root rule-set document and its two policy tiers.

use std::collections::BTreeSet;

use adpilot_core::{Entity, EntityKind, LabelId, TimeRange};
use serde::{Deserialize, Serialize};

use super::{Action, ActionKind, Condition, ConditionLogic, RuleSetMetadata};

/// Expected `apiVersion` value for rule-set documents.
pub const API_VERSION: &str = "v1";
/// Expected `kind` value for rule-set documents.
pub const KIND: &str = "RuleSet";

/// Top-level rule-set definition parsed from YAML.
///
/// One document governs one level of the advertising hierarchy (`scope`)
/// for the entities carrying at least one of `target_labels`. Basic rules
/// fire actions; overrides block action kinds. Read-only to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: RuleSetMetadata,
    pub scope: EntityKind,
    pub time_range: TimeRange,
    #[serde(default)]
    pub target_labels: BTreeSet<LabelId>,
    pub schedule: Schedule,
    #[serde(default)]
    pub basic_rules: Vec<BasicRule>,
    #[serde(default)]
    pub overrides: Vec<Override>,
}

impl RuleSet {
    /// Whether this rule set applies to the given entity at all.
    ///
    /// Requires kind == scope and a non-empty label intersection; an empty
    /// `target_labels` set matches nothing.
    pub fn covers(&self, entity: &Entity) -> bool {
        entity.kind == self.scope && entity.matches_labels(&self.target_labels)
    }

    /// Serialize back to YAML (used by tests and tooling).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// Cron-based evaluation cadence with optional cooldown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Schedule {
    /// Standard 5-field cron expression (UTC).
    pub cron: String,
    /// Minimum interval between successive cycles, e.g. "2h30m".
    #[serde(default)]
    pub cooldown: Option<String>,
}

/// Low-priority tier: when the conditions hold, request the action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BasicRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub logic: ConditionLogic,
    pub action: Action,
}

/// High-priority tier: when the conditions hold, block action kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Override {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub logic: ConditionLogic,
    pub blocks: BTreeSet<ActionKind>,
    /// Shown to operators when a decision is suppressed.
    pub reason: String,
}
