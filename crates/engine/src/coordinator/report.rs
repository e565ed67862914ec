//! Run reports: the audit artifact produced by every evaluation cycle.

use adpilot_core::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::evaluator::ActionDecision;

/// Final outcome for one entity in one cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityOutcome {
    /// At least one non-blocked action was applied.
    Applied,
    /// Every matched action was blocked by overrides.
    Blocked,
    /// No basic rule matched.
    NoMatch,
    /// Not started before the run was cancelled.
    Skipped,
    /// Snapshot fetch or action application failed for this run.
    Failed,
}

/// Per-entity audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity_id: EntityId,
    pub outcome: EntityOutcome,
    /// Every decision produced, blocked ones included.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<ActionDecision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome tallies for one cycle.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunCounts {
    pub applied: usize,
    pub blocked: usize,
    pub no_match: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunCounts {
    fn tally(&mut self, outcome: EntityOutcome) {
        match outcome {
            EntityOutcome::Applied => self.applied += 1,
            EntityOutcome::Blocked => self.blocked += 1,
            EntityOutcome::NoMatch => self.no_match += 1,
            EntityOutcome::Skipped => self.skipped += 1,
            EntityOutcome::Failed => self.failed += 1,
        }
    }
}

/// Audit log for one `run_cycle` invocation; one JSON line per report in
/// the per-day report file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub rule_set_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entities: Vec<EntityReport>,
    pub counts: RunCounts,
}

impl RunReport {
    pub(crate) fn new(rule_set_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            rule_set_id: rule_set_id.to_string(),
            started_at,
            finished_at: started_at,
            entities: Vec::new(),
            counts: RunCounts::default(),
        }
    }

    pub(crate) fn push(&mut self, entry: EntityReport) {
        self.counts.tally(entry.outcome);
        self.entities.push(entry);
    }
}
