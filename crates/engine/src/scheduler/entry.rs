//! Per-rule-set scheduling state.

use chrono::{DateTime, Utc};

use super::schedule::CompiledSchedule;

/// Scheduling state for one rule set.
///
/// `last_evaluated` moves on every cycle and keeps one cron occurrence
/// from firing on every worker tick. `last_applied` moves only when a
/// cycle applied at least one action and anchors the cooldown window.
#[derive(Debug, Clone)]
pub struct CycleScheduleEntry {
    pub rule_set_id: String,
    pub schedule: CompiledSchedule,
    pub last_evaluated: Option<DateTime<Utc>>,
    pub last_applied: Option<DateTime<Utc>>,
    pub enabled: bool,
}

impl CycleScheduleEntry {
    pub fn new(rule_set_id: String, schedule: CompiledSchedule, enabled: bool) -> Self {
        Self {
            rule_set_id,
            schedule,
            last_evaluated: None,
            last_applied: None,
            enabled,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.schedule.is_due(now, self.last_evaluated, self.last_applied)
    }
}
