//! Cycle scheduling: which rule sets are due on a given worker tick.
//!
//! The engine never owns cron infrastructure. The worker binary ticks on a
//! coarse interval, asks [`CycleScheduler::due_rule_sets`] what to run, and
//! reports back how each cycle went; the scheduler keeps the evaluation
//! and cooldown history that turns those ticks into at-most-once firings
//! per cron occurrence.

mod entry;
mod schedule;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::schema::RuleSet;

pub use entry::CycleScheduleEntry;
pub use schedule::{normalize_cron, parse_cooldown, CompiledSchedule, ScheduleError};

#[cfg(test)]
mod tests;

/// Scheduling state for all loaded rule sets.
///
/// Call [`sync_rule_sets`](CycleScheduler::sync_rule_sets) whenever the
/// loaded set changes (e.g. after hot-reload); schedules are compiled once
/// there, not re-parsed on every due check. After each cycle the worker
/// reports the outcome through [`record_evaluated`](CycleScheduler::record_evaluated)
/// and, when work was applied, [`record_applied`](CycleScheduler::record_applied).
pub struct CycleScheduler {
    entries: HashMap<String, CycleScheduleEntry>,
}

impl CycleScheduler {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Synchronize entries with the currently loaded rule sets.
    ///
    /// New rule sets get fresh entries; surviving ones keep their
    /// evaluation and cooldown history while picking up schedule or
    /// enabled-flag edits; entries whose rule set disappeared are dropped.
    pub fn sync_rule_sets(&mut self, rule_sets: &[RuleSet]) {
        let current_ids: HashSet<&str> = rule_sets.iter().map(|r| r.metadata.id.as_str()).collect();
        self.entries.retain(|id, _| current_ids.contains(id.as_str()));

        for rs in rule_sets {
            let schedule = match CompiledSchedule::compile(&rs.schedule) {
                Ok(schedule) => schedule,
                Err(e) => {
                    // Validation rejects these at load time; reaching this
                    // point means the entry is stale, so drop it.
                    warn!(rule_set_id = %rs.metadata.id, error = %e, "unschedulable rule set");
                    self.entries.remove(&rs.metadata.id);
                    continue;
                }
            };

            match self.entries.get_mut(&rs.metadata.id) {
                Some(entry) => {
                    entry.schedule = schedule;
                    entry.enabled = rs.metadata.enabled;
                }
                None => {
                    self.entries.insert(
                        rs.metadata.id.clone(),
                        CycleScheduleEntry::new(rs.metadata.id.clone(), schedule, rs.metadata.enabled),
                    );
                }
            }
        }
    }

    /// Whether a single rule set should run at the given instant.
    pub fn should_run(&self, rule_set_id: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(rule_set_id)
            .map_or(false, |entry| entry.is_due(now))
    }

    /// IDs of all rule sets due at the given instant.
    pub fn due_rule_sets(&self, now: DateTime<Utc>) -> Vec<&str> {
        self.entries
            .values()
            .filter(|entry| entry.is_due(now))
            .map(|entry| entry.rule_set_id.as_str())
            .collect()
    }

    /// Record that a cycle ran, consuming the current cron occurrence.
    pub fn record_evaluated(&mut self, rule_set_id: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(rule_set_id) {
            entry.last_evaluated = Some(at);
        }
    }

    /// Record that a cycle applied at least one action, starting the
    /// cooldown window. Cycles where everything was blocked or nothing
    /// matched must not call this.
    pub fn record_applied(&mut self, rule_set_id: &str, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(rule_set_id) {
            entry.last_applied = Some(at);
        }
    }

    /// Scheduling entry by rule-set ID.
    pub fn get(&self, rule_set_id: &str) -> Option<&CycleScheduleEntry> {
        self.entries.get(rule_set_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CycleScheduler {
    fn default() -> Self {
        Self::new()
    }
}
