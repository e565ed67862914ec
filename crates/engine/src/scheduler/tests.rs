use std::collections::BTreeSet;
use std::time::Duration;

use adpilot_core::{EntityKind, TimeRange};
use chrono::TimeZone;

use crate::schema::{RuleSet, RuleSetMetadata, Schedule};

use super::*;

fn rule_set(id: &str, cron: &str, cooldown: Option<&str>) -> RuleSet {
    RuleSet {
        api_version: "v1".into(),
        kind: "RuleSet".into(),
        metadata: RuleSetMetadata {
            id: id.into(),
            name: id.into(),
            description: None,
            enabled: true,
        },
        scope: EntityKind::Campaign,
        time_range: TimeRange::Today,
        target_labels: BTreeSet::from(["tier-1".to_string()]),
        schedule: Schedule {
            cron: cron.into(),
            cooldown: cooldown.map(String::from),
        },
        basic_rules: Vec::new(),
        overrides: Vec::new(),
    }
}

fn at(h: u32, m: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 29, h, m, 0).unwrap()
}

#[test]
fn normalize_prepends_seconds_to_5field() {
    assert_eq!(normalize_cron("*/30 * * * *"), "0 */30 * * * *");
    assert_eq!(normalize_cron("0 */30 * * * *"), "0 */30 * * * *");
}

#[test]
fn parse_cooldown_components() {
    assert_eq!(parse_cooldown("2h30m"), Some(Duration::from_secs(9_000)));
    assert_eq!(parse_cooldown("1d"), Some(Duration::from_secs(86_400)));
    assert_eq!(parse_cooldown("90"), Some(Duration::from_secs(90)));
    assert_eq!(parse_cooldown("30m15"), None, "trailing digits are ambiguous");
    assert_eq!(parse_cooldown("soonish"), None);
    assert_eq!(parse_cooldown(""), None);
}

#[test]
fn compile_rejects_bad_cron_and_cooldown() {
    let bad_cron = Schedule {
        cron: "every thirty minutes".into(),
        cooldown: None,
    };
    assert!(matches!(
        CompiledSchedule::compile(&bad_cron),
        Err(ScheduleError::Cron { .. })
    ));

    let bad_cooldown = Schedule {
        cron: "*/30 * * * *".into(),
        cooldown: Some("soonish".into()),
    };
    assert!(matches!(
        CompiledSchedule::compile(&bad_cooldown),
        Err(ScheduleError::Cooldown(_))
    ));
}

#[test]
fn sync_adds_updates_and_removes_entries() {
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rule_set("a", "0 * * * *", None), rule_set("b", "0 * * * *", None)]);
    assert_eq!(sched.len(), 2);

    // "b" disappears, "a" changes cadence; history survives the update.
    sched.record_evaluated("a", at(9, 0));
    sched.record_applied("a", at(9, 0));
    sched.sync_rule_sets(&[rule_set("a", "*/5 * * * *", Some("1h"))]);
    assert_eq!(sched.len(), 1);
    let entry = sched.get("a").unwrap();
    assert_eq!(entry.schedule.cooldown(), Some(Duration::from_secs(3_600)));
    assert_eq!(entry.last_evaluated, Some(at(9, 0)));
    assert_eq!(entry.last_applied, Some(at(9, 0)));
}

#[test]
fn unschedulable_rule_set_is_dropped_from_sync() {
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rule_set("a", "not cron at all", None)]);
    assert!(sched.is_empty());
    assert!(!sched.should_run("a", at(12, 0)));
}

#[test]
fn each_cron_occurrence_fires_at_most_once() {
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rule_set("a", "*/30 * * * *", None)]);

    sched.record_evaluated("a", at(9, 31));
    assert!(!sched.should_run("a", at(9, 45)), "no occurrence between 9:31 and 9:45");
    assert!(sched.should_run("a", at(10, 0)), "10:00 occurrence has passed");
}

#[test]
fn cooldown_runs_from_applied_work() {
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rule_set("a", "*/5 * * * *", Some("1h"))]);

    sched.record_evaluated("a", at(9, 0));
    sched.record_applied("a", at(9, 0));
    assert!(!sched.should_run("a", at(9, 30)), "cron due but cooldown active");
    assert!(sched.should_run("a", at(10, 5)));
}

#[test]
fn blocked_cycle_does_not_start_cooldown() {
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rule_set("a", "*/5 * * * *", Some("1h"))]);

    // A cycle ran but applied nothing (everything blocked / no match):
    // only the evaluation timestamp moves.
    sched.record_evaluated("a", at(9, 0));
    assert!(sched.should_run("a", at(9, 5)), "next occurrence eligible despite cooldown");

    // Once work is applied the cooldown suppresses the next occurrences.
    sched.record_evaluated("a", at(9, 5));
    sched.record_applied("a", at(9, 5));
    assert!(!sched.should_run("a", at(9, 10)));
}

#[test]
fn disabled_rule_set_is_never_due() {
    let mut rs = rule_set("a", "* * * * *", None);
    rs.metadata.enabled = false;
    let mut sched = CycleScheduler::new();
    sched.sync_rule_sets(&[rs]);
    assert!(!sched.should_run("a", at(12, 0)));
    assert!(sched.due_rule_sets(at(12, 0)).is_empty());
}

#[test]
fn unknown_rule_set_is_not_due() {
    let sched = CycleScheduler::new();
    assert!(!sched.should_run("ghost", at(12, 0)));
}
