//! Compiled rule-set schedules: cron occurrences gated by a cooldown.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::schema::Schedule;

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression '{expr}': {reason}")]
    Cron { expr: String, reason: String },

    #[error("unparseable cooldown '{0}', expected e.g. '2h30m' or bare seconds")]
    Cooldown(String),
}

/// A rule set's schedule, parsed once when the loaded set is synced.
///
/// The due check takes two pieces of history: when the rule set last
/// *evaluated* and when it last *applied* an action. The first gate makes
/// each cron occurrence fire at most once even though the worker tick is
/// much finer than the cron cadence; the second enforces the cooldown.
/// Only applied work starts the cooldown window, so a cycle where every
/// decision was blocked (or nothing matched) leaves the next occurrence
/// eligible.
#[derive(Debug, Clone)]
pub struct CompiledSchedule {
    cron: cron::Schedule,
    cooldown: Option<Duration>,
}

impl CompiledSchedule {
    pub fn compile(schedule: &Schedule) -> Result<Self, ScheduleError> {
        let cron = cron::Schedule::from_str(&normalize_cron(&schedule.cron)).map_err(|e| {
            ScheduleError::Cron {
                expr: schedule.cron.clone(),
                reason: e.to_string(),
            }
        })?;
        let cooldown = match schedule.cooldown.as_deref() {
            Some(raw) => {
                Some(parse_cooldown(raw).ok_or_else(|| ScheduleError::Cooldown(raw.to_string()))?)
            }
            None => None,
        };
        Ok(Self { cron, cooldown })
    }

    /// Whether a new cycle is due at `now`.
    pub fn is_due(
        &self,
        now: DateTime<Utc>,
        last_evaluated: Option<DateTime<Utc>>,
        last_applied: Option<DateTime<Utc>>,
    ) -> bool {
        if let (Some(cooldown), Some(applied)) = (self.cooldown, last_applied) {
            let cooldown =
                chrono::Duration::from_std(cooldown).unwrap_or_else(|_| chrono::Duration::zero());
            if now.signed_duration_since(applied) < cooldown {
                return false;
            }
        }

        // Without evaluation history, look back one day for an occurrence.
        let horizon = last_evaluated.unwrap_or_else(|| now - chrono::Duration::days(1));
        self.cron.after(&horizon).next().map_or(false, |occ| occ <= now)
    }

    pub fn cooldown(&self) -> Option<Duration> {
        self.cooldown
    }
}

/// The `cron` crate wants 6-field expressions (leading seconds); rule-set
/// YAML uses standard 5-field cron. Prepend a zero seconds field when
/// needed, pass anything else through untouched.
pub fn normalize_cron(expr: &str) -> String {
    let expr = expr.trim();
    match expr.split_whitespace().count() {
        5 => format!("0 {expr}"),
        _ => expr.to_string(),
    }
}

/// Parse a cooldown like "30m", "1d12h" or "90s" into a [`Duration`].
/// A bare number is seconds. Trailing digits without a unit ("30m15")
/// are rejected as ambiguous.
pub fn parse_cooldown(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let mut secs: u64 = 0;
    let mut rest = raw;
    while !rest.is_empty() {
        let unit_pos = rest.find(|c: char| !c.is_ascii_digit())?;
        let (digits, tail) = rest.split_at(unit_pos);
        let n: u64 = digits.parse().ok()?;
        let per_unit = match tail.chars().next()? {
            'd' => 86_400,
            'h' => 3_600,
            'm' => 60,
            's' => 1,
            _ => return None,
        };
        secs += n * per_unit;
        rest = &tail[1..];
    }
    Some(Duration::from_secs(secs))
}
