//! Time-deferred action reversal.
//!
//! When a TurnOff with an auto-revert spec applies, the coordinator hands
//! the entity's prior state here. The scheduler computes the next UTC
//! occurrence of the requested local wall-clock time, persists the entry,
//! and a periodic tick restores due entities through the action executor.

mod store;
mod types;

use std::path::Path;
use std::sync::Arc;

use adpilot_core::EntityId;
use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::external::{ActionExecutor, Clock, OriginalState};
use crate::schema::ActionKind;

use store::RevertStore;

pub use types::{PendingRevert, RevertStatus};

/// Errors from revert scheduling and persistence.
#[derive(Debug, thiserror::Error)]
pub enum RevertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid revert time '{0}', expected 'HH:MM'")]
    BadTime(String),
}

/// Parse a "HH:MM" wall-clock string.
pub fn parse_local_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Next future UTC instant at which the local wall clock in the given fixed
/// offset reads `at`. A time at or before the current local time rolls to
/// tomorrow.
pub fn next_local_occurrence(
    now: DateTime<Utc>,
    at: NaiveTime,
    utc_offset_minutes: i32,
) -> DateTime<Utc> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    let now_local = now.with_timezone(&offset);

    let mut date = now_local.date_naive();
    if at <= now_local.time() {
        date = date.succ_opt().unwrap_or(date);
    }

    // Fixed offsets have no DST gaps, so the mapping is always unambiguous.
    date.and_time(at)
        .and_local_timezone(offset)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

/// Persistent scheduler for pending reverts.
///
/// The store is the engine's only shared mutable state; every mutation is
/// serialized behind one async mutex and flushed to disk before the lock is
/// released, so concurrent schedules for the same (entity, action kind) can
/// never leave two active entries.
pub struct RevertScheduler {
    store: Mutex<RevertStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl RevertScheduler {
    /// Open (or create) the scheduler over the state file at `path`.
    pub fn open(path: &Path, max_attempts: u32, clock: Arc<dyn Clock>) -> Result<Self, RevertError> {
        Ok(Self {
            store: Mutex::new(RevertStore::load(path)?),
            clock,
            max_attempts,
        })
    }

    /// Create or replace the pending revert for (entity, action kind).
    ///
    /// A prior `Pending` entry for the same pair is cancelled and replaced,
    /// which models the "auto-revert time was edited" case idempotently.
    pub async fn schedule(
        &self,
        entity_id: &EntityId,
        action_kind: ActionKind,
        original_state: OriginalState,
        at_local: &str,
        utc_offset_minutes: i32,
    ) -> Result<PendingRevert, RevertError> {
        let at = parse_local_time(at_local).ok_or_else(|| RevertError::BadTime(at_local.to_string()))?;
        let now = self.clock.now();
        let scheduled_at = next_local_occurrence(now, at, utc_offset_minutes);

        let entry = PendingRevert {
            id: Uuid::new_v4(),
            entity_id: entity_id.clone(),
            action_kind,
            original_state,
            at_local: at_local.to_string(),
            scheduled_at,
            created_at: now,
            attempts: 0,
            status: RevertStatus::Pending,
            last_error: None,
        };

        let mut store = self.store.lock().await;
        if let Some(prior) = store.upsert(entry.clone()) {
            info!(
                entity_id = %entity_id,
                action_kind = %action_kind,
                superseded = %prior.id,
                "replaced existing pending revert"
            );
        }
        store.persist()?;

        info!(
            entity_id = %entity_id,
            action_kind = %action_kind,
            scheduled_at = %scheduled_at,
            "scheduled revert"
        );
        Ok(entry)
    }

    /// Execute all due reverts, returning every entry that reached a
    /// terminal state this tick (`Executed` or `Failed`).
    ///
    /// A restore that fails stays `Pending` and is retried on the next tick
    /// until the attempt budget is spent.
    pub async fn tick(&self, executor: &dyn ActionExecutor) -> Vec<PendingRevert> {
        let now = self.clock.now();
        let due = {
            let store = self.store.lock().await;
            store.due(now)
        };

        let mut transitions = Vec::new();
        for entry in due {
            let result = executor.restore(&entry.entity_id, &entry.original_state).await;

            let mut store = self.store.lock().await;
            // Re-check: a concurrent schedule() may have superseded this
            // entry while the restore call was in flight.
            if store.get(&entry.key()).map(|e| e.id) != Some(entry.id) {
                continue;
            }

            match result {
                Ok(()) => {
                    if let Some(executed) = store.mark_executed(&entry.key()) {
                        info!(entity_id = %executed.entity_id, revert_id = %executed.id, "revert executed");
                        transitions.push(executed);
                    }
                }
                Err(e) => {
                    warn!(
                        entity_id = %entry.entity_id,
                        revert_id = %entry.id,
                        attempt = entry.attempts + 1,
                        error = %e,
                        "revert attempt failed"
                    );
                    if let Some(terminal) =
                        store.mark_attempt_failed(&entry.key(), e.to_string(), self.max_attempts)
                    {
                        warn!(
                            entity_id = %terminal.entity_id,
                            revert_id = %terminal.id,
                            "revert failed terminally, needs manual attention"
                        );
                        transitions.push(terminal);
                    }
                }
            }
            if let Err(e) = store.persist() {
                warn!(error = %e, "failed to persist revert store");
            }
        }
        transitions
    }

    /// All currently pending reverts.
    pub async fn pending(&self) -> Vec<PendingRevert> {
        self.store.lock().await.pending()
    }

    /// Terminal failures awaiting manual attention.
    pub async fn failed(&self) -> Vec<PendingRevert> {
        self.store.lock().await.failed().to_vec()
    }

    /// Clear a terminal failure after manual resolution.
    pub async fn dismiss_failed(&self, id: Uuid) -> Result<bool, RevertError> {
        let mut store = self.store.lock().await;
        let removed = store.dismiss_failed(id);
        if removed {
            store.persist()?;
        }
        Ok(removed)
    }
}
