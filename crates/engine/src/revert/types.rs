//! Pending-revert record and its state machine.

use adpilot_core::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::external::OriginalState;
use crate::schema::ActionKind;

/// Lifecycle of a pending revert.
///
/// `Pending → {Executed | Cancelled | Failed}`. A failed restore attempt
/// keeps the entry `Pending` for the next tick; `Failed` is terminal and
/// only reached after the retry-tick budget is exhausted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RevertStatus {
    Pending,
    Executed,
    Cancelled,
    Failed,
}

/// A scheduled, time-deferred reversal of a previously applied action.
///
/// At most one active `Pending` entry exists per (entity, action kind);
/// scheduling the same pair again supersedes the prior entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRevert {
    pub id: Uuid,
    pub entity_id: EntityId,
    pub action_kind: ActionKind,
    pub original_state: OriginalState,
    /// Wall-clock "HH:MM" the revert was requested for, kept for audit.
    pub at_local: String,
    /// UTC instant of the next occurrence of `at_local` in the entity's
    /// time zone, computed at schedule time.
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attempts: u32,
    pub status: RevertStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl PendingRevert {
    /// Idempotency key: one active revert per (entity, action kind).
    pub fn key(&self) -> (EntityId, ActionKind) {
        (self.entity_id.clone(), self.action_kind)
    }
}
