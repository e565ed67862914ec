//! Abstract collaborators: the metrics provider, the action executor on the
//! advertising platform, and the clock.
//!
//! All three are object-safe traits so the coordinator and the revert
//! scheduler can be exercised against in-memory fakes in tests and wired to
//! the real platform client in the worker.

use adpilot_core::{ApiError, EntityId, MetricSnapshot, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schema::Action;

/// Fetches point-in-time metric values for entities.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    async fn snapshot(
        &self,
        entity_id: &EntityId,
        time_range: TimeRange,
    ) -> Result<MetricSnapshot, ApiError>;
}

/// Applies governance actions on the advertising platform.
///
/// `apply` must be idempotent: turning off an already-off entity is a
/// no-op success reporting `prior_delivery: Paused`, never an error.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn apply(&self, entity_id: &EntityId, action: &Action) -> Result<ApplyOutcome, ApiError>;

    /// Restore an entity to a previously captured state (revert path).
    async fn restore(&self, entity_id: &EntityId, state: &OriginalState) -> Result<(), ApiError>;
}

/// What the executor reports back from a successful `apply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyOutcome {
    /// Delivery state before the action was applied; feeds the revert
    /// scheduler's restore snapshot.
    pub prior_delivery: DeliveryStatus,
}

/// Delivery state of an entity on the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Active,
    Paused,
}

/// Snapshot needed to restore an entity after a revert fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OriginalState {
    pub delivery: DeliveryStatus,
    pub captured_at: DateTime<Utc>,
}

/// Source of "now", swappable for deterministic tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
