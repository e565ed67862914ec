//! Durable pending-revert store backed by a JSON file.
//!
//! The file holds every live entry (Pending plus terminal Failed awaiting
//! manual attention) and is rewritten atomically (temp file + rename) after
//! each mutation. Executed and cancelled entries leave the file at once, so
//! a restart can never double-apply a revert.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use adpilot_core::EntityId;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::schema::ActionKind;

use super::types::{PendingRevert, RevertStatus};
use super::RevertError;

type Key = (EntityId, ActionKind);

pub(super) struct RevertStore {
    path: PathBuf,
    active: HashMap<Key, PendingRevert>,
    failed: Vec<PendingRevert>,
}

impl RevertStore {
    /// Load the store from `path`, starting empty when the file is absent.
    pub(super) fn load(path: &Path) -> Result<Self, RevertError> {
        let mut store = Self {
            path: path.to_path_buf(),
            active: HashMap::new(),
            failed: Vec::new(),
        };

        if !path.exists() {
            return Ok(store);
        }

        let contents = fs::read_to_string(path)?;
        let entries: Vec<PendingRevert> = serde_json::from_str(&contents)?;
        for entry in entries {
            match entry.status {
                RevertStatus::Pending => {
                    store.active.insert(entry.key(), entry);
                }
                RevertStatus::Failed => store.failed.push(entry),
                // Terminal-and-done states should never have been persisted;
                // drop them on load.
                RevertStatus::Executed | RevertStatus::Cancelled => {
                    warn!(revert_id = %entry.id, status = ?entry.status, "dropping stale revert entry");
                }
            }
        }

        info!(
            path = %path.display(),
            pending = store.active.len(),
            failed = store.failed.len(),
            "loaded revert store"
        );
        Ok(store)
    }

    /// Insert a new pending entry, cancelling any prior entry for its key.
    ///
    /// Returns the superseded entry, if one existed.
    pub(super) fn upsert(&mut self, entry: PendingRevert) -> Option<PendingRevert> {
        let prior = self.active.insert(entry.key(), entry).map(|mut old| {
            old.status = RevertStatus::Cancelled;
            old
        });
        prior
    }

    /// All pending entries due at or before `now`, oldest first.
    pub(super) fn due(&self, now: DateTime<Utc>) -> Vec<PendingRevert> {
        let mut due: Vec<PendingRevert> = self
            .active
            .values()
            .filter(|e| e.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| e.scheduled_at);
        due
    }

    pub(super) fn get(&self, key: &Key) -> Option<&PendingRevert> {
        self.active.get(key)
    }

    pub(super) fn mark_executed(&mut self, key: &Key) -> Option<PendingRevert> {
        self.active.remove(key).map(|mut e| {
            e.status = RevertStatus::Executed;
            e
        })
    }

    /// Record a failed attempt; moves the entry to the failed list once the
    /// attempt budget is spent and returns the terminal entry.
    pub(super) fn mark_attempt_failed(
        &mut self,
        key: &Key,
        error: String,
        max_attempts: u32,
    ) -> Option<PendingRevert> {
        let entry = self.active.get_mut(key)?;
        entry.attempts += 1;
        entry.last_error = Some(error);
        if entry.attempts >= max_attempts {
            let mut terminal = self.active.remove(key)?;
            terminal.status = RevertStatus::Failed;
            self.failed.push(terminal.clone());
            return Some(terminal);
        }
        None
    }

    pub(super) fn pending(&self) -> Vec<PendingRevert> {
        self.active.values().cloned().collect()
    }

    pub(super) fn failed(&self) -> &[PendingRevert] {
        &self.failed
    }

    /// Drop a terminal Failed entry after manual resolution.
    pub(super) fn dismiss_failed(&mut self, id: uuid::Uuid) -> bool {
        let before = self.failed.len();
        self.failed.retain(|e| e.id != id);
        self.failed.len() != before
    }

    /// Rewrite the backing file atomically.
    pub(super) fn persist(&self) -> Result<(), RevertError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut entries: Vec<&PendingRevert> = self.active.values().collect();
        entries.extend(self.failed.iter());
        entries.sort_by_key(|e| e.created_at);

        let json = serde_json::to_string_pretty(&entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
