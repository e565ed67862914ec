//! Advertising entity types and the label targeting index.
//!
//! Entities (campaigns, ad sets, ads) are supplied by the external catalog;
//! the engine never mutates entity identity, only requests delivery/budget
//! changes through the action executor. Label membership is resolved through
//! a [`LabelIndex`] maintained alongside the catalog, not by live joins.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Platform-assigned entity identifier (opaque string).
pub type EntityId = String;

/// User-defined targeting label identifier.
pub type LabelId = String;

/// The level of the advertising hierarchy an entity lives at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Campaign,
    AdSet,
    Ad,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Campaign => write!(f, "campaign"),
            EntityKind::AdSet => write!(f, "ad_set"),
            EntityKind::Ad => write!(f, "ad"),
        }
    }
}

/// An advertising entity as seen by the engine.
///
/// `utc_offset_minutes` is the entity's effective (ad-account) time zone as
/// a fixed offset from UTC; revert times like "07:00" are interpreted in
/// this offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    #[serde(default)]
    pub labels: BTreeSet<LabelId>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Entity {
    /// Whether any of this entity's labels appears in `targets`.
    ///
    /// An empty `targets` set matches nothing (fail closed).
    pub fn matches_labels(&self, targets: &BTreeSet<LabelId>) -> bool {
        if targets.is_empty() {
            return false;
        }
        self.labels.iter().any(|l| targets.contains(l))
    }
}

// ── Label index ─────────────────────────────────────────────────────

/// Index from label to the set of entity IDs carrying that label.
///
/// The catalog collaborator rebuilds this wholesale or applies incremental
/// upserts/removals as label assignments change. Lookups are read-only from
/// the engine's perspective.
#[derive(Debug, Clone, Default)]
pub struct LabelIndex {
    by_label: HashMap<LabelId, BTreeSet<EntityId>>,
    /// Reverse map so an upsert can drop stale memberships.
    by_entity: HashMap<EntityId, BTreeSet<LabelId>>,
}

impl LabelIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all state and index the given entities from scratch.
    pub fn rebuild(&mut self, entities: &[Entity]) {
        self.by_label.clear();
        self.by_entity.clear();
        for entity in entities {
            self.upsert(entity);
        }
    }

    /// Insert or update a single entity's label memberships.
    pub fn upsert(&mut self, entity: &Entity) {
        self.remove(&entity.id);
        for label in &entity.labels {
            self.by_label
                .entry(label.clone())
                .or_default()
                .insert(entity.id.clone());
        }
        self.by_entity
            .insert(entity.id.clone(), entity.labels.clone());
    }

    /// Remove an entity from every label bucket.
    pub fn remove(&mut self, entity_id: &EntityId) {
        let Some(labels) = self.by_entity.remove(entity_id) else {
            return;
        };
        for label in labels {
            if let Some(bucket) = self.by_label.get_mut(&label) {
                bucket.remove(entity_id);
                if bucket.is_empty() {
                    self.by_label.remove(&label);
                }
            }
        }
    }

    /// Entity IDs carrying the given label.
    pub fn entities_for(&self, label: &str) -> Option<&BTreeSet<EntityId>> {
        self.by_label.get(label)
    }

    /// Union of entity IDs carrying at least one of the given labels.
    ///
    /// Empty `labels` yields an empty set (fail closed, mirroring
    /// [`Entity::matches_labels`]).
    pub fn entities_matching_any(&self, labels: &BTreeSet<LabelId>) -> BTreeSet<EntityId> {
        let mut out = BTreeSet::new();
        for label in labels {
            if let Some(bucket) = self.by_label.get(label) {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }

    /// Number of distinct labels with at least one member.
    pub fn label_count(&self) -> usize {
        self.by_label.len()
    }

    /// Number of indexed entities.
    pub fn entity_count(&self) -> usize {
        self.by_entity.len()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
