//! Rule evaluation and conflict-resolution engine for ad governance.
//!
//! This crate provides:
//! - YAML rule-set definitions with serde deserialization and load-time validation
//! - Filesystem loader with hot-reload via `notify` watcher
//! - Condition/rule evaluation and override conflict resolution
//! - A bounded-concurrency execution coordinator with retries and audit reports
//! - A durable revert scheduler for time-deferred action reversal
//! - A cron-driven cycle scheduler consumed by the `adpilot-worker` binary

pub mod audit;
pub mod coordinator;
pub mod evaluator;
pub mod external;
pub mod loader;
pub mod revert;
pub mod scheduler;
pub mod schema;
pub mod validation;
