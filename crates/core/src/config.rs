//! Environment-driven engine configuration.
//!
//! Every knob reads an `ADPILOT_*` environment variable with a built-in
//! default, so the worker runs out of the box and is tuned per deployment
//! through the environment (or a `.env` file).

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned (recursively) for rule-set YAML files.
    pub rules_dir: PathBuf,
    /// Directory holding durable engine state (pending reverts).
    pub state_dir: PathBuf,
    /// Directory receiving per-day run-report JSONL files.
    pub reports_dir: PathBuf,
    pub execution: ExecutionConfig,
    pub revert: RevertConfig,
    pub ticks: TickConfig,
}

/// Worker-pool width and retry bounds for external calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Concurrent per-entity evaluations within one cycle.
    pub worker_count: usize,
    /// Attempts per external call (snapshot fetch, action apply).
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

/// Revert-scheduler retry budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevertConfig {
    /// Ticks a due revert may fail before it is terminally Failed.
    pub max_attempts: u32,
}

/// Worker loop intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Seconds between cycle-scheduler due checks.
    pub cycle_secs: u64,
    /// Seconds between revert-scheduler ticks.
    pub revert_secs: u64,
}

impl Config {
    /// Build config from environment variables (call [`load_dotenv`] first).
    pub fn from_env() -> Self {
        Self {
            rules_dir: PathBuf::from(env_or("ADPILOT_RULES_DIR", "data/rule-sets")),
            state_dir: PathBuf::from(env_or("ADPILOT_STATE_DIR", "data/state")),
            reports_dir: PathBuf::from(env_or("ADPILOT_REPORTS_DIR", "data/reports")),
            execution: ExecutionConfig {
                worker_count: env_usize("ADPILOT_WORKER_COUNT", 8),
                max_attempts: env_u32("ADPILOT_MAX_ATTEMPTS", 3),
                initial_backoff_ms: env_u64("ADPILOT_INITIAL_BACKOFF_MS", 200),
                max_backoff_ms: env_u64("ADPILOT_MAX_BACKOFF_MS", 2_000),
            },
            revert: RevertConfig {
                max_attempts: env_u32("ADPILOT_REVERT_MAX_ATTEMPTS", 5),
            },
            ticks: TickConfig {
                cycle_secs: env_u64("ADPILOT_CYCLE_TICK_SECS", 30),
                revert_secs: env_u64("ADPILOT_REVERT_TICK_SECS", 60),
            },
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            worker_count: 8,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_helpers_live_at_the_crate_root() {
        // The worker binary imports these from the root, not `config::`.
        crate::load_dotenv();
        let _ = crate::ExecutionConfig::default();
    }

    #[test]
    fn defaults_without_env() {
        let cfg = Config::from_env();
        assert_eq!(cfg.execution.worker_count, 8);
        assert_eq!(cfg.execution.max_attempts, 3);
        assert_eq!(cfg.revert.max_attempts, 5);
        assert_eq!(cfg.ticks.revert_secs, 60);
    }
}
