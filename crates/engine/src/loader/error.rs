//! Loader errors and per-file load outcomes.
//!
//! Every error names the file it came from: scan results end up in logs
//! and operator-facing output, where a bare "YAML parse error" is useless
//! across a directory of rule sets.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{}: invalid YAML: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{}: rule set '{rule_set_id}' failed validation: {summary}", path.display())]
    Invalid {
        path: PathBuf,
        rule_set_id: String,
        summary: String,
    },

    #[error("directory scan failed: {0}")]
    Scan(#[from] std::io::Error),

    #[error("filesystem watcher: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// Outcome of one file in a directory scan.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

#[derive(Debug)]
pub enum LoadStatus {
    Loaded { rule_set_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

impl LoadResult {
    pub fn loaded(path: PathBuf, rule_set_id: String) -> Self {
        Self {
            path,
            status: LoadStatus::Loaded { rule_set_id },
        }
    }

    pub fn skipped(path: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            path,
            status: LoadStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(path: PathBuf, error: &LoadError) -> Self {
        Self {
            path,
            status: LoadStatus::Failed {
                error: error.to_string(),
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.status, LoadStatus::Loaded { .. })
    }
}
