//! Filesystem-backed rule-set store with optional hot-reload.
//!
//! The engine's `RuleSetStore` collaborator: scans a directory
//! (recursively) for `*.yml` / `*.yaml` files, deserializes and validates
//! them, and maintains an in-memory map keyed by `metadata.id`. With the
//! watcher active, edits land without a restart; a file that stops parsing
//! keeps its previous loaded version.

mod error;
mod watcher;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use adpilot_core::EntityKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, warn};

use crate::schema::RuleSet;
use crate::validation::validate_rule_set;

use watcher::handle_fs_event;

pub use error::{LoadError, LoadResult, LoadStatus, Result};


/// Filesystem rule-set loader.
pub struct RuleSetLoader {
    /// Root directory containing rule-set YAML files.
    rules_dir: PathBuf,
    /// In-memory store keyed by `metadata.id`.
    rule_sets: Arc<RwLock<HashMap<String, RuleSet>>>,
    /// Active filesystem watcher (held to keep it alive).
    _watcher: Option<RecommendedWatcher>,
}

impl RuleSetLoader {
    /// Create a new loader for the given directory.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn new(rules_dir: PathBuf) -> Self {
        if !rules_dir.exists() {
            if let Err(e) = fs::create_dir_all(&rules_dir) {
                warn!(path = %rules_dir.display(), error = %e, "failed to create rules directory");
            }
        }
        Self {
            rules_dir,
            rule_sets: Arc::new(RwLock::new(HashMap::new())),
            _watcher: None,
        }
    }

    /// Recursively scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and non-YAML files are skipped. Parse and validation errors
    /// are reported per file but do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.rules_dir, &mut results)?;
        Ok(results)
    }

    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult::skipped(path, "dotfile"));
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            if !is_yaml(&path) {
                results.push(LoadResult::skipped(path, "not a YAML file"));
                continue;
            }

            match self.load_file(&path) {
                Ok(rule_set) => {
                    let rule_set_id = rule_set.metadata.id.clone();
                    info!(rule_set_id = %rule_set_id, path = %path.display(), "loaded rule set");
                    self.insert(rule_set);
                    results.push(LoadResult::loaded(path, rule_set_id));
                }
                Err(e) => {
                    warn!(error = %e, "failed to load rule-set file");
                    results.push(LoadResult::failed(path, &e));
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a single YAML file.
    ///
    /// A rule set that deserializes but fails validation is rejected here,
    /// so nothing malformed ever reaches the policy engine.
    pub fn load_file(&self, path: &Path) -> Result<RuleSet> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let rule_set: RuleSet = serde_yaml::from_str(&contents).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let validation = validate_rule_set(&rule_set);
        for warning in &validation.warnings {
            warn!(
                rule_set_id = %rule_set.metadata.id,
                path = %warning.path,
                "{}", warning.message
            );
        }
        if !validation.valid {
            return Err(LoadError::Invalid {
                path: path.to_path_buf(),
                rule_set_id: rule_set.metadata.id.clone(),
                summary: validation.error_summary(),
            });
        }

        Ok(rule_set)
    }

    fn insert(&self, rule_set: RuleSet) {
        self.rule_sets
            .write()
            .expect("rule_sets lock poisoned")
            .insert(rule_set.metadata.id.clone(), rule_set);
    }

    /// Start a filesystem watcher for hot reload.
    ///
    /// On file create/modify the rule set is re-parsed, re-validated, and
    /// upserted; on delete it is removed. A file that fails to parse keeps
    /// its previous version.
    pub fn watch(&mut self) -> Result<()> {
        let rule_sets = Arc::clone(&self.rule_sets);

        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &rule_sets),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        watcher.watch(&self.rules_dir, RecursiveMode::Recursive)?;
        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.rules_dir.display(), "watching rules directory for changes (recursive)");
        self._watcher = Some(watcher);
        Ok(())
    }

    /// The rules directory path.
    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Shared handle to the loaded rule-set map.
    pub fn rule_sets(&self) -> Arc<RwLock<HashMap<String, RuleSet>>> {
        Arc::clone(&self.rule_sets)
    }

    /// All currently loaded rule sets.
    pub fn snapshot(&self) -> Vec<RuleSet> {
        self.rule_sets
            .read()
            .expect("rule_sets lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Enabled rule sets scoped to the given entity kind.
    pub fn list_active(&self, scope: EntityKind) -> Vec<RuleSet> {
        self.rule_sets
            .read()
            .expect("rule_sets lock poisoned")
            .values()
            .filter(|rs| rs.metadata.enabled && rs.scope == scope)
            .cloned()
            .collect()
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}
