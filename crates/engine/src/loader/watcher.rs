//! Filesystem event handler for the notify watcher (hot-reload).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use notify::event::{CreateKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind};
use tracing::{info, warn};

use crate::schema::RuleSet;
use crate::validation::validate_rule_set;

/// Handle a single filesystem event from the notify watcher.
pub(super) fn handle_fs_event(event: &Event, rule_sets: &Arc<RwLock<HashMap<String, RuleSet>>>) {
    for path in &event.paths {
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e == "yml" || e == "yaml")
            .unwrap_or(false);

        if !is_yaml {
            continue;
        }

        // Skip dotfiles (including temp files from atomic editors).
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.starts_with('.') {
                continue;
            }
        }

        match &event.kind {
            EventKind::Create(CreateKind::File)
            | EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Name(_)) => {
                match reload_file(path) {
                    Ok(rule_set) => {
                        let id = rule_set.metadata.id.clone();
                        info!(rule_set_id = %id, path = %path.display(), "hot-reloaded rule set");
                        rule_sets
                            .write()
                            .expect("rule_sets lock poisoned")
                            .insert(id, rule_set);
                    }
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to reload rule set, keeping previous version"
                        );
                    }
                }
            }
            EventKind::Remove(RemoveKind::File) => {
                remove_by_path(rule_sets, path);
            }
            _ => {}
        }
    }
}

fn reload_file(path: &Path) -> Result<RuleSet, String> {
    let contents = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let rule_set: RuleSet = serde_yaml::from_str(&contents).map_err(|e| e.to_string())?;
    let validation = validate_rule_set(&rule_set);
    if !validation.valid {
        return Err(validation.error_summary());
    }
    Ok(rule_set)
}

/// Remove a rule set from the map given its file path (stem = rule-set ID
/// by the naming convention `<id>.yml`).
fn remove_by_path(rule_sets: &Arc<RwLock<HashMap<String, RuleSet>>>, path: &Path) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let removed = rule_sets
        .write()
        .expect("rule_sets lock poisoned")
        .remove(stem);
    if removed.is_some() {
        info!(rule_set_id = %stem, path = %path.display(), "removed rule set after file deletion");
    }
}
