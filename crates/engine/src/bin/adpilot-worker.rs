//! adpilot-worker — periodic trigger wiring the engine together.
//!
//! Owns the two tick loops the engine library deliberately does not:
//! - a cycle tick that asks the [`CycleScheduler`] which rule sets are due
//!   and runs one evaluation cycle per due rule set
//! - a revert tick that executes due pending reverts
//!
//! Collaborator wiring: metrics come from per-entity JSON files exported by
//! the ingestion pipeline; the action executor here is the dry-run logger,
//! with the real platform client wired in at deployment.

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tracing::{error, info, warn};

use adpilot_core::{
    load_dotenv, ApiError, Config, Entity, EntityId, LabelId, LabelIndex, MetricSnapshot, TimeRange,
};
use adpilot_engine::audit::ReportWriter;
use adpilot_engine::coordinator::{CancelToken, ExecutionCoordinator};
use adpilot_engine::evaluator::PolicyEngine;
use adpilot_engine::external::{
    ActionExecutor, ApplyOutcome, Clock, DeliveryStatus, MetricsProvider, OriginalState,
    SystemClock,
};
use adpilot_engine::loader::RuleSetLoader;
use adpilot_engine::revert::RevertScheduler;
use adpilot_engine::scheduler::CycleScheduler;
use adpilot_engine::schema::Action;

// ── CLI ─────────────────────────────────────────────────────────────

/// adpilot worker — periodic rule evaluation and revert execution.
#[derive(Parser, Debug)]
#[command(name = "adpilot-worker", version, about)]
struct Cli {
    /// Directory containing rule-set YAML files.
    #[arg(long, env = "ADPILOT_RULES_DIR")]
    rules_dir: Option<PathBuf>,

    /// Directory for durable engine state (pending reverts).
    #[arg(long, env = "ADPILOT_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Directory receiving per-day run-report JSONL files.
    #[arg(long, env = "ADPILOT_REPORTS_DIR")]
    reports_dir: Option<PathBuf>,

    /// JSON file with the entity catalog export.
    #[arg(long, env = "ADPILOT_ENTITIES_FILE", default_value = "data/entities.json")]
    entities_file: PathBuf,

    /// Directory with per-entity metric snapshot JSON files.
    #[arg(long, env = "ADPILOT_METRICS_DIR", default_value = "data/metrics")]
    metrics_dir: PathBuf,

    /// Log actions instead of calling the platform.
    #[arg(long, env = "ADPILOT_DRY_RUN", default_value_t = true)]
    dry_run: bool,
}

// ── Collaborator implementations ────────────────────────────────────

/// Reads `<metrics_dir>/<entity_id>.json` snapshots exported by ingestion.
struct FileMetricsProvider {
    metrics_dir: PathBuf,
}

#[async_trait]
impl MetricsProvider for FileMetricsProvider {
    async fn snapshot(
        &self,
        entity_id: &EntityId,
        _time_range: TimeRange,
    ) -> Result<MetricSnapshot, ApiError> {
        let path = self.metrics_dir.join(format!("{}.json", entity_id));
        let contents = fs::read_to_string(&path)
            .map_err(|e| ApiError::Transport(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&contents).map_err(|e| ApiError::Rejected {
            message: format!("malformed snapshot {}: {}", path.display(), e),
        })
    }
}

/// Logs every mutation instead of performing it.
struct DryRunExecutor;

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    async fn apply(&self, entity_id: &EntityId, action: &Action) -> Result<ApplyOutcome, ApiError> {
        info!(entity_id = %entity_id, action = %action.kind(), "dry-run: would apply action");
        Ok(ApplyOutcome {
            prior_delivery: DeliveryStatus::Active,
        })
    }

    async fn restore(&self, entity_id: &EntityId, state: &OriginalState) -> Result<(), ApiError> {
        info!(entity_id = %entity_id, delivery = ?state.delivery, "dry-run: would restore state");
        Ok(())
    }
}

/// Narrow the catalog to a rule set's label targets before the
/// coordinator's per-entity work: a couple of index bucket lookups
/// instead of a full catalog walk per rule set.
fn preselect(index: &LabelIndex, entities: &[Entity], target_labels: &BTreeSet<LabelId>) -> Vec<Entity> {
    let ids = index.entities_matching_any(target_labels);
    entities
        .iter()
        .filter(|e| ids.contains(&e.id))
        .cloned()
        .collect()
}

fn load_entities(path: &PathBuf) -> anyhow::Result<Vec<Entity>> {
    if !path.exists() {
        warn!(path = %path.display(), "entities file missing, evaluating nothing");
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading entities file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing entities file {}", path.display()))
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.rules_dir {
        config.rules_dir = dir;
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    if let Some(dir) = cli.reports_dir {
        config.reports_dir = dir;
    }
    if !cli.dry_run {
        anyhow::bail!("no platform client configured; only --dry-run is supported in this build");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut loader = RuleSetLoader::new(config.rules_dir.clone());
    let results = loader.load_all()?;
    info!(loaded = results.len(), path = %config.rules_dir.display(), "initial rule-set scan");
    loader.watch()?;

    let reverts = Arc::new(RevertScheduler::open(
        &config.state_dir.join("reverts.json"),
        config.revert.max_attempts,
        clock.clone(),
    )?);
    let executor: Arc<dyn ActionExecutor> = Arc::new(DryRunExecutor);
    let metrics: Arc<dyn MetricsProvider> = Arc::new(FileMetricsProvider {
        metrics_dir: cli.metrics_dir,
    });

    let coordinator = ExecutionCoordinator::new(
        metrics,
        executor.clone(),
        reverts.clone(),
        clock.clone(),
        PolicyEngine::new(),
        config.execution.clone(),
    );
    let writer = ReportWriter::new(&config.reports_dir)?;
    let mut scheduler = CycleScheduler::new();
    let cancel = CancelToken::new();

    let mut cycle_tick = tokio::time::interval(Duration::from_secs(config.ticks.cycle_secs.max(1)));
    let mut revert_tick = tokio::time::interval(Duration::from_secs(config.ticks.revert_secs.max(1)));

    info!("adpilot-worker starting");
    loop {
        tokio::select! {
            _ = cycle_tick.tick() => {
                let rule_sets = loader.snapshot();
                scheduler.sync_rule_sets(&rule_sets);

                let now = clock.now();
                let due: Vec<String> = scheduler
                    .due_rule_sets(now)
                    .into_iter()
                    .map(String::from)
                    .collect();
                if due.is_empty() {
                    continue;
                }

                let entities = match load_entities(&cli.entities_file) {
                    Ok(entities) => entities,
                    Err(e) => {
                        error!(error = %e, "failed to load entity catalog, skipping tick");
                        continue;
                    }
                };
                let mut index = LabelIndex::new();
                index.rebuild(&entities);

                for rule_set_id in due {
                    let Some(rule_set) = rule_sets.iter().find(|r| r.metadata.id == rule_set_id) else {
                        continue;
                    };
                    let candidates = preselect(&index, &entities, &rule_set.target_labels);
                    let report = coordinator.run_cycle(rule_set, &candidates, &cancel).await;
                    scheduler.record_evaluated(&rule_set_id, now);
                    if report.counts.applied > 0 {
                        scheduler.record_applied(&rule_set_id, now);
                    }
                    if let Err(e) = writer.append(&report) {
                        error!(run_id = %report.run_id, error = %e, "failed to persist run report");
                    }
                }
            }
            _ = revert_tick.tick() => {
                let transitions = reverts.tick(executor.as_ref()).await;
                if !transitions.is_empty() {
                    info!(count = transitions.len(), "revert transitions this tick");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, letting in-flight work finish");
                cancel.cancel();
                break;
            }
        }
    }

    info!("adpilot-worker exited cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use adpilot_core::EntityKind;

    use super::*;

    fn entity(id: &str, labels: &[&str]) -> Entity {
        Entity {
            id: id.to_string(),
            kind: EntityKind::Campaign,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            utc_offset_minutes: 0,
        }
    }

    #[test]
    fn preselect_keeps_only_labeled_entities() {
        let entities = vec![
            entity("c1", &["tier-1"]),
            entity("c2", &["tier-2"]),
            entity("c3", &["tier-1", "brand"]),
        ];
        let mut index = LabelIndex::new();
        index.rebuild(&entities);

        let targets: BTreeSet<LabelId> = ["tier-1".to_string()].into_iter().collect();
        let picked = preselect(&index, &entities, &targets);
        let ids: Vec<&str> = picked.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c3"]);
    }

    #[test]
    fn preselect_empty_targets_matches_nothing() {
        let entities = vec![entity("c1", &["tier-1"])];
        let mut index = LabelIndex::new();
        index.rebuild(&entities);
        assert!(preselect(&index, &entities, &BTreeSet::new()).is_empty());
    }
}
