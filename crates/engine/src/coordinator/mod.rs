//! Execution coordination: the bounded-concurrency evaluation cycle.
//!
//! One `run_cycle` call processes one rule set against a batch of entities:
//! fetch each entity's snapshot, decide, apply non-blocked actions, hand
//! auto-revert TurnOffs to the revert scheduler, and record every entity's
//! outcome in a [`RunReport`]. Partial failure is the normal case; one
//! entity's error never aborts the batch.

mod cancel;
mod report;
mod retry;

use std::sync::Arc;

use adpilot_core::{Entity, ExecutionConfig};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::evaluator::PolicyEngine;
use crate::external::{ActionExecutor, Clock, MetricsProvider};
use crate::revert::RevertScheduler;
use crate::schema::RuleSet;

use retry::with_retries;

pub use cancel::CancelToken;
pub use report::{EntityOutcome, EntityReport, RunCounts, RunReport};


/// Drives evaluation cycles against the external collaborators.
pub struct ExecutionCoordinator {
    metrics: Arc<dyn MetricsProvider>,
    executor: Arc<dyn ActionExecutor>,
    reverts: Arc<RevertScheduler>,
    clock: Arc<dyn Clock>,
    engine: PolicyEngine,
    config: ExecutionConfig,
}

impl ExecutionCoordinator {
    pub fn new(
        metrics: Arc<dyn MetricsProvider>,
        executor: Arc<dyn ActionExecutor>,
        reverts: Arc<RevertScheduler>,
        clock: Arc<dyn Clock>,
        engine: PolicyEngine,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            metrics,
            executor,
            reverts,
            clock,
            engine,
            config,
        }
    }

    /// Evaluate one rule set against a batch of entities.
    ///
    /// Entities outside the rule set's scope or targeting are excluded
    /// before the worker pool. Per-entity work runs under a semaphore of
    /// `config.worker_count` permits to respect the platform's rate limits.
    /// Entity completion order is unspecified; the report preserves the
    /// input order of the in-scope entities.
    pub async fn run_cycle(
        &self,
        rule_set: &RuleSet,
        entities: &[Entity],
        cancel: &CancelToken,
    ) -> RunReport {
        let started_at = self.clock.now();
        let mut run = RunReport::new(&rule_set.metadata.id, started_at);

        if !rule_set.metadata.enabled {
            run.finished_at = self.clock.now();
            return run;
        }

        let in_scope: Vec<&Entity> = entities.iter().filter(|e| rule_set.covers(e)).collect();
        info!(
            rule_set_id = %rule_set.metadata.id,
            run_id = %run.run_id,
            total = entities.len(),
            in_scope = in_scope.len(),
            "starting evaluation cycle"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.worker_count.max(1)));
        let tasks = in_scope.into_iter().map(|entity| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return self.skipped(entity),
                };
                if cancel.is_cancelled() {
                    return self.skipped(entity);
                }
                self.process_entity(rule_set, entity).await
            }
        });

        for entry in join_all(tasks).await {
            run.push(entry);
        }

        run.finished_at = self.clock.now();
        info!(
            rule_set_id = %rule_set.metadata.id,
            run_id = %run.run_id,
            applied = run.counts.applied,
            blocked = run.counts.blocked,
            no_match = run.counts.no_match,
            skipped = run.counts.skipped,
            failed = run.counts.failed,
            "cycle finished"
        );
        run
    }

    fn skipped(&self, entity: &Entity) -> EntityReport {
        EntityReport {
            entity_id: entity.id.clone(),
            outcome: EntityOutcome::Skipped,
            decisions: Vec::new(),
            error: None,
            timestamp: self.clock.now(),
        }
    }

    /// Full per-entity pipeline: fetch, decide, apply, schedule reverts.
    async fn process_entity(&self, rule_set: &RuleSet, entity: &Entity) -> EntityReport {
        let snapshot = match with_retries(&self.config, "snapshot", || {
            self.metrics.snapshot(&entity.id, rule_set.time_range)
        })
        .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(entity_id = %entity.id, error = %e, "snapshot fetch failed");
                return EntityReport {
                    entity_id: entity.id.clone(),
                    outcome: EntityOutcome::Failed,
                    decisions: Vec::new(),
                    error: Some(format!("snapshot fetch: {}", e)),
                    timestamp: self.clock.now(),
                };
            }
        };

        let decisions = self.engine.decide(rule_set, entity, &snapshot);
        if decisions.is_empty() {
            return EntityReport {
                entity_id: entity.id.clone(),
                outcome: EntityOutcome::NoMatch,
                decisions,
                error: None,
                timestamp: self.clock.now(),
            };
        }

        let mut applied_any = false;
        let mut last_error: Option<String> = None;

        for decision in decisions.iter().filter(|d| !d.is_blocked()) {
            match with_retries(&self.config, "apply", || {
                self.executor.apply(&entity.id, &decision.action)
            })
            .await
            {
                Ok(outcome) => {
                    applied_any = true;
                    info!(
                        entity_id = %entity.id,
                        rule_id = %decision.rule_id,
                        action = %decision.action.kind(),
                        "action applied"
                    );
                    if let Some(spec) = decision.action.revert_spec().filter(|s| s.enabled) {
                        let state = crate::external::OriginalState {
                            delivery: outcome.prior_delivery,
                            captured_at: self.clock.now(),
                        };
                        if let Err(e) = self
                            .reverts
                            .schedule(
                                &entity.id,
                                decision.action.kind(),
                                state,
                                &spec.at,
                                entity.utc_offset_minutes,
                            )
                            .await
                        {
                            warn!(entity_id = %entity.id, error = %e, "failed to schedule revert");
                            last_error = Some(format!("revert scheduling: {}", e));
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        entity_id = %entity.id,
                        rule_id = %decision.rule_id,
                        error = %e,
                        "action application failed"
                    );
                    last_error = Some(format!("apply {}: {}", decision.action.kind(), e));
                }
            }
        }

        let outcome = if last_error.is_some() {
            EntityOutcome::Failed
        } else if applied_any {
            EntityOutcome::Applied
        } else {
            // Every decision was blocked by overrides.
            EntityOutcome::Blocked
        };

        EntityReport {
            entity_id: entity.id.clone(),
            outcome,
            decisions,
            error: last_error,
            timestamp: self.clock.now(),
        }
    }
}
