//! Routing external entities to operators.
//!
//! For each entity: resolve recipients against the current focus snapshot,
//! skip recipients whose ledger slot is already taken, materialize tasks,
//! record each assignment together with its task, then notify. Failures are
//! isolated per recipient and reported in the [`RouteOutcome`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use jobroute_core::eligibility::{resolve, Routing};
use jobroute_core::entity::{CountryCode, EntityKey, EntityType, ExternalEntity};
use jobroute_core::focus::{active_countries, OperatorFocus};
use jobroute_core::types::{DbId, Timestamp};
use jobroute_db::models::assignment::CreateAssignment;
use serde::Serialize;

use crate::config::RoutingConfig;
use crate::error::PipelineError;
use crate::materializer::TaskMaterializer;
use crate::ports::{Ports, RunKind};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteOutcome {
    /// Operators the resolver selected.
    pub operators_matched: usize,
    /// New assignments recorded (each with its task).
    pub assigned: usize,
    /// Recipients that already held the entity.
    pub duplicates: usize,
    /// Recipients whose task could not be created.
    pub failed: usize,
    /// Nobody qualifies, or the entity is not routable.
    pub unassignable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RouteOutcome {
    fn unassignable() -> Self {
        Self {
            unassignable: true,
            ..Self::default()
        }
    }
}

/// Response to one job-post webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookOutcome {
    pub success: bool,
    pub message: String,
    pub stats: RouteOutcome,
}

/// Tally of a directory sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub entities: usize,
    pub assigned: usize,
    pub duplicates: usize,
    pub unassignable: usize,
    pub failed: usize,
    /// Another sync held the run lock; nothing was done.
    pub already_running: bool,
}

impl SyncSummary {
    fn absorb(&mut self, outcome: &RouteOutcome) {
        self.entities += 1;
        self.assigned += outcome.assigned;
        self.duplicates += outcome.duplicates;
        self.failed += outcome.failed;
        if outcome.unassignable {
            self.unassignable += 1;
        }
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.already_running {
            return f.write_str("Skipped: an assignment sync is already running");
        }
        write!(
            f,
            "Done! Entities: {}, Assigned: {}, Already assigned: {}, Unassignable: {}, Failed: {}",
            self.entities, self.assigned, self.duplicates, self.unassignable, self.failed
        )
    }
}

/// Optional filters for [`AssignmentPipeline::statistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub entity_type: Option<EntityType>,
    pub country_code: Option<CountryCode>,
}

/// Counters for one (entity type, country) bucket.
///
/// `assigned + unassigned == total` by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatRow {
    pub entity_type: EntityType,
    /// `None` groups entities with no country on record.
    pub country_code: Option<CountryCode>,
    pub total: u64,
    pub assigned: u64,
    pub unassigned: u64,
}

// ---------------------------------------------------------------------------
// AssignmentPipeline
// ---------------------------------------------------------------------------

pub struct AssignmentPipeline {
    ports: Ports,
    materializer: TaskMaterializer,
}

impl AssignmentPipeline {
    pub fn new(ports: Ports, config: RoutingConfig) -> Self {
        let materializer = TaskMaterializer::new(&ports, config);
        Self {
            ports,
            materializer,
        }
    }

    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Route one entity using a fresh focus snapshot.
    pub async fn route_entity(
        &self,
        entity: &ExternalEntity,
    ) -> Result<RouteOutcome, PipelineError> {
        let focus = self.ports.focus.snapshot().await?;
        self.route_with_focus(entity, &focus).await
    }

    /// Route one entity against an explicit focus snapshot.
    ///
    /// Only infrastructure failures before any recipient is attempted are
    /// returned as errors; per-recipient problems land in the outcome.
    pub async fn route_with_focus(
        &self,
        entity: &ExternalEntity,
        focus: &[OperatorFocus],
    ) -> Result<RouteOutcome, PipelineError> {
        let routing = resolve(entity, focus);
        let recipients = match &routing {
            Routing::Unassignable => {
                tracing::warn!(
                    entity_type = %entity.entity_type,
                    external_id = entity.id,
                    country = ?entity.country_code.as_ref().map(CountryCode::as_str),
                    routable = entity.is_routable(),
                    "No operator qualifies for entity"
                );
                return Ok(RouteOutcome::unassignable());
            }
            Routing::Single(_) | Routing::FanOut(_) => routing.operator_ids(),
        };

        let mut outcome = RouteOutcome {
            operators_matched: recipients.len(),
            ..RouteOutcome::default()
        };

        let key = entity.key();
        let mut pending = Vec::with_capacity(recipients.len());
        for &operator_id in &recipients {
            let taken = match entity.entity_type {
                EntityType::JobPost => {
                    self.ports.ledger.exists_for_operator(key, operator_id).await?
                }
                EntityType::JobSeeker | EntityType::Employer => {
                    self.ports.ledger.exists(key).await?
                }
            };
            if taken {
                outcome.duplicates += 1;
            } else {
                pending.push(operator_id);
            }
        }
        if pending.is_empty() {
            tracing::debug!(
                entity_type = %entity.entity_type,
                external_id = entity.id,
                "Entity already assigned"
            );
            return Ok(outcome);
        }

        let tasks = match self.materializer.prepare(entity, &pending).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!(
                    entity_type = %entity.entity_type,
                    external_id = entity.id,
                    error = %e,
                    "Failed to materialize tasks"
                );
                outcome.failed += pending.len();
                outcome.errors.push(e.to_string());
                return Ok(outcome);
            }
        };

        for (operator_id, task) in pending.into_iter().zip(tasks) {
            let input = CreateAssignment {
                operator_id,
                external_entity_id: entity.id,
                entity_type: entity.entity_type,
                country_code: entity.country_code.as_ref().map(|c| c.to_string()),
                auto_assigned: true,
            };
            match self.ports.ledger.record_with_task(&input, &task).await {
                Ok((assignment, task)) => {
                    tracing::info!(
                        entity_type = %entity.entity_type,
                        external_id = entity.id,
                        operator_id,
                        assignment_id = assignment.id,
                        task_id = task.id,
                        "Entity assigned"
                    );
                    self.ports.notifier.assignment_created(&assignment, &task);
                    outcome.assigned += 1;
                }
                Err(e) if e.is_duplicate() => {
                    tracing::warn!(
                        entity_type = %entity.entity_type,
                        external_id = entity.id,
                        operator_id,
                        "Concurrent delivery already assigned entity"
                    );
                    outcome.duplicates += 1;
                }
                Err(e) => {
                    tracing::error!(
                        entity_type = %entity.entity_type,
                        external_id = entity.id,
                        operator_id,
                        error = %e,
                        "Failed to record assignment"
                    );
                    outcome.failed += 1;
                    outcome.errors.push(e.to_string());
                }
            }
        }

        Ok(outcome)
    }

    /// Handle a "new job post" notification from the job board.
    ///
    /// The post is re-read from the directory; `country_hint` only fills in
    /// a country the directory lacks.
    pub async fn handle_job_post_webhook(
        &self,
        post_id: DbId,
        country_hint: Option<CountryCode>,
    ) -> Result<WebhookOutcome, PipelineError> {
        let key = EntityKey {
            external_id: post_id,
            entity_type: EntityType::JobPost,
        };
        let Some(mut post) = self.ports.directory.find_entity(key).await? else {
            tracing::warn!(post_id, "Webhook for unknown job post");
            return Ok(WebhookOutcome {
                success: false,
                message: format!("Job post {post_id} not found"),
                stats: RouteOutcome::default(),
            });
        };
        if post.country_code.is_none() {
            post.country_code = country_hint;
        }

        let stats = self.route_entity(&post).await?;
        let message = if !post.is_routable() {
            format!("Job post {post_id} is not verified or is archived")
        } else if stats.unassignable {
            format!("No operator shares job posts for job post {post_id}")
        } else {
            format!(
                "Job post {post_id}: {} assigned, {} already assigned, {} failed",
                stats.assigned, stats.duplicates, stats.failed
            )
        };

        Ok(WebhookOutcome {
            success: stats.failed == 0,
            message,
            stats,
        })
    }

    /// Route every routable entity created since `since`.
    ///
    /// Holds the `assignment_sync` run lock for the whole pass.
    pub async fn sync(&self, since: Timestamp) -> Result<SyncSummary, PipelineError> {
        let Some(lease) = self.ports.run_lock.try_acquire(RunKind::AssignmentSync).await? else {
            tracing::warn!("Assignment sync already running, skipping");
            return Ok(SyncSummary {
                already_running: true,
                ..SyncSummary::default()
            });
        };

        let result = self.sync_locked(since).await;
        if let Err(e) = lease.release().await {
            tracing::error!(error = %e, "Failed to release assignment sync lock");
        }
        result
    }

    async fn sync_locked(&self, since: Timestamp) -> Result<SyncSummary, PipelineError> {
        let focus = self.ports.focus.snapshot().await?;
        let mut summary = SyncSummary::default();

        for entity_type in EntityType::ALL {
            let entities = self.ports.directory.routable_since(entity_type, since).await?;
            for entity in &entities {
                match self.route_with_focus(entity, &focus).await {
                    Ok(outcome) => summary.absorb(&outcome),
                    Err(e) => {
                        tracing::error!(
                            entity_type = %entity_type,
                            external_id = entity.id,
                            error = %e,
                            "Failed to route entity"
                        );
                        summary.entities += 1;
                        summary.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            entities = summary.entities,
            assigned = summary.assigned,
            duplicates = summary.duplicates,
            unassignable = summary.unassignable,
            failed = summary.failed,
            "Assignment sync finished"
        );
        Ok(summary)
    }

    /// Countries with at least one operator accepting some entity type.
    pub async fn active_countries(&self) -> Result<Vec<CountryCode>, PipelineError> {
        let focus = self.ports.focus.snapshot().await?;
        Ok(active_countries(&focus).into_iter().collect())
    }

    /// Assigned/unassigned counters per entity type and country.
    pub async fn statistics(&self, filter: &StatsFilter) -> Result<Vec<StatRow>, PipelineError> {
        let types: Vec<EntityType> = match filter.entity_type {
            Some(t) => vec![t],
            None => EntityType::ALL.to_vec(),
        };

        let mut rows = Vec::new();
        for entity_type in types {
            let keys = self
                .ports
                .directory
                .routable_keys(entity_type, filter.country_code.as_ref())
                .await?;
            let ids: Vec<DbId> = keys.iter().map(|k| k.id).collect();
            let assigned = self.ports.ledger.assigned_ids_among(entity_type, &ids).await?;

            let mut buckets: BTreeMap<Option<CountryCode>, (u64, u64)> = BTreeMap::new();
            for key in keys {
                let bucket = buckets.entry(key.country_code).or_default();
                bucket.0 += 1;
                if assigned.contains(&key.id) {
                    bucket.1 += 1;
                }
            }
            rows.extend(buckets.into_iter().map(|(country_code, (total, assigned))| StatRow {
                entity_type,
                country_code,
                total,
                assigned,
                unassigned: total - assigned,
            }));
        }
        Ok(rows)
    }
}

/// Shared handle used by the HTTP layer and the worker.
pub type SharedPipeline = Arc<AssignmentPipeline>;
