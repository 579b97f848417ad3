//! Task Materializer: turns a routing decision into operator tasks.
//!
//! Work is split in two so the ledger write can span task creation:
//! [`TaskMaterializer::prepare`] talks to the collaborators (task board,
//! directory, shortener) and yields ready-to-insert [`NewTask`]s; the ledger
//! then creates each task and its assignment in one unit.

use std::sync::Arc;

use jobroute_core::entity::{EntityType, ExternalEntity};
use jobroute_core::error::CoreError;
use jobroute_core::labels::{LABEL_EMPLOYER, LABEL_JOB_SEEKER, LABEL_JOB_SHARE, LABEL_NOT_STARTED};
use jobroute_core::social::format_job_post;
use jobroute_core::task::{NewTask, Task};
use jobroute_core::types::DbId;
use jobroute_db::models::assignment::{Assignment, CreateAssignment};
use serde_json::{json, Map, Value};

use crate::config::RoutingConfig;
use crate::error::PipelineError;
use crate::ports::{AssignmentLedger, Directory, Ports, TaskBoard, UrlShortener};

/// Re-label a collaborator failure as `MaterializationFailed`, keeping
/// failures that already are.
fn collaborator_failure(context: &str, err: PipelineError) -> PipelineError {
    match err {
        PipelineError::Core(CoreError::MaterializationFailed(_)) => err,
        other => PipelineError::materialization(format!("{context}: {other}")),
    }
}

/// Title of the task created for `entity`.
pub fn task_title(entity: &ExternalEntity) -> String {
    match entity.entity_type {
        EntityType::JobSeeker | EntityType::Employer => format!(
            "Follow up with {}: {}",
            entity.entity_type.label(),
            entity.display_name.trim()
        ),
        EntityType::JobPost => format!("Share job post: {}", entity.display_name.trim()),
    }
}

fn entity_label(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::JobSeeker => LABEL_JOB_SEEKER,
        EntityType::Employer => LABEL_EMPLOYER,
        EntityType::JobPost => LABEL_JOB_SHARE,
    }
}

pub struct TaskMaterializer {
    board: Arc<dyn TaskBoard>,
    directory: Arc<dyn Directory>,
    shortener: Arc<dyn UrlShortener>,
    ledger: Arc<dyn AssignmentLedger>,
    config: RoutingConfig,
}

impl TaskMaterializer {
    pub fn new(ports: &Ports, config: RoutingConfig) -> Self {
        Self {
            board: Arc::clone(&ports.board),
            directory: Arc::clone(&ports.directory),
            shortener: Arc::clone(&ports.shortener),
            ledger: Arc::clone(&ports.ledger),
            config,
        }
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Build one task per recipient for `entity`.
    ///
    /// For a job post the social copy, and therefore the short URL, is
    /// computed once and shared by every recipient's task.
    pub async fn prepare(
        &self,
        entity: &ExternalEntity,
        recipients: &[DbId],
    ) -> Result<Vec<NewTask>, PipelineError> {
        if recipients.is_empty() {
            return Ok(Vec::new());
        }

        let list_id = self.config.list_for(entity.entity_type).ok_or_else(|| {
            PipelineError::materialization(format!(
                "no task list configured for {}",
                entity.entity_type
            ))
        })?;
        let list_found = self
            .board
            .list_exists(list_id)
            .await
            .map_err(|e| collaborator_failure("task list lookup", e))?;
        if !list_found {
            return Err(PipelineError::materialization(format!(
                "task list {list_id} does not exist"
            )));
        }

        let mut meta = Map::new();
        meta.insert("entity_type".into(), json!(entity.entity_type));
        meta.insert("external_entity_id".into(), json!(entity.id));

        let description = match entity.entity_type {
            EntityType::JobSeeker | EntityType::Employer => {
                let country = entity
                    .country_code
                    .as_ref()
                    .map_or("an unknown country", |cc| cc.as_str());
                format!(
                    "{} {} (#{}) from {} was assigned to you automatically.",
                    entity.entity_type.label(),
                    entity.display_name.trim(),
                    entity.id,
                    country
                )
            }
            EntityType::JobPost => {
                let details = self
                    .directory
                    .job_post_details(entity.id)
                    .await
                    .map_err(|e| collaborator_failure("job post lookup", e))?
                    .ok_or_else(|| {
                        PipelineError::materialization(format!(
                            "job post {} has no details in the directory",
                            entity.id
                        ))
                    })?;
                let apply_url = self.config.apply_url(details.post_id, details.slug.as_deref());
                let code = self
                    .shortener
                    .shorten(&apply_url)
                    .await
                    .map_err(|e| collaborator_failure("url shortener", e))?;
                let short_url = self.config.short_url(&code);
                meta.insert("apply_url".into(), Value::String(apply_url));
                meta.insert("short_url".into(), Value::String(short_url.clone()));
                format_job_post(&details, entity.country_code.as_ref(), &short_url)
            }
        };

        let title = task_title(entity);
        let labels = vec![
            LABEL_NOT_STARTED.to_string(),
            entity_label(entity.entity_type).to_string(),
        ];

        Ok(recipients
            .iter()
            .map(|&operator_id| NewTask {
                list_id,
                title: title.clone(),
                description: description.clone(),
                assignees: vec![operator_id],
                labels: labels.clone(),
                meta: meta.clone(),
                recurring_at: None,
            })
            .collect())
    }

    /// Create the task for a single assignment and record both.
    ///
    /// Nothing is written when preparation fails, and a taken ledger slot
    /// surfaces as `DuplicateAssignment` with no task left behind.
    pub async fn materialize(
        &self,
        input: &CreateAssignment,
        entity: &ExternalEntity,
    ) -> Result<(Assignment, Task), PipelineError> {
        let task = self
            .prepare(entity, &[input.operator_id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::materialization("no task prepared"))?;
        self.ledger.record_with_task(input, &task).await
    }
}
