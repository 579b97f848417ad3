//! PostgreSQL-backed ports.
//!
//! The directory reads from its own pool (`DIRECTORY_DATABASE_URL`); every
//! other adapter uses the internal store.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use jobroute_core::clock::Clock;
use jobroute_core::entity::{CountryCode, EntityKey, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::error::CoreError;
use jobroute_core::focus::OperatorFocus;
use jobroute_core::task::{CompletionRecord, NewTask, Task};
use jobroute_core::types::{DbId, Timestamp};
use jobroute_db::models::assignment::{Assignment, CreateAssignment};
use jobroute_db::repositories::run_lock_repo::{ASSIGNMENT_SYNC_LOCK, RECURRENCE_SCAN_LOCK};
use jobroute_db::repositories::{
    AssignmentRepo, DirectoryRepo, OperatorFocusRepo, RunLockRepo, ShortLinkRepo,
    TaskCompletionRepo, TaskListRepo, TaskRepo,
};
use jobroute_db::DbPool;
use jobroute_events::NotificationDispatcher;
use rand::Rng;
use sqlx::{Postgres, Transaction};

use crate::error::PipelineError;
use crate::ports::{
    AssignmentLedger, Directory, FocusSource, LeaseGuard, PortResult, Ports, RoutableKey, RunKind,
    RunLease, RunLock, TaskBoard, TaskStore, UrlShortener,
};

/// Wire every port to PostgreSQL.
pub fn postgres_ports(
    pool: DbPool,
    directory_pool: DbPool,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
) -> Ports {
    Ports {
        directory: Arc::new(PgDirectory::new(directory_pool)),
        ledger: Arc::new(PgAssignmentLedger::new(pool.clone())),
        tasks: Arc::new(PgTaskStore::new(pool.clone())),
        focus: Arc::new(PgFocusSource::new(pool.clone())),
        board: Arc::new(PgTaskBoard::new(pool.clone())),
        shortener: Arc::new(PgUrlShortener::new(pool.clone())),
        run_lock: Arc::new(PgRunLock::new(pool)),
        notifier,
        clock,
    }
}

fn duplicate(input: &CreateAssignment) -> PipelineError {
    CoreError::DuplicateAssignment {
        entity_type: input.entity_type,
        external_id: input.external_entity_id,
    }
    .into()
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_entity(&self, key: EntityKey) -> PortResult<Option<ExternalEntity>> {
        let entity = match key.entity_type {
            EntityType::JobPost => DirectoryRepo::find_post(&self.pool, key.external_id)
                .await?
                .map(|p| p.to_entity()),
            kind => DirectoryRepo::find_user(&self.pool, kind, key.external_id)
                .await?
                .map(|u| u.to_entity()),
        };
        Ok(entity)
    }

    async fn job_post_details(&self, post_id: DbId) -> PortResult<Option<JobPostDetails>> {
        Ok(DirectoryRepo::find_post(&self.pool, post_id)
            .await?
            .map(|p| p.to_details()))
    }

    async fn routable_since(
        &self,
        entity_type: EntityType,
        since: Timestamp,
    ) -> PortResult<Vec<ExternalEntity>> {
        let entities = match entity_type {
            EntityType::JobPost => DirectoryRepo::list_routable_posts_since(&self.pool, since)
                .await?
                .into_iter()
                .map(|p| p.to_entity())
                .collect(),
            kind => DirectoryRepo::list_routable_users_since(&self.pool, kind, since)
                .await?
                .into_iter()
                .map(|u| u.to_entity())
                .collect(),
        };
        Ok(entities)
    }

    async fn routable_keys(
        &self,
        entity_type: EntityType,
        country: Option<&CountryCode>,
    ) -> PortResult<Vec<RoutableKey>> {
        let rows = DirectoryRepo::list_routable_keys(&self.pool, entity_type, country).await?;
        Ok(rows
            .into_iter()
            .map(|row| RoutableKey {
                id: row.id,
                country_code: row
                    .country_code
                    .as_deref()
                    .and_then(|raw| CountryCode::parse(raw).ok()),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Assignment ledger
// ---------------------------------------------------------------------------

pub struct PgAssignmentLedger {
    pool: DbPool,
}

impl PgAssignmentLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssignmentLedger for PgAssignmentLedger {
    async fn exists(&self, key: EntityKey) -> PortResult<bool> {
        Ok(AssignmentRepo::exists(&self.pool, key).await?)
    }

    async fn exists_for_operator(&self, key: EntityKey, operator_id: DbId) -> PortResult<bool> {
        Ok(AssignmentRepo::exists_for_operator(&self.pool, key, operator_id).await?)
    }

    async fn record(&self, input: &CreateAssignment) -> PortResult<Assignment> {
        let mut conn = self.pool.acquire().await?;
        AssignmentRepo::insert_if_absent(&mut conn, input)
            .await?
            .ok_or_else(|| duplicate(input))
    }

    async fn record_with_task(
        &self,
        input: &CreateAssignment,
        task: &NewTask,
    ) -> PortResult<(Assignment, Task)> {
        let mut tx = self.pool.begin().await?;

        let Some(assignment) = AssignmentRepo::insert_if_absent(&mut tx, input).await? else {
            tx.rollback().await?;
            return Err(duplicate(input));
        };

        let row = match TaskRepo::insert(&mut tx, task).await {
            Ok(row) => row,
            Err(e) => {
                tx.rollback().await?;
                return Err(PipelineError::materialization(format!(
                    "task insert into list {} failed: {e}",
                    task.list_id
                )));
            }
        };
        let assignment = AssignmentRepo::set_task_id(&mut tx, assignment.id, row.id).await?;
        tx.commit().await?;

        Ok((assignment, row.into_task()))
    }

    async fn assigned_ids_among(
        &self,
        entity_type: EntityType,
        ids: &[DbId],
    ) -> PortResult<HashSet<DbId>> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        let assigned = AssignmentRepo::assigned_ids_among(&self.pool, entity_type, ids).await?;
        Ok(assigned.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Task store
// ---------------------------------------------------------------------------

pub struct PgTaskStore {
    pool: DbPool,
}

impl PgTaskStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn due_task_ids(&self, cutoff: Timestamp) -> PortResult<Vec<DbId>> {
        Ok(TaskRepo::due_recurring_ids(&self.pool, cutoff).await?)
    }

    async fn load(&self, id: DbId) -> PortResult<Option<Task>> {
        Ok(TaskRepo::find_by_id(&self.pool, id)
            .await?
            .map(|row| row.into_task()))
    }

    async fn apply_transition(
        &self,
        task: &Task,
        expected_recurring_at: Timestamp,
        history: Option<&CompletionRecord>,
    ) -> PortResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The guarded update goes first so a run that lost the race writes
        // no history.
        if !TaskRepo::apply_recurrence(&mut tx, task, expected_recurring_at).await? {
            tx.rollback().await?;
            return Ok(false);
        }
        if let Some(record) = history {
            TaskCompletionRepo::insert(&mut tx, record).await?;
        }
        tx.commit().await?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Focus and board
// ---------------------------------------------------------------------------

pub struct PgFocusSource {
    pool: DbPool,
}

impl PgFocusSource {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FocusSource for PgFocusSource {
    async fn snapshot(&self) -> PortResult<Vec<OperatorFocus>> {
        let rows = OperatorFocusRepo::list_all(&self.pool).await?;
        Ok(rows.into_iter().map(|row| row.into_focus()).collect())
    }
}

pub struct PgTaskBoard {
    pool: DbPool,
}

impl PgTaskBoard {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskBoard for PgTaskBoard {
    async fn list_exists(&self, list_id: DbId) -> PortResult<bool> {
        Ok(TaskListRepo::exists(&self.pool, list_id).await?)
    }
}

// ---------------------------------------------------------------------------
// URL shortener
// ---------------------------------------------------------------------------

const SHORT_CODE_LEN: usize = 7;
const SHORT_CODE_ATTEMPTS: usize = 5;

/// Short links stored in `short_links`, with random alphanumeric codes.
pub struct PgUrlShortener {
    pool: DbPool,
}

impl PgUrlShortener {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn random_code() -> String {
        rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(SHORT_CODE_LEN)
            .map(char::from)
            .collect()
    }
}

fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl UrlShortener for PgUrlShortener {
    async fn shorten(&self, long_url: &str) -> PortResult<String> {
        if let Some(link) = ShortLinkRepo::find_by_url(&self.pool, long_url).await? {
            return Ok(link.code);
        }

        for _ in 0..SHORT_CODE_ATTEMPTS {
            let code = Self::random_code();
            match ShortLinkRepo::insert(&self.pool, &code, long_url).await {
                Ok(link) => return Ok(link.code),
                Err(e) => match violated_constraint(&e).as_deref() {
                    // Someone else shortened the same URL concurrently.
                    Some("uq_short_links_long_url") => {
                        if let Some(link) =
                            ShortLinkRepo::find_by_url(&self.pool, long_url).await?
                        {
                            return Ok(link.code);
                        }
                    }
                    Some(_) => continue,
                    None => return Err(e.into()),
                },
            }
        }

        Err(PipelineError::materialization(format!(
            "could not mint a unique short code for {long_url}"
        )))
    }

    async fn resolve(&self, code: &str) -> PortResult<Option<String>> {
        Ok(ShortLinkRepo::resolve(&self.pool, code)
            .await?
            .map(|link| link.long_url))
    }
}

// ---------------------------------------------------------------------------
// Run lock
// ---------------------------------------------------------------------------

fn advisory_key(kind: RunKind) -> i64 {
    match kind {
        RunKind::RecurringTasks => RECURRENCE_SCAN_LOCK,
        RunKind::AssignmentSync => ASSIGNMENT_SYNC_LOCK,
    }
}

/// Advisory-lock based run lock; holds across every process sharing the
/// database.
pub struct PgRunLock {
    pool: DbPool,
}

impl PgRunLock {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgLease {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LeaseGuard for PgLease {
    async fn release(self: Box<Self>) -> PortResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl RunLock for PgRunLock {
    async fn try_acquire(&self, kind: RunKind) -> PortResult<Option<RunLease>> {
        let lease = RunLockRepo::try_lock(&self.pool, advisory_key(kind))
            .await?
            .map(|tx| RunLease::new(kind, Box::new(PgLease { tx })));
        Ok(lease)
    }
}
