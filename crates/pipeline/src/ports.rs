//! Capabilities the pipeline depends on.
//!
//! Every trait is object-safe and held as `Arc<dyn ...>` in [`Ports`], so the
//! same pipeline runs against PostgreSQL in production and against
//! [`crate::adapters::memory`] in tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use jobroute_core::clock::Clock;
use jobroute_core::entity::{CountryCode, EntityKey, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::focus::OperatorFocus;
use jobroute_core::task::{CompletionRecord, NewTask, Task};
use jobroute_core::types::{DbId, Timestamp};
use jobroute_db::models::assignment::{Assignment, CreateAssignment};
use jobroute_events::NotificationDispatcher;

use crate::error::PipelineError;

pub type PortResult<T> = Result<T, PipelineError>;

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// Id and country of a routable directory entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutableKey {
    pub id: DbId,
    pub country_code: Option<CountryCode>,
}

/// Read-only view of the external job-board directory.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_entity(&self, key: EntityKey) -> PortResult<Option<ExternalEntity>>;

    async fn job_post_details(&self, post_id: DbId) -> PortResult<Option<JobPostDetails>>;

    /// Routable entities of one type created at or after `since`.
    async fn routable_since(
        &self,
        entity_type: EntityType,
        since: Timestamp,
    ) -> PortResult<Vec<ExternalEntity>>;

    /// Every routable entity of one type, optionally in one country.
    async fn routable_keys(
        &self,
        entity_type: EntityType,
        country: Option<&CountryCode>,
    ) -> PortResult<Vec<RoutableKey>>;
}

// ---------------------------------------------------------------------------
// Assignment ledger
// ---------------------------------------------------------------------------

/// The authoritative record of who received what.
///
/// Users occupy one slot per entity; job posts one slot per entity and
/// operator. Both `record` methods are atomic check-and-insert operations
/// and fail with `CoreError::DuplicateAssignment` when the slot is taken.
#[async_trait]
pub trait AssignmentLedger: Send + Sync {
    async fn exists(&self, key: EntityKey) -> PortResult<bool>;

    async fn exists_for_operator(&self, key: EntityKey, operator_id: DbId) -> PortResult<bool>;

    /// Record an assignment without a task.
    async fn record(&self, input: &CreateAssignment) -> PortResult<Assignment>;

    /// Create `task` and record `input` pointing at it, as one unit.
    async fn record_with_task(
        &self,
        input: &CreateAssignment,
        task: &NewTask,
    ) -> PortResult<(Assignment, Task)>;

    /// Which of `ids` have at least one assignment.
    async fn assigned_ids_among(
        &self,
        entity_type: EntityType,
        ids: &[DbId],
    ) -> PortResult<HashSet<DbId>>;
}

// ---------------------------------------------------------------------------
// Task store
// ---------------------------------------------------------------------------

/// Task access needed by the recurrence scan.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Recurring tasks with `recurring_at < cutoff`.
    async fn due_task_ids(&self, cutoff: Timestamp) -> PortResult<Vec<DbId>>;

    async fn load(&self, id: DbId) -> PortResult<Option<Task>>;

    /// Persist an evaluated task and its history entry together.
    ///
    /// Applies only if the stored `recurring_at` still equals
    /// `expected_recurring_at`; returns `false` otherwise.
    async fn apply_transition(
        &self,
        task: &Task,
        expected_recurring_at: Timestamp,
        history: Option<&CompletionRecord>,
    ) -> PortResult<bool>;
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Current operator focus configuration.
#[async_trait]
pub trait FocusSource: Send + Sync {
    async fn snapshot(&self) -> PortResult<Vec<OperatorFocus>>;
}

/// Project/list side of the task board.
#[async_trait]
pub trait TaskBoard: Send + Sync {
    async fn list_exists(&self, list_id: DbId) -> PortResult<bool>;
}

/// Turns a long URL into a short code. The same URL always yields the same
/// code.
#[async_trait]
pub trait UrlShortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> PortResult<String>;

    /// Long URL behind `code`, if the code was ever minted.
    async fn resolve(&self, code: &str) -> PortResult<Option<String>>;
}

// ---------------------------------------------------------------------------
// Run lock
// ---------------------------------------------------------------------------

/// Batch jobs that must never run twice at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    RecurringTasks,
    AssignmentSync,
}

impl RunKind {
    pub fn name(self) -> &'static str {
        match self {
            RunKind::RecurringTasks => "recurring_tasks",
            RunKind::AssignmentSync => "assignment_sync",
        }
    }
}

/// Adapter-specific state that keeps a lease alive.
#[async_trait]
pub trait LeaseGuard: Send {
    async fn release(self: Box<Self>) -> PortResult<()>;
}

/// Proof that the caller is the single active run of its kind. Dropping it
/// also releases the lock; [`RunLease::release`] does so eagerly.
pub struct RunLease {
    kind: RunKind,
    guard: Box<dyn LeaseGuard>,
}

impl RunLease {
    pub fn new(kind: RunKind, guard: Box<dyn LeaseGuard>) -> Self {
        Self { kind, guard }
    }

    pub fn kind(&self) -> RunKind {
        self.kind
    }

    pub async fn release(self) -> PortResult<()> {
        self.guard.release().await
    }
}

#[async_trait]
pub trait RunLock: Send + Sync {
    /// Take the lock for `kind`, or `None` if another run holds it.
    async fn try_acquire(&self, kind: RunKind) -> PortResult<Option<RunLease>>;
}

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Everything the pipeline and the scanner are wired to.
#[derive(Clone)]
pub struct Ports {
    pub directory: Arc<dyn Directory>,
    pub ledger: Arc<dyn AssignmentLedger>,
    pub tasks: Arc<dyn TaskStore>,
    pub focus: Arc<dyn FocusSource>,
    pub board: Arc<dyn TaskBoard>,
    pub shortener: Arc<dyn UrlShortener>,
    pub run_lock: Arc<dyn RunLock>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}
