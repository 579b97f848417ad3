//! In-process ports.
//!
//! [`MemoryStore`] implements every port over one mutex-guarded state, so a
//! whole pipeline can run without a database. The ledger keeps the same
//! uniqueness rules as the partial unique indexes on `assignments`, and
//! check-and-insert happens under a single lock acquisition.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use jobroute_core::clock::Clock;
use jobroute_core::entity::{CountryCode, EntityKey, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::error::CoreError;
use jobroute_core::focus::OperatorFocus;
use jobroute_core::task::{CompletionRecord, NewTask, Task};
use jobroute_core::types::{DbId, Timestamp};
use jobroute_db::models::assignment::{Assignment, CreateAssignment};
use jobroute_events::NotificationDispatcher;

use crate::error::PipelineError;
use crate::ports::{
    AssignmentLedger, Directory, FocusSource, LeaseGuard, PortResult, Ports, RoutableKey, RunKind,
    RunLease, RunLock, TaskBoard, TaskStore, UrlShortener,
};

#[derive(Default)]
struct State {
    entities: HashMap<EntityKey, ExternalEntity>,
    post_details: HashMap<DbId, JobPostDetails>,
    focus: Vec<OperatorFocus>,
    lists: HashSet<DbId>,
    assignments: Vec<Assignment>,
    tasks: BTreeMap<DbId, Task>,
    completions: Vec<CompletionRecord>,
    short_codes: HashMap<String, String>,
    shorten_calls: usize,
    failing_operators: HashSet<DbId>,
    shortener_down: bool,
    unavailable: bool,
    next_assignment_id: DbId,
    next_task_id: DbId,
}

impl State {
    fn check_available(&self) -> PortResult<()> {
        if self.unavailable {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }

    fn slot_taken(&self, input: &CreateAssignment) -> bool {
        let key = input.entity_key();
        self.assignments.iter().any(|a| {
            a.entity_key() == key
                && (!key.entity_type.fans_out() || a.operator_id == input.operator_id)
        })
    }

    fn push_assignment(&mut self, input: &CreateAssignment, task_id: Option<DbId>) -> Assignment {
        self.next_assignment_id += 1;
        let assignment = Assignment {
            id: self.next_assignment_id,
            operator_id: input.operator_id,
            external_entity_id: input.external_entity_id,
            entity_type: input.entity_type,
            country_code: input.country_code.clone(),
            auto_assigned: input.auto_assigned,
            task_id,
            created_at: Utc::now(),
        };
        self.assignments.push(assignment.clone());
        assignment
    }

    fn push_task(&mut self, input: &NewTask) -> Task {
        self.next_task_id += 1;
        let task = Task {
            id: self.next_task_id,
            list_id: input.list_id,
            title: input.title.clone(),
            description: input.description.clone(),
            assignees: input.assignees.clone(),
            labels: input.labels.clone(),
            meta: input.meta.clone(),
            completed_at: None,
            recurring_at: input.recurring_at,
            total_seconds: 0,
            checklist_items: Vec::new(),
            created_at: Utc::now(),
        };
        self.tasks.insert(task.id, task.clone());
        task
    }
}

/// Every port over shared in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    running: Arc<Mutex<HashSet<RunKind>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Build a [`Ports`] bundle where every storage port is this store.
    pub fn ports(
        self: &Arc<Self>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Ports {
        Ports {
            directory: self.clone(),
            ledger: self.clone(),
            tasks: self.clone(),
            focus: self.clone(),
            board: self.clone(),
            shortener: self.clone(),
            run_lock: self.clone(),
            notifier,
            clock,
        }
    }

    // -- seeding -------------------------------------------------------------

    pub fn add_entity(&self, entity: ExternalEntity) {
        self.state().entities.insert(entity.key(), entity);
    }

    pub fn add_job_post(&self, entity: ExternalEntity, details: JobPostDetails) {
        let mut state = self.state();
        state.post_details.insert(entity.id, details);
        state.entities.insert(entity.key(), entity);
    }

    pub fn add_list(&self, list_id: DbId) {
        self.state().lists.insert(list_id);
    }

    pub fn set_focus(&self, focus: Vec<OperatorFocus>) {
        self.state().focus = focus;
    }

    /// Create a task directly, bypassing the ledger.
    pub fn insert_task(&self, input: &NewTask) -> Task {
        self.state().push_task(input)
    }

    /// Overwrite a stored task.
    pub fn put_task(&self, task: Task) {
        self.state().tasks.insert(task.id, task);
    }

    // -- failure injection ---------------------------------------------------

    /// Make task creation fail for tasks assigned to `operator_id`.
    pub fn fail_tasks_for_operator(&self, operator_id: DbId) {
        self.state().failing_operators.insert(operator_id);
    }

    pub fn set_shortener_down(&self, down: bool) {
        self.state().shortener_down = down;
    }

    /// Make directory, focus and ledger reads fail as if the database were
    /// unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    // -- inspection ----------------------------------------------------------

    pub fn assignments(&self) -> Vec<Assignment> {
        self.state().assignments.clone()
    }

    pub fn task(&self, id: DbId) -> Option<Task> {
        self.state().tasks.get(&id).cloned()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.values().cloned().collect()
    }

    pub fn completions(&self) -> Vec<CompletionRecord> {
        self.state().completions.clone()
    }

    pub fn shorten_calls(&self) -> usize {
        self.state().shorten_calls
    }

    pub fn is_running(&self, kind: RunKind) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&kind)
    }
}

// ---------------------------------------------------------------------------
// Port implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl Directory for MemoryStore {
    async fn find_entity(&self, key: EntityKey) -> PortResult<Option<ExternalEntity>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.entities.get(&key).cloned())
    }

    async fn job_post_details(&self, post_id: DbId) -> PortResult<Option<JobPostDetails>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.post_details.get(&post_id).cloned())
    }

    async fn routable_since(
        &self,
        entity_type: EntityType,
        since: Timestamp,
    ) -> PortResult<Vec<ExternalEntity>> {
        let state = self.state();
        state.check_available()?;
        let mut found: Vec<ExternalEntity> = state
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type && e.is_routable() && e.created_at >= since)
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.created_at, e.id));
        Ok(found)
    }

    async fn routable_keys(
        &self,
        entity_type: EntityType,
        country: Option<&CountryCode>,
    ) -> PortResult<Vec<RoutableKey>> {
        let state = self.state();
        state.check_available()?;
        let mut keys: Vec<RoutableKey> = state
            .entities
            .values()
            .filter(|e| e.entity_type == entity_type && e.is_routable())
            .filter(|e| country.is_none() || e.country_code.as_ref() == country)
            .map(|e| RoutableKey {
                id: e.id,
                country_code: e.country_code.clone(),
            })
            .collect();
        keys.sort_by_key(|k| k.id);
        Ok(keys)
    }
}

#[async_trait]
impl AssignmentLedger for MemoryStore {
    async fn exists(&self, key: EntityKey) -> PortResult<bool> {
        let state = self.state();
        state.check_available()?;
        Ok(state.assignments.iter().any(|a| a.entity_key() == key))
    }

    async fn exists_for_operator(&self, key: EntityKey, operator_id: DbId) -> PortResult<bool> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .assignments
            .iter()
            .any(|a| a.entity_key() == key && a.operator_id == operator_id))
    }

    async fn record(&self, input: &CreateAssignment) -> PortResult<Assignment> {
        let mut state = self.state();
        state.check_available()?;
        if state.slot_taken(input) {
            return Err(CoreError::DuplicateAssignment {
                entity_type: input.entity_type,
                external_id: input.external_entity_id,
            }
            .into());
        }
        Ok(state.push_assignment(input, None))
    }

    async fn record_with_task(
        &self,
        input: &CreateAssignment,
        task: &NewTask,
    ) -> PortResult<(Assignment, Task)> {
        let mut state = self.state();
        state.check_available()?;
        if state.slot_taken(input) {
            return Err(CoreError::DuplicateAssignment {
                entity_type: input.entity_type,
                external_id: input.external_entity_id,
            }
            .into());
        }
        if !state.lists.contains(&task.list_id) {
            return Err(PipelineError::materialization(format!(
                "task list {} does not exist",
                task.list_id
            )));
        }
        if task.assignees.iter().any(|op| state.failing_operators.contains(op)) {
            return Err(PipelineError::materialization("task board rejected the task"));
        }
        let created = state.push_task(task);
        let assignment = state.push_assignment(input, Some(created.id));
        Ok((assignment, created))
    }

    async fn assigned_ids_among(
        &self,
        entity_type: EntityType,
        ids: &[DbId],
    ) -> PortResult<HashSet<DbId>> {
        let state = self.state();
        state.check_available()?;
        let wanted: HashSet<DbId> = ids.iter().copied().collect();
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.entity_type == entity_type && wanted.contains(&a.external_entity_id))
            .map(|a| a.external_entity_id)
            .collect())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn due_task_ids(&self, cutoff: Timestamp) -> PortResult<Vec<DbId>> {
        let state = self.state();
        state.check_available()?;
        let mut due: Vec<(Timestamp, DbId)> = state
            .tasks
            .values()
            .filter_map(|t| t.recurring_at.filter(|at| *at < cutoff).map(|at| (at, t.id)))
            .collect();
        due.sort();
        Ok(due.into_iter().map(|(_, id)| id).collect())
    }

    async fn load(&self, id: DbId) -> PortResult<Option<Task>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        task: &Task,
        expected_recurring_at: Timestamp,
        history: Option<&CompletionRecord>,
    ) -> PortResult<bool> {
        let mut state = self.state();
        state.check_available()?;
        let current = state.tasks.get(&task.id).and_then(|t| t.recurring_at);
        if current != Some(expected_recurring_at) {
            return Ok(false);
        }
        state.tasks.insert(task.id, task.clone());
        if let Some(record) = history {
            state.completions.push(record.clone());
        }
        Ok(true)
    }
}

#[async_trait]
impl FocusSource for MemoryStore {
    async fn snapshot(&self) -> PortResult<Vec<OperatorFocus>> {
        let state = self.state();
        state.check_available()?;
        Ok(state.focus.clone())
    }
}

#[async_trait]
impl TaskBoard for MemoryStore {
    async fn list_exists(&self, list_id: DbId) -> PortResult<bool> {
        let state = self.state();
        state.check_available()?;
        Ok(state.lists.contains(&list_id))
    }
}

#[async_trait]
impl UrlShortener for MemoryStore {
    async fn shorten(&self, long_url: &str) -> PortResult<String> {
        let mut state = self.state();
        if state.shortener_down {
            return Err(PipelineError::materialization("shortener unavailable"));
        }
        state.shorten_calls += 1;
        let next = state.short_codes.len() + 1;
        let code = state
            .short_codes
            .entry(long_url.to_string())
            .or_insert_with(|| format!("m{next:05}"))
            .clone();
        Ok(code)
    }

    async fn resolve(&self, code: &str) -> PortResult<Option<String>> {
        let state = self.state();
        state.check_available()?;
        Ok(state
            .short_codes
            .iter()
            .find(|(_, c)| c.as_str() == code)
            .map(|(url, _)| url.clone()))
    }
}

// ---------------------------------------------------------------------------
// Run lock
// ---------------------------------------------------------------------------

struct MemoryLease {
    kind: RunKind,
    running: Arc<Mutex<HashSet<RunKind>>>,
}

impl Drop for MemoryLease {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.kind);
    }
}

#[async_trait]
impl LeaseGuard for MemoryLease {
    async fn release(self: Box<Self>) -> PortResult<()> {
        drop(self);
        Ok(())
    }
}

#[async_trait]
impl RunLock for MemoryStore {
    async fn try_acquire(&self, kind: RunKind) -> PortResult<Option<RunLease>> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if !running.insert(kind) {
            return Ok(None);
        }
        let guard = MemoryLease {
            kind,
            running: Arc::clone(&self.running),
        };
        Ok(Some(RunLease::new(kind, Box::new(guard))))
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A notification captured by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notified {
    AssignmentCreated { assignment_id: DbId, task_id: DbId, operator_id: DbId },
    TaskRecurred { task_id: DbId, iteration: u32 },
}

/// Dispatcher that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Notified>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notified> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn push(&self, n: Notified) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).push(n);
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn assignment_created(&self, assignment: &Assignment, task: &Task) {
        self.push(Notified::AssignmentCreated {
            assignment_id: assignment.id,
            task_id: task.id,
            operator_id: assignment.operator_id,
        });
    }

    fn task_recurred(&self, task: &Task, iteration: u32) {
        self.push(Notified::TaskRecurred {
            task_id: task.id,
            iteration,
        });
    }
}
