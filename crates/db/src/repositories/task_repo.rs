//! Repositories for `tasks`, `task_lists` and `task_completions`.

use jobroute_core::task::{CompletionRecord, NewTask, Task};
use jobroute_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};

use crate::models::task::{TaskCompletion, TaskRow};

// ===========================================================================
// TaskRepo
// ===========================================================================

const TASK_COLUMNS: &str = "\
    id, list_id, title, description, assignees, labels, meta, completed_at, \
    recurring_at, total_seconds, checklist_items, created_at";

/// Reads and writes `tasks`.
pub struct TaskRepo;

impl TaskRepo {
    /// Insert a task. Runs on a connection so it can share a transaction
    /// with the assignment it belongs to.
    pub async fn insert(conn: &mut PgConnection, input: &NewTask) -> Result<TaskRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks (list_id, title, description, assignees, labels, meta, recurring_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {TASK_COLUMNS}"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(input.list_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.assignees)
            .bind(&input.labels)
            .bind(serde_json::Value::Object(input.meta.clone()))
            .bind(input.recurring_at)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TaskRow>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Ids of recurring tasks whose next occurrence is before `cutoff`.
    pub async fn due_recurring_ids(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM tasks \
             WHERE recurring_at IS NOT NULL AND recurring_at < $1 \
             ORDER BY recurring_at, id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Write back the recurrence-managed fields of `task`.
    ///
    /// The update only applies while `recurring_at` still equals
    /// `expected_recurring_at`; returns `false` if another run got there
    /// first.
    pub async fn apply_recurrence(
        conn: &mut PgConnection,
        task: &Task,
        expected_recurring_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tasks SET \
                labels = $3, meta = $4, completed_at = $5, recurring_at = $6, \
                total_seconds = $7, checklist_items = $8, updated_at = now() \
             WHERE id = $1 AND recurring_at = $2",
        )
        .bind(task.id)
        .bind(expected_recurring_at)
        .bind(&task.labels)
        .bind(serde_json::Value::Object(task.meta.clone()))
        .bind(task.completed_at)
        .bind(task.recurring_at)
        .bind(task.total_seconds)
        .bind(Json(&task.checklist_items))
        .execute(conn)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

// ===========================================================================
// TaskListRepo
// ===========================================================================

/// Lookups on `task_lists`.
pub struct TaskListRepo;

impl TaskListRepo {
    pub async fn exists(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM task_lists WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }
}

// ===========================================================================
// TaskCompletionRepo
// ===========================================================================

const COMPLETION_COLUMNS: &str = "\
    id, task_id, iteration, completed_at, elapsed_seconds, labels, recorded_at";

/// Append-only history of rolled-over occurrences.
pub struct TaskCompletionRepo;

impl TaskCompletionRepo {
    pub async fn insert(
        conn: &mut PgConnection,
        record: &CompletionRecord,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO task_completions (task_id, iteration, completed_at, elapsed_seconds, labels) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(record.task_id)
        .bind(i32::try_from(record.iteration).unwrap_or(i32::MAX))
        .bind(record.completed_at)
        .bind(record.elapsed_seconds)
        .bind(&record.labels)
        .fetch_one(conn)
        .await
    }

    pub async fn list_for_task(
        pool: &PgPool,
        task_id: DbId,
    ) -> Result<Vec<TaskCompletion>, sqlx::Error> {
        let query = format!(
            "SELECT {COMPLETION_COLUMNS} FROM task_completions \
             WHERE task_id = $1 ORDER BY iteration, id"
        );
        sqlx::query_as::<_, TaskCompletion>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }
}
