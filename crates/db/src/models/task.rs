//! Task, task list and completion-history rows.

use jobroute_core::task::{ChecklistItem, CompletionRecord, Task};
use jobroute_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `tasks` table.
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: DbId,
    pub list_id: DbId,
    pub title: String,
    pub description: String,
    pub assignees: Vec<DbId>,
    pub labels: Vec<String>,
    pub meta: serde_json::Value,
    pub completed_at: Option<Timestamp>,
    pub recurring_at: Option<Timestamp>,
    pub total_seconds: i64,
    pub checklist_items: Json<Vec<ChecklistItem>>,
    pub created_at: Timestamp,
}

impl TaskRow {
    /// Convert into the domain task. A non-object `meta` reads as empty.
    pub fn into_task(self) -> Task {
        let meta = match self.meta {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Task {
            id: self.id,
            list_id: self.list_id,
            title: self.title,
            description: self.description,
            assignees: self.assignees,
            labels: self.labels,
            meta,
            completed_at: self.completed_at,
            recurring_at: self.recurring_at,
            total_seconds: self.total_seconds,
            checklist_items: self.checklist_items.0,
            created_at: self.created_at,
        }
    }
}

/// A row from the `task_completions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TaskCompletion {
    pub id: DbId,
    pub task_id: DbId,
    pub iteration: i32,
    pub completed_at: Timestamp,
    pub elapsed_seconds: i64,
    pub labels: Vec<String>,
    pub recorded_at: Timestamp,
}

impl TaskCompletion {
    pub fn into_record(self) -> CompletionRecord {
        CompletionRecord {
            task_id: self.task_id,
            iteration: u32::try_from(self.iteration).unwrap_or(0),
            completed_at: self.completed_at,
            elapsed_seconds: self.elapsed_seconds,
            labels: self.labels,
        }
    }
}
