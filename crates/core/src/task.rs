//! Tasks: the unit of work handed to operators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::recurrence::{RecurrenceError, RecurrencePattern};
use crate::types::{DbId, Timestamp};

/// Key under which the recurrence pattern lives in [`Task::meta`].
pub const META_RECURRING: &str = "recurring";

/// One checklist entry on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

/// A task as stored in the task store.
///
/// `meta` is an open JSON object; the recurrence pattern is one key in it and
/// is parsed on demand so that a malformed pattern does not prevent loading
/// the rest of the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: DbId,
    pub list_id: DbId,
    pub title: String,
    pub description: String,
    pub assignees: Vec<DbId>,
    pub labels: Vec<String>,
    pub meta: Map<String, Value>,
    pub completed_at: Option<Timestamp>,
    pub recurring_at: Option<Timestamp>,
    pub total_seconds: i64,
    pub checklist_items: Vec<ChecklistItem>,
    pub created_at: Timestamp,
}

impl Task {
    /// Parse the recurrence pattern out of `meta`, if present.
    pub fn recurrence_pattern(&self) -> Result<Option<RecurrencePattern>, RecurrenceError> {
        match self.meta.get(META_RECURRING) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| RecurrenceError::Unreadable(e.to_string())),
        }
    }

    /// Replace (or with `None`, remove) the recurrence pattern in `meta`.
    pub fn set_recurrence_pattern(&mut self, pattern: Option<&RecurrencePattern>) {
        match pattern {
            Some(p) => {
                // RecurrencePattern only holds plain data; serialization cannot fail.
                let value = serde_json::to_value(p).unwrap_or(Value::Null);
                self.meta.insert(META_RECURRING.to_string(), value);
            }
            None => {
                self.meta.remove(META_RECURRING);
            }
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub list_id: DbId,
    pub title: String,
    pub description: String,
    pub assignees: Vec<DbId>,
    pub labels: Vec<String>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub recurring_at: Option<Timestamp>,
}

/// History entry written when a completed occurrence is rolled over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub task_id: DbId,
    pub iteration: u32,
    pub completed_at: Timestamp,
    pub elapsed_seconds: i64,
    pub labels: Vec<String>,
}
