use crate::entity::EntityType;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The external entity has already been routed. Expected under
    /// at-least-once webhook delivery; callers treat it as a no-op.
    #[error("Duplicate assignment: {entity_type} {external_id} is already assigned")]
    DuplicateAssignment {
        entity_type: EntityType,
        external_id: DbId,
    },

    /// A downstream collaborator (task list, shortener, directory) could not
    /// produce the task for an assignment.
    #[error("Materialization failed: {0}")]
    MaterializationFailed(String),

    #[error("Malformed recurrence pattern on task {task_id}: {reason}")]
    MalformedRecurrencePattern { task_id: DbId, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
