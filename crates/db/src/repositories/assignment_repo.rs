//! Repository for the `assignments` ledger.
//!
//! Uniqueness lives in the partial unique indexes `uq_assignments_entity`
//! and `uq_assignments_job_post`. Inserts go through
//! [`AssignmentRepo::insert_if_absent`], which turns a conflicting insert
//! into `Ok(None)` atomically, so concurrent deliveries of the same entity
//! cannot both succeed.

use jobroute_core::entity::{EntityKey, EntityType};
use jobroute_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::assignment::{Assignment, CreateAssignment};

/// Column list for `assignments` queries.
const COLUMNS: &str = "\
    id, operator_id, external_entity_id, entity_type, country_code, \
    auto_assigned, task_id, created_at";

/// Provides read/write operations for the assignment ledger.
pub struct AssignmentRepo;

impl AssignmentRepo {
    /// Whether any assignment exists for the entity.
    pub async fn exists(pool: &PgPool, key: EntityKey) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM assignments \
             WHERE entity_type = $1 AND external_entity_id = $2)",
        )
        .bind(key.entity_type.as_str())
        .bind(key.external_id)
        .fetch_one(pool)
        .await
    }

    /// Whether the entity is already assigned to this particular operator.
    pub async fn exists_for_operator(
        pool: &PgPool,
        key: EntityKey,
        operator_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM assignments \
             WHERE entity_type = $1 AND external_entity_id = $2 AND operator_id = $3)",
        )
        .bind(key.entity_type.as_str())
        .bind(key.external_id)
        .bind(operator_id)
        .fetch_one(pool)
        .await
    }

    /// Insert an assignment unless one already occupies its uniqueness slot.
    ///
    /// Returns `None` on conflict. Takes a connection so the caller can run
    /// it inside the same transaction as the task insert.
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        input: &CreateAssignment,
    ) -> Result<Option<Assignment>, sqlx::Error> {
        let query = format!(
            "INSERT INTO assignments \
                (operator_id, external_entity_id, entity_type, country_code, auto_assigned) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(input.operator_id)
            .bind(input.external_entity_id)
            .bind(input.entity_type.as_str())
            .bind(&input.country_code)
            .bind(input.auto_assigned)
            .fetch_optional(conn)
            .await
    }

    /// Backfill the task created for an assignment.
    pub async fn set_task_id(
        conn: &mut PgConnection,
        assignment_id: DbId,
        task_id: DbId,
    ) -> Result<Assignment, sqlx::Error> {
        let query = format!(
            "UPDATE assignments SET task_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(assignment_id)
            .bind(task_id)
            .fetch_one(conn)
            .await
    }

    /// All assignments for one entity, oldest first.
    pub async fn list_for_entity(
        pool: &PgPool,
        key: EntityKey,
    ) -> Result<Vec<Assignment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignments \
             WHERE entity_type = $1 AND external_entity_id = $2 \
             ORDER BY id"
        );
        sqlx::query_as::<_, Assignment>(&query)
            .bind(key.entity_type.as_str())
            .bind(key.external_id)
            .fetch_all(pool)
            .await
    }

    /// Which of `external_ids` have at least one assignment.
    pub async fn assigned_ids_among(
        pool: &PgPool,
        entity_type: EntityType,
        external_ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT external_entity_id FROM assignments \
             WHERE entity_type = $1 AND external_entity_id = ANY($2)",
        )
        .bind(entity_type.as_str())
        .bind(external_ids)
        .fetch_all(pool)
        .await
    }
}
