//! Assignment ledger rows.

use jobroute_core::entity::{EntityKey, EntityType};
use jobroute_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `assignments` table: one external entity routed to one
/// operator.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Assignment {
    pub id: DbId,
    pub operator_id: DbId,
    pub external_entity_id: DbId,
    #[sqlx(try_from = "String")]
    pub entity_type: EntityType,
    pub country_code: Option<String>,
    pub auto_assigned: bool,
    pub task_id: Option<DbId>,
    pub created_at: Timestamp,
}

impl Assignment {
    pub fn entity_key(&self) -> EntityKey {
        EntityKey {
            external_id: self.external_entity_id,
            entity_type: self.entity_type,
        }
    }
}

/// DTO for recording a new assignment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CreateAssignment {
    pub operator_id: DbId,
    pub external_entity_id: DbId,
    pub entity_type: EntityType,
    pub country_code: Option<String>,
    pub auto_assigned: bool,
}

impl CreateAssignment {
    pub fn entity_key(&self) -> EntityKey {
        EntityKey {
            external_id: self.external_entity_id,
            entity_type: self.entity_type,
        }
    }
}
