//! Eligibility resolver.
//!
//! Decides which operator(s) receive an external entity, given a snapshot of
//! operator focus. Pure: no lookups, no side effects.
//!
//! Tie-break for single-recipient kinds (job seekers, employers): the
//! qualifying operator with the lowest id wins. Job posts are never picked;
//! they fan out to every qualifying operator, in ascending id order.

use serde::Serialize;

use crate::entity::ExternalEntity;
use crate::focus::OperatorFocus;
use crate::types::DbId;

/// Routing decision for one external entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "operators", rename_all = "snake_case")]
pub enum Routing {
    /// Exactly one operator receives the entity.
    Single(DbId),
    /// Every listed operator receives the entity (non-empty, ascending).
    FanOut(Vec<DbId>),
    /// No operator qualifies. A valid outcome, not an error.
    Unassignable,
}

impl Routing {
    /// Recipients of this decision, possibly empty.
    pub fn operator_ids(&self) -> Vec<DbId> {
        match self {
            Routing::Single(id) => vec![*id],
            Routing::FanOut(ids) => ids.clone(),
            Routing::Unassignable => Vec::new(),
        }
    }

    pub fn is_unassignable(&self) -> bool {
        matches!(self, Routing::Unassignable)
    }
}

/// Operators that cover the entity's country and accept its type, sorted by
/// id ascending with duplicates removed.
pub fn qualifying_operators(entity: &ExternalEntity, operators: &[OperatorFocus]) -> Vec<DbId> {
    let Some(country) = entity.country_code.as_ref() else {
        return Vec::new();
    };

    let mut ids: Vec<DbId> = operators
        .iter()
        .filter(|op| op.covers(country) && op.accepts(entity.entity_type))
        .map(|op| op.operator_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Resolve the recipients of `entity`.
pub fn resolve(entity: &ExternalEntity, operators: &[OperatorFocus]) -> Routing {
    if !entity.is_routable() {
        return Routing::Unassignable;
    }

    let ids = qualifying_operators(entity, operators);
    if ids.is_empty() {
        return Routing::Unassignable;
    }

    if entity.entity_type.fans_out() {
        Routing::FanOut(ids)
    } else {
        Routing::Single(ids[0])
    }
}

/// Single-pick form of [`resolve`]: the operator for a job seeker or employer.
///
/// For job posts this returns the first fan-out recipient; use [`resolve`]
/// to get all of them.
pub fn resolve_single(entity: &ExternalEntity, operators: &[OperatorFocus]) -> Option<DbId> {
    resolve(entity, operators).operator_ids().first().copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
