//! Operator focus configuration.
//!
//! Focus rows are edited elsewhere; the routing engine only sees an explicit
//! snapshot passed in per invocation.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::{CountryCode, EntityType};
use crate::types::DbId;

/// What an operator works on and where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorFocus {
    pub operator_id: DbId,
    pub works_with_job_seekers: bool,
    pub works_with_employers: bool,
    pub auto_assign_job_seekers: bool,
    pub auto_assign_employers: bool,
    /// Receives a share task for every new job post in a covered country.
    pub shares_job_posts: bool,
    pub covered_countries: HashSet<CountryCode>,
}

impl OperatorFocus {
    pub fn covers(&self, country: &CountryCode) -> bool {
        self.covered_countries.contains(country)
    }

    /// Whether this operator takes entities of `entity_type` automatically.
    pub fn accepts(&self, entity_type: EntityType) -> bool {
        match entity_type {
            EntityType::JobSeeker => self.works_with_job_seekers && self.auto_assign_job_seekers,
            EntityType::Employer => self.works_with_employers && self.auto_assign_employers,
            EntityType::JobPost => self.shares_job_posts,
        }
    }
}

/// Countries covered by at least one operator that accepts some entity type.
///
/// The directory uses this list to decide which events are worth sending.
pub fn active_countries(operators: &[OperatorFocus]) -> BTreeSet<CountryCode> {
    operators
        .iter()
        .filter(|op| EntityType::ALL.iter().any(|t| op.accepts(*t)))
        .flat_map(|op| op.covered_countries.iter().cloned())
        .collect()
}
