//! Operator focus configuration rows.

use jobroute_core::entity::CountryCode;
use jobroute_core::focus::OperatorFocus;
use jobroute_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `operator_focus` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperatorFocusRow {
    pub operator_id: DbId,
    pub works_with_job_seekers: bool,
    pub works_with_employers: bool,
    pub auto_assign_job_seekers: bool,
    pub auto_assign_employers: bool,
    pub shares_job_posts: bool,
    pub covered_countries: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl OperatorFocusRow {
    /// Convert into the domain snapshot. Invalid country codes are logged and
    /// left out rather than failing the whole snapshot.
    pub fn into_focus(self) -> OperatorFocus {
        let operator_id = self.operator_id;
        let covered_countries = self
            .covered_countries
            .iter()
            .filter_map(|raw| match CountryCode::parse(raw) {
                Ok(cc) => Some(cc),
                Err(e) => {
                    tracing::warn!(operator_id, error = %e, "Ignoring invalid covered country");
                    None
                }
            })
            .collect();

        OperatorFocus {
            operator_id,
            works_with_job_seekers: self.works_with_job_seekers,
            works_with_employers: self.works_with_employers,
            auto_assign_job_seekers: self.auto_assign_job_seekers,
            auto_assign_employers: self.auto_assign_employers,
            shares_job_posts: self.shares_job_posts,
            covered_countries,
        }
    }
}
