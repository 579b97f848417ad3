//! Repository for `operator_focus`.

use sqlx::PgPool;

use crate::models::operator_focus::OperatorFocusRow;

const COLUMNS: &str = "\
    operator_id, works_with_job_seekers, works_with_employers, \
    auto_assign_job_seekers, auto_assign_employers, shares_job_posts, \
    covered_countries, created_at, updated_at";

pub struct OperatorFocusRepo;

impl OperatorFocusRepo {
    /// The full focus table, ordered by operator id.
    pub async fn list_all(pool: &PgPool) -> Result<Vec<OperatorFocusRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM operator_focus ORDER BY operator_id");
        sqlx::query_as::<_, OperatorFocusRow>(&query)
            .fetch_all(pool)
            .await
    }
}
