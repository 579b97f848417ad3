//! Assignment statistics for the reporting dashboard.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use jobroute_core::entity::{CountryCode, EntityType};
use jobroute_pipeline::StatsFilter;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /assignments/stats`. Blank values mean "any".
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub entity_type: Option<String>,
    pub country_code: Option<String>,
}

impl StatsQuery {
    pub fn into_filter(self) -> AppResult<StatsFilter> {
        let entity_type = non_blank(self.entity_type)
            .map(|t| t.parse::<EntityType>())
            .transpose()?;
        let country_code = non_blank(self.country_code)
            .map(|c| CountryCode::parse(&c))
            .transpose()?;
        Ok(StatsFilter {
            entity_type,
            country_code,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// GET /api/v1/assignments/stats?entity_type=&country_code=
///
/// One row per (entity type, country) with total, assigned and unassigned
/// counts of routable directory entities.
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = query.into_filter()?;
    let rows = state.pipeline.statistics(&filter).await?;

    Ok(Json(DataResponse { data: rows }))
}
