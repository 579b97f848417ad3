use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /s/{code}
///
/// Redirect a shortened job-post link to its application page.
pub async fn follow(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<impl IntoResponse> {
    let target = state.pipeline.ports().shortener.resolve(&code).await?;

    match target {
        Some(url) => Ok(Redirect::temporary(&url)),
        None => Err(AppError::NotFound(format!("Short link '{code}' not found"))),
    }
}
