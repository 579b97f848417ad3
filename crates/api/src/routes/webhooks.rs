use axum::routing::{get, post};
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Job-board webhook routes mounted at `/webhooks`.
///
/// ```text
/// POST /job-posts         -> job_post_published
/// GET  /active-countries  -> active_countries
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/job-posts", post(webhooks::job_post_published))
        .route("/active-countries", get(webhooks::active_countries))
}
