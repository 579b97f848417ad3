pub mod assignments;
pub mod health;
pub mod short_links;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// POST /webhooks/job-posts           job board: a post was published
/// GET  /webhooks/active-countries    job board: countries worth announcing
/// GET  /assignments/stats            assigned/unassigned counters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/webhooks", webhooks::router())
        .nest("/assignments", assignments::router())
}
