use axum::routing::get;
use axum::Router;

use crate::handlers::assignments;
use crate::state::AppState;

/// Assignment reporting routes mounted at `/assignments`.
///
/// ```text
/// GET /stats  -> stats
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(assignments::stats))
}
