use axum::routing::get;
use axum::Router;

use crate::handlers::short_links;
use crate::state::AppState;

/// Short-link redirects, mounted at the root.
///
/// ```text
/// GET /s/{code}  -> follow
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/s/{code}", get(short_links::follow))
}
