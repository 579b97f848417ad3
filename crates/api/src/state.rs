use std::sync::Arc;

use jobroute_pipeline::SharedPipeline;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (webhook token, routing settings).
    pub config: Arc<ServerConfig>,
    /// The assignment pipeline, wired to Postgres in production and to the
    /// in-memory store in tests.
    pub pipeline: SharedPipeline,
    /// Centralized event bus the pipeline's notifications are published on.
    pub event_bus: Arc<jobroute_events::EventBus>,
}
