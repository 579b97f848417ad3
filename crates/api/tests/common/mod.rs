//! Shared fixtures for API integration tests.
//!
//! The app is wired to the in-memory pipeline adapters, so these tests run
//! without a database.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use jobroute_api::config::ServerConfig;
use jobroute_api::router::build_app_router;
use jobroute_api::state::AppState;
use jobroute_core::clock::FixedClock;
use jobroute_core::entity::{CountryCode, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::focus::OperatorFocus;
use jobroute_core::types::DbId;
use jobroute_events::EventBus;
use jobroute_pipeline::adapters::memory::{MemoryStore, RecordingDispatcher};
use jobroute_pipeline::{AssignmentPipeline, RoutingConfig};
use tower::ServiceExt;

pub const TOKEN: &str = "test-webhook-token";
pub const SHARING_LIST: DbId = 30;
pub const SEEKER_LIST: DbId = 10;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        webhook_token: TOKEN.to_string(),
        routing: RoutingConfig {
            short_url_base: "https://s.example".into(),
            job_board_base_url: "https://jobs.example".into(),
            job_sharing_list_id: Some(SHARING_LIST),
            job_seeker_list_id: Some(SEEKER_LIST),
            employer_list_id: None,
        },
    }
}

/// A fresh in-memory store with the configured task lists present.
pub fn test_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.add_list(SHARING_LIST);
    store.add_list(SEEKER_LIST);
    store
}

/// Build the full application router over `store`, with the same middleware
/// stack production uses.
pub fn build_test_app(store: &Arc<MemoryStore>) -> Router {
    let config = test_config();
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
    ));
    let ports = store.ports(Arc::new(RecordingDispatcher::new()), clock);
    let state = AppState {
        config: Arc::new(config.clone()),
        pipeline: Arc::new(AssignmentPipeline::new(ports, config.routing.clone())),
        event_bus: Arc::new(EventBus::default()),
    };
    build_app_router(state, &config)
}

pub fn cc(code: &str) -> CountryCode {
    CountryCode::parse(code).unwrap()
}

pub fn sharing_operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        operator_id: id,
        works_with_job_seekers: false,
        works_with_employers: false,
        auto_assign_job_seekers: false,
        auto_assign_employers: false,
        shares_job_posts: true,
        covered_countries: countries.iter().map(|c| cc(c)).collect::<HashSet<_>>(),
    }
}

pub fn seeker_operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        works_with_job_seekers: true,
        auto_assign_job_seekers: true,
        shares_job_posts: false,
        ..sharing_operator(id, countries)
    }
}

pub fn entity(
    entity_type: EntityType,
    id: DbId,
    name: &str,
    country: Option<&str>,
) -> ExternalEntity {
    ExternalEntity {
        id,
        entity_type,
        display_name: name.into(),
        country_code: country.map(cc),
        verified: true,
        archived: false,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
    }
}

pub fn add_post(store: &MemoryStore, id: DbId, title: &str, country: Option<&str>) {
    store.add_job_post(
        entity(EntityType::JobPost, id, title, country),
        JobPostDetails {
            post_id: id,
            title: title.into(),
            description: "Keep the books.".into(),
            salary: None,
            slug: None,
        },
    );
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_with_token(app: Router, uri: &str, token: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-webhook-token", token)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body, optionally with the webhook token header.
pub async fn post_raw(app: Router, uri: &str, body: &str, token: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-webhook-token", token);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: Option<&str>,
) -> Response {
    post_raw(app, uri, &body.to_string(), token).await
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
