//! Integration tests for the assignment statistics endpoint.

mod common;

use axum::http::StatusCode;
use common::{
    add_post, body_json, build_test_app, entity, get, post_json, seeker_operator,
    sharing_operator, test_store, TOKEN,
};
use jobroute_core::entity::EntityType;
use serde_json::json;

const STATS: &str = "/api/v1/assignments/stats";

// ---------------------------------------------------------------------------
// Test: counters per entity type and country
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_count_assigned_and_unassigned_per_country() {
    let store = test_store();
    store.set_focus(vec![sharing_operator(1, &["MW"])]);
    add_post(&store, 1, "Accountant", Some("MW"));
    add_post(&store, 2, "Driver", Some("MW"));
    add_post(&store, 3, "Nurse", Some("KE"));

    let response = post_json(
        build_test_app(&store),
        "/api/v1/webhooks/job-posts",
        json!({"post_id": 1}),
        Some(TOKEN),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(build_test_app(&store), &format!("{STATS}?entity_type=job_post")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!([
            {"entity_type": "job_post", "country_code": "KE", "total": 1, "assigned": 0, "unassigned": 1},
            {"entity_type": "job_post", "country_code": "MW", "total": 2, "assigned": 1, "unassigned": 1},
        ])
    );
}

#[tokio::test]
async fn stats_filter_by_country_is_case_insensitive() {
    let store = test_store();
    store.set_focus(vec![seeker_operator(1, &["MW"])]);
    store.add_entity(entity(EntityType::JobSeeker, 7, "Ada", Some("MW")));
    store.add_entity(entity(EntityType::JobSeeker, 8, "Grace", Some("ZA")));
    add_post(&store, 1, "Accountant", Some("MW"));

    let response = get(build_test_app(&store), &format!("{STATS}?country_code=mw")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let rows = json["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["country_code"] == "MW"));
    assert!(rows.iter().all(|r| r["assigned"] == 0));
}

#[tokio::test]
async fn stats_without_filters_cover_every_entity_type() {
    let store = test_store();
    store.add_entity(entity(EntityType::JobSeeker, 7, "Ada", None));
    store.add_entity(entity(EntityType::Employer, 9, "Acme", Some("MW")));
    add_post(&store, 1, "Accountant", Some("MW"));

    let uri = format!("{STATS}?entity_type=&country_code=");
    let response = get(build_test_app(&store), &uri).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(
        json["data"],
        json!([
            {"entity_type": "job_seeker", "country_code": null, "total": 1, "assigned": 0, "unassigned": 1},
            {"entity_type": "employer", "country_code": "MW", "total": 1, "assigned": 0, "unassigned": 1},
            {"entity_type": "job_post", "country_code": "MW", "total": 1, "assigned": 0, "unassigned": 1},
        ])
    );
}

// ---------------------------------------------------------------------------
// Test: bad filters are validation errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_entity_type_is_rejected() {
    let store = test_store();

    let response = get(build_test_app(&store), &format!("{STATS}?entity_type=recruiter")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_country_filter_is_rejected() {
    let store = test_store();

    let response = get(build_test_app(&store), &format!("{STATS}?country_code=Malawi")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
