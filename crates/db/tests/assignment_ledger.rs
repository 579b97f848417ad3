//! Integration tests for the assignment ledger's uniqueness rules.
//!
//! These need a live PostgreSQL reachable through `DATABASE_URL`.

use jobroute_core::entity::{EntityKey, EntityType};
use jobroute_db::models::assignment::CreateAssignment;
use jobroute_db::repositories::AssignmentRepo;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_assignment(entity_type: EntityType, external_id: i64, operator_id: i64) -> CreateAssignment {
    CreateAssignment {
        operator_id,
        external_entity_id: external_id,
        entity_type,
        country_code: Some("MW".to_string()),
        auto_assigned: true,
    }
}

fn key(entity_type: EntityType, external_id: i64) -> EntityKey {
    EntityKey {
        external_id,
        entity_type,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_user_assigned_once_system_wide(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();

    let first = AssignmentRepo::insert_if_absent(
        &mut conn,
        &new_assignment(EntityType::JobSeeker, 10, 1),
    )
    .await
    .unwrap();
    assert!(first.is_some());

    // Different operator, same seeker: rejected by uq_assignments_entity.
    let second = AssignmentRepo::insert_if_absent(
        &mut conn,
        &new_assignment(EntityType::JobSeeker, 10, 2),
    )
    .await
    .unwrap();
    assert!(second.is_none());

    assert!(AssignmentRepo::exists(&pool, key(EntityType::JobSeeker, 10)).await.unwrap());
    assert!(!AssignmentRepo::exists(&pool, key(EntityType::Employer, 10)).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_job_post_assigned_once_per_operator(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();

    for op in [1, 2] {
        let row = AssignmentRepo::insert_if_absent(
            &mut conn,
            &new_assignment(EntityType::JobPost, 7, op),
        )
        .await
        .unwrap();
        assert!(row.is_some(), "operator {op} should get the post");
    }
    let dup = AssignmentRepo::insert_if_absent(
        &mut conn,
        &new_assignment(EntityType::JobPost, 7, 1),
    )
    .await
    .unwrap();
    assert!(dup.is_none());

    let rows = AssignmentRepo::list_for_entity(&pool, key(EntityType::JobPost, 7))
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(AssignmentRepo::exists_for_operator(&pool, key(EntityType::JobPost, 7), 2)
        .await
        .unwrap());
    assert!(!AssignmentRepo::exists_for_operator(&pool, key(EntityType::JobPost, 7), 3)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_assigned_ids_among_filters_by_type(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    AssignmentRepo::insert_if_absent(
        &mut conn,
        &new_assignment(EntityType::Employer, 3, 1),
    )
    .await
    .unwrap();
    AssignmentRepo::insert_if_absent(
        &mut conn,
        &new_assignment(EntityType::JobSeeker, 4, 1),
    )
    .await
    .unwrap();

    let ids = AssignmentRepo::assigned_ids_among(&pool, EntityType::Employer, &[3, 4, 5])
        .await
        .unwrap();
    assert_eq!(ids, vec![3]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_rolled_back_transaction_leaves_no_assignment(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    AssignmentRepo::insert_if_absent(&mut tx, &new_assignment(EntityType::Employer, 9, 1))
        .await
        .unwrap()
        .unwrap();
    tx.rollback().await.unwrap();

    assert!(!AssignmentRepo::exists(&pool, key(EntityType::Employer, 9)).await.unwrap());
}
