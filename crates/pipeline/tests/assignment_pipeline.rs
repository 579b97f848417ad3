//! Routing behaviour of `AssignmentPipeline` over the in-memory ports.

mod common;

use assert_matches::assert_matches;
use common::*;
use jobroute_core::entity::EntityType;
use jobroute_pipeline::adapters::memory::Notified;
use jobroute_pipeline::ports::RunKind;
use jobroute_pipeline::{PipelineError, StatRow, StatsFilter};

fn now() -> jobroute_core::types::Timestamp {
    at(2024, 3, 11, 9, 30)
}

// ---------------------------------------------------------------------------
// Single-recipient routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn seeker_goes_to_lowest_qualifying_operator() {
    let h = Harness::new(now());
    h.store.set_focus(vec![
        seeker_operator(9, &["MW"]),
        seeker_operator(4, &["MW", "ZM"]),
        employer_operator(1, &["MW"]),
    ]);
    let seeker = entity(EntityType::JobSeeker, 100, "Chikondi Banda", Some("MW"), now());

    let outcome = h.pipeline.route_entity(&seeker).await.unwrap();

    assert_eq!(outcome.assigned, 1);
    assert_eq!(outcome.operators_matched, 1);
    let assignments = h.store.assignments();
    assert_eq!(assignments.len(), 1);
    assert_eq!(assignments[0].operator_id, 4);
    assert!(assignments[0].auto_assigned);

    let task = h.store.task(assignments[0].task_id.unwrap()).unwrap();
    assert_eq!(task.title, "Follow up with Job Seeker: Chikondi Banda");
    assert_eq!(task.list_id, SEEKER_LIST);
    assert_eq!(task.assignees, vec![4]);

    assert_eq!(
        h.notifier.sent(),
        vec![Notified::AssignmentCreated {
            assignment_id: assignments[0].id,
            task_id: task.id,
            operator_id: 4,
        }]
    );
}

#[tokio::test]
async fn routing_twice_creates_one_assignment_and_one_task() {
    let h = Harness::new(now());
    h.store.set_focus(vec![employer_operator(2, &["KE"])]);
    let employer = entity(EntityType::Employer, 55, "Acme Ltd", Some("KE"), now());

    let first = h.pipeline.route_entity(&employer).await.unwrap();
    let second = h.pipeline.route_entity(&employer).await.unwrap();

    assert_eq!(first.assigned, 1);
    assert_eq!(second.assigned, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(h.store.assignments().len(), 1);
    assert_eq!(h.store.tasks().len(), 1);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn concurrent_deliveries_assign_once() {
    let h = Harness::new(now());
    h.store.set_focus(vec![seeker_operator(3, &["MW"]), seeker_operator(8, &["MW"])]);
    let seeker = entity(EntityType::JobSeeker, 7, "Thoko", Some("MW"), now());

    let (a, b) = tokio::join!(
        h.pipeline.route_entity(&seeker),
        h.pipeline.route_entity(&seeker)
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.assigned + b.assigned, 1);
    assert_eq!(a.duplicates + b.duplicates, 1);
    assert_eq!(h.store.assignments().len(), 1);
    assert_eq!(h.store.tasks().len(), 1);
}

#[tokio::test]
async fn entity_without_coverage_is_unassignable() {
    let h = Harness::new(now());
    h.store.set_focus(vec![seeker_operator(1, &["ZM"])]);

    let outside = entity(EntityType::JobSeeker, 1, "A", Some("MW"), now());
    let stateless = entity(EntityType::JobSeeker, 2, "B", None, now());

    assert!(h.pipeline.route_entity(&outside).await.unwrap().unassignable);
    assert!(h.pipeline.route_entity(&stateless).await.unwrap().unassignable);
    assert!(h.store.assignments().is_empty());
}

#[tokio::test]
async fn task_board_rejection_is_reported_not_raised() {
    let h = Harness::new(now());
    h.store.set_focus(vec![employer_operator(1, &["MW"])]);
    h.store.fail_tasks_for_operator(1);
    let employer = entity(EntityType::Employer, 3, "Acme", Some("MW"), now());

    let outcome = h.pipeline.route_entity(&employer).await.unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(h.store.assignments().is_empty());
    assert!(h.store.tasks().is_empty());
}

// ---------------------------------------------------------------------------
// Job posts and the webhook
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_post_fans_out_with_one_shared_short_url() {
    let h = Harness::new(now());
    h.store.set_focus(vec![
        sharing_operator(3, &["MW"]),
        sharing_operator(1, &["MW"]),
        sharing_operator(2, &["MW"]),
        sharing_operator(4, &["ZM"]),
    ]);
    h.add_post(40, "Accountant", Some("MW"));

    let outcome = h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.stats.assigned, 3);
    let mut operators: Vec<_> = h.store.assignments().iter().map(|a| a.operator_id).collect();
    operators.sort_unstable();
    assert_eq!(operators, vec![1, 2, 3]);

    let tasks = h.store.tasks();
    assert_eq!(tasks.len(), 3);
    assert_eq!(h.store.shorten_calls(), 1);
    let url = tasks[0].meta["short_url"].clone();
    assert!(tasks.iter().all(|t| t.meta["short_url"] == url));
    assert!(tasks.iter().all(|t| t.title == "Share job post: Accountant"));
    assert!(tasks[0].description.ends_with("#jobs #hiring #mwjobs"));
}

#[tokio::test]
async fn redelivered_webhook_is_a_no_op() {
    let h = Harness::new(now());
    h.store.set_focus(vec![sharing_operator(1, &["MW"]), sharing_operator(2, &["MW"])]);
    h.add_post(40, "Accountant", Some("MW"));

    h.pipeline.handle_job_post_webhook(40, None).await.unwrap();
    let again = h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    assert!(again.success);
    assert_eq!(again.stats.assigned, 0);
    assert_eq!(again.stats.duplicates, 2);
    assert_eq!(h.store.assignments().len(), 2);
    assert_eq!(h.store.tasks().len(), 2);
}

#[tokio::test]
async fn new_sharing_operator_gets_post_on_redelivery() {
    let h = Harness::new(now());
    h.store.set_focus(vec![sharing_operator(1, &["MW"])]);
    h.add_post(40, "Accountant", Some("MW"));
    h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    h.store.set_focus(vec![sharing_operator(1, &["MW"]), sharing_operator(2, &["MW"])]);
    let outcome = h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    assert_eq!(outcome.stats.assigned, 1);
    assert_eq!(outcome.stats.duplicates, 1);
    assert_eq!(h.store.assignments().len(), 2);
}

#[tokio::test]
async fn unknown_post_is_reported_unsuccessful() {
    let h = Harness::new(now());
    let outcome = h.pipeline.handle_job_post_webhook(404, None).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Job post 404 not found");
}

#[tokio::test]
async fn payload_country_fills_in_missing_directory_country() {
    let h = Harness::new(now());
    h.store.set_focus(vec![sharing_operator(1, &["MW"]), sharing_operator(2, &["ZM"])]);
    h.add_post(40, "Driver", None);
    h.add_post(41, "Nurse", Some("ZM"));

    let filled = h.pipeline.handle_job_post_webhook(40, Some(cc("MW"))).await.unwrap();
    // The directory's own country wins over the hint.
    let kept = h.pipeline.handle_job_post_webhook(41, Some(cc("MW"))).await.unwrap();

    assert_eq!(filled.stats.assigned, 1);
    assert_eq!(kept.stats.assigned, 1);
    let assignments = h.store.assignments();
    assert_eq!(assignments[0].operator_id, 1);
    assert_eq!(assignments[0].country_code.as_deref(), Some("MW"));
    assert_eq!(assignments[1].operator_id, 2);
}

#[tokio::test]
async fn one_failing_recipient_does_not_block_the_others() {
    let h = Harness::new(now());
    h.store.set_focus(vec![
        sharing_operator(1, &["MW"]),
        sharing_operator(2, &["MW"]),
        sharing_operator(3, &["MW"]),
    ]);
    h.store.fail_tasks_for_operator(2);
    h.add_post(40, "Accountant", Some("MW"));

    let outcome = h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.stats.assigned, 2);
    assert_eq!(outcome.stats.failed, 1);
    assert!(h.store.assignments().iter().all(|a| a.operator_id != 2));
}

#[tokio::test]
async fn unverified_post_is_not_routed() {
    let h = Harness::new(now());
    h.store.set_focus(vec![sharing_operator(1, &["MW"])]);
    let mut post = h.add_post(40, "Accountant", Some("MW"));
    post.verified = false;
    h.store.add_job_post(post, post_details(40, "Accountant"));

    let outcome = h.pipeline.handle_job_post_webhook(40, None).await.unwrap();

    assert!(outcome.stats.unassignable);
    assert_eq!(outcome.message, "Job post 40 is not verified or is archived");
    assert!(h.store.assignments().is_empty());
}

#[tokio::test]
async fn directory_outage_is_an_error() {
    let h = Harness::new(now());
    h.store.set_unavailable(true);
    let err = h.pipeline.handle_job_post_webhook(40, None).await.unwrap_err();
    assert_matches!(err, PipelineError::Database(_));
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sync_routes_recent_entities_and_is_repeatable() {
    let h = Harness::new(now());
    h.store.set_focus(vec![
        seeker_operator(1, &["MW"]),
        employer_operator(2, &["MW"]),
        sharing_operator(3, &["MW"]),
    ]);
    let since = at(2024, 3, 10, 0, 0);
    h.store.add_entity(entity(EntityType::JobSeeker, 1, "New seeker", Some("MW"), now()));
    let old = at(2024, 1, 1, 0, 0);
    h.store.add_entity(entity(EntityType::JobSeeker, 2, "Old seeker", Some("MW"), old));
    h.store.add_entity(entity(EntityType::Employer, 3, "Acme", Some("MW"), now()));
    h.store.add_entity(entity(EntityType::Employer, 4, "Far away", Some("US"), now()));
    let post = entity(EntityType::JobPost, 5, "Clerk", Some("MW"), now());
    h.store.add_job_post(post, post_details(5, "Clerk"));

    let first = h.pipeline.sync(since).await.unwrap();
    assert_eq!(first.entities, 4);
    assert_eq!(first.assigned, 3);
    assert_eq!(first.unassignable, 1);
    assert_eq!(first.failed, 0);

    let second = h.pipeline.sync(since).await.unwrap();
    assert_eq!(second.assigned, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(h.store.assignments().len(), 3);
    assert_eq!(
        second.to_string(),
        "Done! Entities: 4, Assigned: 0, Already assigned: 3, Unassignable: 1, Failed: 0"
    );
}

#[tokio::test]
async fn sync_skips_while_another_sync_runs() {
    let h = Harness::new(now());
    let lease = h
        .ports
        .run_lock
        .try_acquire(RunKind::AssignmentSync)
        .await
        .unwrap()
        .expect("lock should be free");

    let skipped = h.pipeline.sync(now()).await.unwrap();
    assert!(skipped.already_running);

    lease.release().await.unwrap();
    let ran = h.pipeline.sync(now()).await.unwrap();
    assert!(!ran.already_running);
    assert!(!h.store.is_running(RunKind::AssignmentSync));
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[tokio::test]
async fn active_countries_are_sorted_and_exclude_idle_operators() {
    let h = Harness::new(now());
    h.store.set_focus(vec![
        sharing_operator(1, &["ZM", "MW"]),
        seeker_operator(2, &["KE"]),
        operator(3, &["US"]),
    ]);

    let countries = h.pipeline.active_countries().await.unwrap();
    assert_eq!(countries, vec![cc("KE"), cc("MW"), cc("ZM")]);
}

#[tokio::test]
async fn statistics_balance_per_country() {
    let h = Harness::new(now());
    h.store.set_focus(vec![seeker_operator(1, &["MW"])]);
    for (id, country) in [(1, "MW"), (2, "MW"), (3, "ZM")] {
        h.store
            .add_entity(entity(EntityType::JobSeeker, id, "S", Some(country), now()));
    }
    h.pipeline
        .route_entity(&entity(EntityType::JobSeeker, 1, "S", Some("MW"), now()))
        .await
        .unwrap();

    let rows = h
        .pipeline
        .statistics(&StatsFilter {
            entity_type: Some(EntityType::JobSeeker),
            country_code: None,
        })
        .await
        .unwrap();

    assert_eq!(
        rows,
        vec![
            StatRow {
                entity_type: EntityType::JobSeeker,
                country_code: Some(cc("MW")),
                total: 2,
                assigned: 1,
                unassigned: 1,
            },
            StatRow {
                entity_type: EntityType::JobSeeker,
                country_code: Some(cc("ZM")),
                total: 1,
                assigned: 0,
                unassigned: 1,
            },
        ]
    );
    assert!(rows.iter().all(|r| r.assigned + r.unassigned == r.total));
}

#[tokio::test]
async fn statistics_filter_by_country() {
    let h = Harness::new(now());
    h.add_post(1, "Clerk", Some("MW"));
    h.add_post(2, "Cook", Some("ZM"));

    let rows = h
        .pipeline
        .statistics(&StatsFilter {
            entity_type: None,
            country_code: Some(cc("ZM")),
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entity_type, EntityType::JobPost);
    assert_eq!(rows[0].total, 1);
    assert_eq!(rows[0].unassigned, 1);
}
