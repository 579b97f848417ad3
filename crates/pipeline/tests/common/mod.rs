//! Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use jobroute_core::clock::FixedClock;
use jobroute_core::entity::{CountryCode, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::focus::OperatorFocus;
use jobroute_core::types::{DbId, Timestamp};
use jobroute_pipeline::adapters::memory::{MemoryStore, RecordingDispatcher};
use jobroute_pipeline::{AssignmentPipeline, Ports, RecurrenceScanner, RoutingConfig};

pub const SEEKER_LIST: DbId = 10;
pub const EMPLOYER_LIST: DbId = 20;
pub const SHARING_LIST: DbId = 30;

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

pub fn cc(s: &str) -> CountryCode {
    CountryCode::parse(s).unwrap()
}

pub fn config() -> RoutingConfig {
    RoutingConfig {
        short_url_base: "https://s.example".into(),
        job_board_base_url: "https://jobs.example".into(),
        job_sharing_list_id: Some(SHARING_LIST),
        job_seeker_list_id: Some(SEEKER_LIST),
        employer_list_id: Some(EMPLOYER_LIST),
    }
}

/// Operator that accepts nothing until flags are switched on.
pub fn operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        operator_id: id,
        works_with_job_seekers: false,
        works_with_employers: false,
        auto_assign_job_seekers: false,
        auto_assign_employers: false,
        shares_job_posts: false,
        covered_countries: countries.iter().map(|c| cc(c)).collect::<HashSet<_>>(),
    }
}

pub fn seeker_operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        works_with_job_seekers: true,
        auto_assign_job_seekers: true,
        ..operator(id, countries)
    }
}

pub fn employer_operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        works_with_employers: true,
        auto_assign_employers: true,
        ..operator(id, countries)
    }
}

pub fn sharing_operator(id: DbId, countries: &[&str]) -> OperatorFocus {
    OperatorFocus {
        shares_job_posts: true,
        ..operator(id, countries)
    }
}

pub fn entity(
    entity_type: EntityType,
    id: DbId,
    name: &str,
    country: Option<&str>,
    created_at: Timestamp,
) -> ExternalEntity {
    ExternalEntity {
        id,
        entity_type,
        display_name: name.into(),
        country_code: country.map(cc),
        verified: true,
        archived: false,
        created_at,
    }
}

pub fn post_details(post_id: DbId, title: &str) -> JobPostDetails {
    JobPostDetails {
        post_id,
        title: title.into(),
        description: "Keep the books and prepare monthly reports.".into(),
        salary: Some("MWK 400,000".into()),
        slug: Some(format!("{}-{post_id}", title.to_lowercase())),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingDispatcher>,
    pub clock: Arc<FixedClock>,
    pub ports: Ports,
    pub pipeline: AssignmentPipeline,
    pub scanner: RecurrenceScanner,
}

impl Harness {
    pub fn new(now: Timestamp) -> Self {
        let store = Arc::new(MemoryStore::new());
        for list in [SEEKER_LIST, EMPLOYER_LIST, SHARING_LIST] {
            store.add_list(list);
        }
        let notifier = Arc::new(RecordingDispatcher::new());
        let clock = Arc::new(FixedClock::new(now));
        let ports = store.ports(notifier.clone(), clock.clone());
        Self {
            pipeline: AssignmentPipeline::new(ports.clone(), config()),
            scanner: RecurrenceScanner::new(ports.clone()),
            store,
            notifier,
            clock,
            ports,
        }
    }

    pub fn add_post(&self, id: DbId, title: &str, country: Option<&str>) -> ExternalEntity {
        let post = entity(EntityType::JobPost, id, title, country, at(2024, 3, 1, 8, 0));
        self.store.add_job_post(post.clone(), post_details(id, title));
        post
    }
}
