//! The reconciliation engine.
//!
//! Entities arrive from the directory (webhook or scheduled sync), are run
//! through the eligibility resolver, recorded in the assignment ledger
//! together with the task created for them, and announced through the
//! notification dispatcher. Separately, [`RecurrenceScanner`] advances due
//! recurring tasks.
//!
//! Storage and collaborators are reached only through the traits in
//! [`ports`]. [`adapters::postgres`] backs them with the database;
//! [`adapters::memory`] backs them with in-process state for tests and
//! local runs.

pub mod adapters;
pub mod assignment;
pub mod config;
pub mod error;
pub mod materializer;
pub mod ports;
pub mod scanner;

pub use assignment::{
    AssignmentPipeline, RouteOutcome, SharedPipeline, StatRow, StatsFilter, SyncSummary,
    WebhookOutcome,
};
pub use config::RoutingConfig;
pub use error::PipelineError;
pub use materializer::TaskMaterializer;
pub use ports::Ports;
pub use scanner::{RecurrenceScanner, ScanSummary};
