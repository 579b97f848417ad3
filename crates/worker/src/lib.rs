//! Scheduled batch runner for the job-routing engine.
//!
//! Two jobs run on fixed intervals: the recurring-task scan and the
//! assignment sync over recently created directory entities. Each can also
//! be triggered once from the command line. Overlapping runs are prevented
//! by the pipeline's run lock, not by this crate.

pub mod config;
pub mod scheduler;

pub use config::WorkerConfig;
pub use scheduler::Scheduler;
