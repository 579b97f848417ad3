//! Domain core for the job-routing engine.
//!
//! Everything in this crate is pure: no I/O, no database, no runtime. The
//! persistence, event and HTTP layers build on these types.

pub mod clock;
pub mod eligibility;
pub mod entity;
pub mod error;
pub mod focus;
pub mod labels;
pub mod recurrence;
pub mod social;
pub mod task;
pub mod types;
