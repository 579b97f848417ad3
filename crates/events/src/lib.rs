//! Event bus and notification plumbing for the job-routing engine.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the event envelope carried on the bus.
//! - [`NotificationDispatcher`]: the capability the pipeline calls after an
//!   assignment or a recurrence, with [`BusNotificationDispatcher`] as the
//!   bus-backed implementation.
//! - [`EventPersistence`]: background service that writes every event to the
//!   `events` table.

pub mod bus;
pub mod dispatcher;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use dispatcher::{BusNotificationDispatcher, NotificationDispatcher};
pub use persistence::EventPersistence;
