//! Job-routing API server library.
//!
//! Exposes config, state, error handling, the webhook token check and the
//! routes so integration tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
