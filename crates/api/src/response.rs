//! Shared response envelope types for API handlers.
//!
//! Read endpoints answer with a `{ "data": ... }` envelope. The webhook is
//! the exception: the job board expects its `{success, message, stats}`
//! body at the top level.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: rows }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
