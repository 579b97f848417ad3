//! Request handlers. Each delegates to the shared
//! [`AssignmentPipeline`](jobroute_pipeline::AssignmentPipeline) and maps
//! errors via [`AppError`](crate::error::AppError).

pub mod assignments;
pub mod short_links;
pub mod webhooks;
