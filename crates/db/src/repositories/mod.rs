//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that accept
//! `&PgPool` (or `&mut PgConnection` when they must join a caller's
//! transaction) as the first argument.

pub mod assignment_repo;
pub mod directory_repo;
pub mod event_repo;
pub mod operator_focus_repo;
pub mod run_lock_repo;
pub mod short_link_repo;
pub mod task_repo;

pub use assignment_repo::AssignmentRepo;
pub use directory_repo::DirectoryRepo;
pub use event_repo::EventRepo;
pub use operator_focus_repo::OperatorFocusRepo;
pub use run_lock_repo::RunLockRepo;
pub use short_link_repo::ShortLinkRepo;
pub use task_repo::{TaskCompletionRepo, TaskListRepo, TaskRepo};
