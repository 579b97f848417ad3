//! Row models and DTOs.
//!
//! Each submodule contains a `FromRow` struct matching the database row and,
//! where rows are written, a create DTO. Rows that back a domain type from
//! `jobroute_core` provide a conversion into it.

pub mod assignment;
pub mod directory;
pub mod operator_focus;
pub mod short_link;
pub mod task;
