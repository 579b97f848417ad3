//! Implementations of the [`crate::ports`] traits.

pub mod memory;
pub mod postgres;
