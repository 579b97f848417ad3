//! Short links minted for shared job posts.

use jobroute_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `short_links` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ShortLink {
    pub id: DbId,
    pub code: String,
    pub long_url: String,
    pub created_at: Timestamp,
}
