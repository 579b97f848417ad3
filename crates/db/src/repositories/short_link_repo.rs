//! Repository for `short_links`.

use sqlx::PgPool;

use crate::models::short_link::ShortLink;

const COLUMNS: &str = "id, code, long_url, created_at";

pub struct ShortLinkRepo;

impl ShortLinkRepo {
    pub async fn find_by_url(
        pool: &PgPool,
        long_url: &str,
    ) -> Result<Option<ShortLink>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM short_links WHERE long_url = $1");
        sqlx::query_as::<_, ShortLink>(&query)
            .bind(long_url)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a code back to its long URL.
    pub async fn resolve(pool: &PgPool, code: &str) -> Result<Option<ShortLink>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM short_links WHERE code = $1");
        sqlx::query_as::<_, ShortLink>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new link. A clash on `code` or `long_url` surfaces as a
    /// unique violation for the caller to handle.
    pub async fn insert(
        pool: &PgPool,
        code: &str,
        long_url: &str,
    ) -> Result<ShortLink, sqlx::Error> {
        let query = format!(
            "INSERT INTO short_links (code, long_url) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ShortLink>(&query)
            .bind(code)
            .bind(long_url)
            .fetch_one(pool)
            .await
    }
}
