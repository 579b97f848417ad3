//! Read-only access to the external job-board directory.

use jobroute_core::entity::{CountryCode, EntityType};
use jobroute_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::directory::{DirectoryKey, DirectoryPost, DirectoryUser};

const POST_COLUMNS: &str = "\
    id, title, description, salary, slug, country_code, is_verified, is_archived, created_at";

const USER_COLUMNS: &str = "\
    id, name, user_kind, country_code, is_verified, is_archived, created_at";

/// Queries against `directory_posts` and `directory_users`.
pub struct DirectoryRepo;

impl DirectoryRepo {
    pub async fn find_post(pool: &PgPool, id: DbId) -> Result<Option<DirectoryPost>, sqlx::Error> {
        let query = format!("SELECT {POST_COLUMNS} FROM directory_posts WHERE id = $1");
        sqlx::query_as::<_, DirectoryPost>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job seeker or employer. Returns `None` when the id exists but
    /// belongs to the other kind of user.
    pub async fn find_user(
        pool: &PgPool,
        kind: EntityType,
        id: DbId,
    ) -> Result<Option<DirectoryUser>, sqlx::Error> {
        let query =
            format!("SELECT {USER_COLUMNS} FROM directory_users WHERE id = $1 AND user_kind = $2");
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Verified, non-archived posts created at or after `since`.
    pub async fn list_routable_posts_since(
        pool: &PgPool,
        since: Timestamp,
    ) -> Result<Vec<DirectoryPost>, sqlx::Error> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM directory_posts \
             WHERE is_verified AND NOT is_archived AND created_at >= $1 \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, DirectoryPost>(&query)
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Verified, non-archived users of one kind created at or after `since`.
    pub async fn list_routable_users_since(
        pool: &PgPool,
        kind: EntityType,
        since: Timestamp,
    ) -> Result<Vec<DirectoryUser>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM directory_users \
             WHERE user_kind = $1 AND is_verified AND NOT is_archived AND created_at >= $2 \
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, DirectoryUser>(&query)
            .bind(kind.as_str())
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Ids of every routable entity of a type, optionally restricted to one
    /// country.
    pub async fn list_routable_keys(
        pool: &PgPool,
        entity_type: EntityType,
        country: Option<&CountryCode>,
    ) -> Result<Vec<DirectoryKey>, sqlx::Error> {
        let country = country.map(CountryCode::as_str);
        match entity_type {
            EntityType::JobPost => {
                sqlx::query_as::<_, DirectoryKey>(
                    "SELECT id, country_code FROM directory_posts \
                     WHERE is_verified AND NOT is_archived \
                       AND ($1::text IS NULL OR upper(trim(country_code)) = $1) \
                     ORDER BY id",
                )
                .bind(country)
                .fetch_all(pool)
                .await
            }
            kind => {
                sqlx::query_as::<_, DirectoryKey>(
                    "SELECT id, country_code FROM directory_users \
                     WHERE user_kind = $1 AND is_verified AND NOT is_archived \
                       AND ($2::text IS NULL OR upper(trim(country_code)) = $2) \
                     ORDER BY id",
                )
                .bind(kind.as_str())
                .bind(country)
                .fetch_all(pool)
                .await
            }
        }
    }
}
