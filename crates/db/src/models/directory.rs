//! Read-only rows from the external job-board directory.

use jobroute_core::entity::{CountryCode, EntityType, ExternalEntity, JobPostDetails};
use jobroute_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Parse a stored country code, dropping values the directory got wrong.
fn parse_country(raw: Option<&str>, source: &'static str, id: DbId) -> Option<CountryCode> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match CountryCode::parse(raw) {
        Ok(cc) => Some(cc),
        Err(e) => {
            tracing::warn!(source, id, error = %e, "Ignoring invalid directory country code");
            None
        }
    }
}

/// A row from `directory_posts`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DirectoryPost {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub salary: Option<String>,
    pub slug: Option<String>,
    pub country_code: Option<String>,
    pub is_verified: bool,
    pub is_archived: bool,
    pub created_at: Timestamp,
}

impl DirectoryPost {
    pub fn to_entity(&self) -> ExternalEntity {
        ExternalEntity {
            id: self.id,
            entity_type: EntityType::JobPost,
            display_name: self.title.clone(),
            country_code: parse_country(self.country_code.as_deref(), "directory_posts", self.id),
            verified: self.is_verified,
            archived: self.is_archived,
            created_at: self.created_at,
        }
    }

    pub fn to_details(&self) -> JobPostDetails {
        JobPostDetails {
            post_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            salary: self.salary.clone(),
            slug: self.slug.clone(),
        }
    }
}

/// A row from `directory_users` (job seekers and employers).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DirectoryUser {
    pub id: DbId,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub user_kind: EntityType,
    pub country_code: Option<String>,
    pub is_verified: bool,
    pub is_archived: bool,
    pub created_at: Timestamp,
}

impl DirectoryUser {
    pub fn to_entity(&self) -> ExternalEntity {
        ExternalEntity {
            id: self.id,
            entity_type: self.user_kind,
            display_name: self.name.clone(),
            country_code: parse_country(self.country_code.as_deref(), "directory_users", self.id),
            verified: self.is_verified,
            archived: self.is_archived,
            created_at: self.created_at,
        }
    }
}

/// Id and country of a routable directory entity, used for statistics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DirectoryKey {
    pub id: DbId,
    pub country_code: Option<String>,
}
