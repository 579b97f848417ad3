//! External entities read from the job-board directory.
//!
//! The directory is owned by another system; this crate only ever reads it.
//! Entity kinds are a closed set, so every consumer matches on
//! [`EntityType`] exhaustively instead of comparing integer tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// The kind of external entity being routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    JobSeeker,
    Employer,
    JobPost,
}

impl EntityType {
    /// Every entity type, in reporting order.
    pub const ALL: [EntityType; 3] = [
        EntityType::JobSeeker,
        EntityType::Employer,
        EntityType::JobPost,
    ];

    /// The value stored in `assignments.entity_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::JobSeeker => "job_seeker",
            EntityType::Employer => "employer",
            EntityType::JobPost => "job_post",
        }
    }

    /// Human-readable label used in task titles.
    pub fn label(self) -> &'static str {
        match self {
            EntityType::JobSeeker => "Job Seeker",
            EntityType::Employer => "Employer",
            EntityType::JobPost => "Job Post",
        }
    }

    /// Job posts fan out to every qualifying operator; users go to one.
    pub fn fans_out(self) -> bool {
        matches!(self, EntityType::JobPost)
    }
}

impl TryFrom<String> for EntityType {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "job_seeker" => Ok(EntityType::JobSeeker),
            "employer" => Ok(EntityType::Employer),
            "job_post" => Ok(EntityType::JobPost),
            other => Err(CoreError::Validation(format!(
                "Unknown entity type '{other}'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// CountryCode
// ---------------------------------------------------------------------------

/// ISO 3166-1 alpha-2 country code, always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Parse a two-letter code. Surrounding whitespace is trimmed and the
    /// letters are upper-cased.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::Validation(format!(
                "Invalid country code '{raw}': expected two ASCII letters"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CountryCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

// ---------------------------------------------------------------------------
// ExternalEntity
// ---------------------------------------------------------------------------

/// Identity of an external entity: its directory id plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    pub external_id: DbId,
    pub entity_type: EntityType,
}

/// A job seeker, employer or job post as read from the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalEntity {
    pub id: DbId,
    pub entity_type: EntityType,
    /// Person or company name for users, title for posts.
    pub display_name: String,
    pub country_code: Option<CountryCode>,
    pub verified: bool,
    pub archived: bool,
    pub created_at: Timestamp,
}

impl ExternalEntity {
    pub fn key(&self) -> EntityKey {
        EntityKey {
            external_id: self.id,
            entity_type: self.entity_type,
        }
    }

    /// Only verified, non-archived entities are ever routed.
    pub fn is_routable(&self) -> bool {
        self.verified && !self.archived
    }
}

/// Content of a job post needed to pre-format a social share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPostDetails {
    pub post_id: DbId,
    pub title: String,
    pub description: String,
    pub salary: Option<String>,
    pub slug: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
