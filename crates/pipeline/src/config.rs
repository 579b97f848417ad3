use jobroute_core::entity::EntityType;
use jobroute_core::types::DbId;

/// Routing settings shared by the API server and the worker.
///
/// | Variable              | Default                      |
/// |-----------------------|------------------------------|
/// | `SHORT_URL_BASE`      | `http://localhost:3000/s`    |
/// | `JOB_BOARD_BASE_URL`  | `https://jobs.example.com`   |
/// | `JOB_SHARING_LIST_ID` | unset                        |
/// | `JOB_SEEKER_LIST_ID`  | unset                        |
/// | `EMPLOYER_LIST_ID`    | unset                        |
///
/// An unset list id is not a startup error: entities of that kind fail to
/// materialize and are reported per entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    pub short_url_base: String,
    pub job_board_base_url: String,
    pub job_sharing_list_id: Option<DbId>,
    pub job_seeker_list_id: Option<DbId>,
    pub employer_list_id: Option<DbId>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            short_url_base: "http://localhost:3000/s".into(),
            job_board_base_url: "https://jobs.example.com".into(),
            job_sharing_list_id: None,
            job_seeker_list_id: None,
            employer_list_id: None,
        }
    }
}

impl RoutingConfig {
    /// Load from environment variables, falling back to the defaults above.
    ///
    /// # Panics
    ///
    /// Panics if a list id is set but is not an integer.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            short_url_base: std::env::var("SHORT_URL_BASE")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.short_url_base),
            job_board_base_url: std::env::var("JOB_BOARD_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.job_board_base_url),
            job_sharing_list_id: list_id_var("JOB_SHARING_LIST_ID"),
            job_seeker_list_id: list_id_var("JOB_SEEKER_LIST_ID"),
            employer_list_id: list_id_var("EMPLOYER_LIST_ID"),
        }
    }

    /// Task list that tasks for `entity_type` are created in.
    pub fn list_for(&self, entity_type: EntityType) -> Option<DbId> {
        match entity_type {
            EntityType::JobSeeker => self.job_seeker_list_id,
            EntityType::Employer => self.employer_list_id,
            EntityType::JobPost => self.job_sharing_list_id,
        }
    }

    /// Public URL of a job post on the job board.
    ///
    /// The slug is encoded as a single path segment.
    pub fn apply_url(&self, post_id: DbId, slug: Option<&str>) -> String {
        match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => format!(
                "{}/jobs/{}",
                self.job_board_base_url,
                urlencoding::encode(slug)
            ),
            None => format!("{}/jobs/{post_id}", self.job_board_base_url),
        }
    }

    /// Full short URL for a code minted by the shortener.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{code}", self.short_url_base)
    }
}

fn list_id_var(name: &str) -> Option<DbId> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            v.trim()
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid integer"))
        })
}
