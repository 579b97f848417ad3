use jobroute_core::error::CoreError;

/// Errors raised by the pipeline and its adapters.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PipelineError {
    /// Wrap a collaborator failure as [`CoreError::MaterializationFailed`].
    pub fn materialization(reason: impl std::fmt::Display) -> Self {
        Self::Core(CoreError::MaterializationFailed(reason.to_string()))
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Core(CoreError::DuplicateAssignment { .. }))
    }
}
