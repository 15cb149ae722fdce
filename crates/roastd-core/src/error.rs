/// Failures surfaced to callers of the workflow.
///
/// Upstream failures of the generation service or of the upload are not in
/// here: the orchestrator absorbs them into a degraded success.
#[derive(Debug, thiserror::Error)]
pub enum RoastError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    /// Link-code collision, or a prompt edit after generation started.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Something the request cannot do without is unreachable.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type RoastResult<T> = Result<T, RoastError>;

impl RoastError {
    pub fn session_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Session",
            key: key.into(),
        }
    }

    pub fn source_image_unavailable(reason: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable(format!("source image unavailable: {}", reason))
    }
}
