use axum::http::StatusCode;
use thiserror::Error;

/// Pipeline-aborting failures. Per-item task insert failures are not part of
/// this taxonomy; the emitter logs them and keeps going.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("tenantId is required")]
    MissingTenant,
    #[error("tenantId is not a valid uuid: {0}")]
    InvalidTenant(String),
    #[error("unknown scope: {0}")]
    InvalidScope(String),
    #[error("scope {0} requires a scopeId")]
    MissingScopeId(String),
    #[error("risk data unavailable: {0}")]
    DataUnavailable(#[source] sqlx::Error),
    #[error("database connection unavailable: {0}")]
    ServiceUnavailable(#[source] sqlx::Error),
}

impl PipelineError {
    /// Stable machine-readable slug carried in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MissingTenant
            | PipelineError::InvalidTenant(_)
            | PipelineError::InvalidScope(_)
            | PipelineError::MissingScopeId(_) => "invalid_request",
            PipelineError::DataUnavailable(_) => "data_unavailable",
            PipelineError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PipelineError::MissingTenant
            | PipelineError::InvalidTenant(_)
            | PipelineError::InvalidScope(_)
            | PipelineError::MissingScopeId(_) => StatusCode::BAD_REQUEST,
            PipelineError::DataUnavailable(_) | PipelineError::ServiceUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
