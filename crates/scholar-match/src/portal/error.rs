use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::repository::RepositoryError;
use crate::ingest::IngestError;
use crate::llm::LlmError;

/// Error raised by the portal services and mapped onto HTTP statuses.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("caller identity is missing")]
    Unauthorized,
    #[error("admin access required")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
    #[error("upload exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for PortalError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict("record already exists".to_string()),
            RepositoryError::NotFound => Self::NotFound("record".to_string()),
            other => Self::Repository(other),
        }
    }
}

impl PortalError {
    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Unauthorized => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden => StatusCode::FORBIDDEN,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PortalError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            PortalError::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
            PortalError::Ingest(err) => match err {
                IngestError::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
                IngestError::Repository(_) | IngestError::Worker(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            PortalError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
