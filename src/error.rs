//! Error taxonomy shared by the state machine, the upstream proxy and the HTTP layer.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),
    /// Role or ownership mismatch.
    #[error("{0}")]
    Authorization(String),
    /// Current state disagrees with the requested transition.
    #[error("{0}")]
    PreconditionFailed(String),
    /// Upstream answered with a non-2xx status.
    #[error("upstream responded with status {status}")]
    Upstream { status: u16 },
    /// Upstream could not be reached at all.
    #[error("upstream unreachable: {0}")]
    Transport(String),
    /// Missing server configuration. Never retried.
    #[error("{0}")]
    Configuration(String),
    /// A multi-row write could not be completed and was rolled back.
    #[error("{0}")]
    Consistency(String),
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { resource, id } => Self::NotFound {
                resource,
                id: id.to_string(),
            },
            StoreError::Conflict(msg) => Self::PreconditionFailed(msg),
            StoreError::Inconsistent(msg) => Self::Consistency(msg),
            StoreError::Internal(e) => Self::Internal(e.to_string()),
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Upstream { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_)
            | Self::Consistency(_)
            | Self::NotFound { .. }
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("request failed: {self}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
