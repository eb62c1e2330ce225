use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("post not found: {0}")]
    PostNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("concurrent update conflict on {0}")]
    Conflict(String),
    #[error("network failure: {0}")]
    NetworkFailure(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            DomainError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            DomainError::PostNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::FileNotFound(_)
            | DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            DomainError::AlreadyExists(_) | DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::NetworkFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::Upstream(_) => StatusCode::BAD_GATEWAY,
            DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Backend failures are logged where they happen; clients get a generic message.
        let message = match self {
            DomainError::NetworkFailure(_) => "storage backend unavailable".to_string(),
            DomainError::Upstream(_) | DomainError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };
        let details = match self {
            DomainError::PostNotFound(resource)
            | DomainError::UserNotFound(resource)
            | DomainError::FileNotFound(resource) => Some(json!({ "resource": resource })),
            DomainError::Conflict(resource) => {
                Some(json!({ "resource": resource, "retryable": true }))
            }
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
