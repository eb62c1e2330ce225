use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ClientError {
    pub async fn from_http_response(resp: Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    pub(crate) fn from_status(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized,
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::CONFLICT => ClientError::Conflict(message),
            s if s.is_client_error() => ClientError::InvalidRequest(message),
            s => ClientError::Server {
                status: s.as_u16(),
                message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_statuses_and_reads_error_message() {
        let err = ClientError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error":"validation failed: image is empty"}"#,
        );
        assert!(matches!(
            err,
            ClientError::InvalidRequest(m) if m == "validation failed: image is empty"
        ));

        let err = ClientError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, ClientError::Unauthorized));

        let err = ClientError::from_status(
            StatusCode::CONFLICT,
            r#"{"error":"concurrent update conflict on p1","details":{"retryable":true}}"#,
        );
        assert!(matches!(err, ClientError::Conflict(_)));

        let err = ClientError::from_status(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(
            err,
            ClientError::Server { status: 502, message } if message == "upstream down"
        ));
    }
}
