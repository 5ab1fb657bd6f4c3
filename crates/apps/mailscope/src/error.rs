//! HTTP mapping for service errors

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use serde_json::json;

/// A [`mail::Error`] on its way out of a handler
#[derive(Debug)]
pub struct ApiError(pub mail::Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            mail::Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            mail::Error::Upstream { status: Some(429), .. } => StatusCode::TOO_MANY_REQUESTS,
            mail::Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            mail::Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            mail::Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match &self.0 {
            mail::Error::Authentication(_) => "authentication_error",
            mail::Error::Upstream { .. } => "upstream_error",
            mail::Error::InvalidRequest(_) => "invalid_request",
            mail::Error::Internal(_) => "internal_error",
        }
    }
}

impl From<mail::Error> for ApiError {
    fn from(err: mail::Error) -> Self {
        Self(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self(mail::Error::Internal(anyhow::anyhow!("Request task failed: {}", err)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self.0 {
            mail::Error::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => {
                if status.is_server_error() {
                    warn!("{}", other);
                }
                other.to_string()
            }
        };

        (status, Json(json!({ "error": self.kind(), "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(mail::Error::authentication("no session")).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError(mail::Error::upstream(Some(429), "slow down")).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError(mail::Error::upstream(Some(500), "boom")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(mail::Error::upstream(None, "timeout")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(mail::Error::InvalidRequest("days".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let response =
            ApiError(mail::Error::Internal(anyhow::anyhow!("disk /secret full"))).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
