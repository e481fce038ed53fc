//! HTTP error responses.
//!
//! Every handler returns [`ApiError`] on failure. The body is always
//! `{"success": false, "message": ..., "error"?: ...}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use fieldlog_core::Error;
use fieldlog_core::error::{AuthError, BackendError};

use crate::multipart::UploadError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] Error),

    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Refused without consulting a service.
    #[error("{0}")]
    Forbidden(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Service(err) => service_status(err),
            ApiError::Upload(err) => err.status(),
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Service(Error::BadRequest(e)) => e.to_string(),
            ApiError::Service(Error::NotFound(e)) => e.to_string(),
            ApiError::Service(Error::UploadFailed(_)) => "Failed to upload photos".to_string(),
            ApiError::Service(Error::StoreFailed(_)) => "Failed to access the database".to_string(),
            ApiError::Service(Error::Identity(BackendError::Protocol(p))) => p
                .code
                .clone()
                .unwrap_or_else(|| "Identity provider error".to_string()),
            ApiError::Service(Error::Identity(_)) => "Identity provider error".to_string(),
            ApiError::Service(Error::Auth(AuthError::MissingToken)) => {
                "No token provided".to_string()
            }
            ApiError::Service(Error::Auth(AuthError::Inactive)) => "User is inactive".to_string(),
            ApiError::Service(Error::Auth(AuthError::TokenExpired)) => {
                "Token has expired".to_string()
            }
            ApiError::Service(Error::Auth(_)) => "Invalid credentials".to_string(),
            other => other.to_string(),
        }
    }
}

fn service_status(err: &Error) -> StatusCode {
    match err {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Auth(AuthError::Inactive) => StatusCode::FORBIDDEN,
        Error::Auth(_) => StatusCode::UNAUTHORIZED,
        Error::Identity(BackendError::Protocol(p)) if p.is_auth_error() => {
            StatusCode::UNAUTHORIZED
        }
        Error::Identity(BackendError::Protocol(p)) if (400..500).contains(&p.status) => {
            StatusCode::BAD_REQUEST
        }
        Error::UploadFailed(_) | Error::StoreFailed(_) | Error::Identity(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "success": false,
            "message": self.message(),
        });

        // Only server faults expose the underlying cause.
        if status.is_server_error() {
            body["error"] = json!(self.to_string());
        }

        (status, Json(body)).into_response()
    }
}
