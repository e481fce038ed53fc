//! Error types for field log operations.
//!
//! Every service call returns the unified [`Error`], whose variants are the
//! failure kinds callers react to: malformed input, a missing record, a
//! failed blob upload, a failed store write, or an authentication problem.
//! Collaborator failures keep their original cause in a [`BackendError`].

use std::fmt;
use thiserror::Error;

/// The unified error type for field log operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input.
    #[error("bad request: {0}")]
    BadRequest(#[from] InvalidInputError),

    /// No record exists at the requested key.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// A blob upload failed. Carries the uploader's original error.
    #[error("upload failed: {0}")]
    UploadFailed(#[source] BackendError),

    /// A record store read or write failed.
    #[error("store failed: {0}")]
    StoreFailed(#[source] BackendError),

    /// The identity provider rejected or failed a request.
    #[error("identity provider error: {0}")]
    Identity(#[source] BackendError),

    /// Authentication errors (bad credentials, inactive user, bad token).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl Error {
    /// Shorthand for [`InvalidInputError::Other`].
    pub fn bad_request(message: impl Into<String>) -> Self {
        Error::BadRequest(InvalidInputError::Other {
            message: message.into(),
        })
    }

    /// Returns true if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// A lookup that found nothing.
#[derive(Debug, Error)]
#[error("{kind} '{key}' does not exist")]
pub struct NotFoundError {
    /// What was looked up ("field log", "user", ...).
    pub kind: &'static str,
    /// The key that was looked up.
    pub key: String,
}

impl NotFoundError {
    pub fn new(kind: &'static str, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }
}

/// Failure reported by a collaborator (store, blob storage, identity).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network transport errors (connection, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote service answered with an error status.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Local filesystem failure.
    #[error("IO error: {message}")]
    Io { message: String },

    /// A response or stored document could not be decoded.
    #[error("decode error: {message}")]
    Decode { message: String },
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode {
            message: err.to_string(),
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// An error status returned by a remote service.
#[derive(Debug)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Service error code, if present (`EMAIL_EXISTS`, `Permission denied`, ...).
    pub code: Option<String>,
    /// Error message from the service.
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref code) = self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, code: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    /// Check if the service rejected the caller's credentials.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
            || self.status == 403
            || matches!(
                self.code.as_deref(),
                Some("INVALID_PASSWORD")
                    | Some("EMAIL_NOT_FOUND")
                    | Some("INVALID_LOGIN_CREDENTIALS")
                    | Some("INVALID_ID_TOKEN")
                    | Some("USER_DISABLED")
            )
    }
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email/password or provider token rejected.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The user profile is marked inactive.
    #[error("user is inactive")]
    Inactive,

    /// A session token has expired.
    #[error("token expired")]
    TokenExpired,

    /// A session token is malformed or has a bad signature.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// No session token was presented.
    #[error("token not provided")]
    MissingToken,
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid record key.
    #[error("invalid record key '{value}': {reason}")]
    RecordKey { value: String, reason: String },

    /// Invalid backend URL.
    #[error("invalid backend URL '{value}': {reason}")]
    BackendUrl { value: String, reason: String },

    /// A field log payload that does not have the expected shape.
    #[error("malformed field log: {reason}")]
    FieldLog { reason: String },

    /// Unknown user role.
    #[error("invalid role '{value}'")]
    Role { value: String },

    /// Required fields are missing.
    #[error("missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    /// Generic invalid input.
    #[error("{message}")]
    Other { message: String },
}
