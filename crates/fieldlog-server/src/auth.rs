//! Bearer session authentication.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use fieldlog_core::{Error, SessionClaims};
use fieldlog_core::error::AuthError;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims of the caller's verified session token.
///
/// Rejects with 401 when the `Authorization: Bearer` header is missing,
/// malformed, expired or badly signed.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionClaims);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(Error::Auth(AuthError::MissingToken))?;
        let claims = state.accounts.authenticate(token)?;
        Ok(CurrentUser(claims))
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
