//! Session tokens issued to signed-in users.
//!
//! Sessions are HS256 JWTs signed with a server secret. They carry the
//! profile fields clients display (name, photo, role) so that most requests
//! never need a profile lookup.

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Error};
use crate::model::{Role, UserProfile};

/// Default session lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(1);

/// A signed session token.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Treat as opaque; decode only through [`TokenIssuer::verify`]
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the encoded token.
    ///
    /// # Security
    ///
    /// Use only when writing a response body or authorization header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}

/// Claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    /// Issued at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A freshly issued token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SessionToken,
    /// Expiry in milliseconds since the epoch.
    pub expires_at_millis: i64,
}

/// Signs and verifies session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer for the given shared secret.
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `uid` carrying the profile's display fields.
    ///
    /// `email` overrides the profile email (the identity provider's address
    /// is authoritative right after sign-in).
    pub fn issue(
        &self,
        uid: &str,
        email: Option<&str>,
        profile: &UserProfile,
    ) -> Result<IssuedToken, Error> {
        let now = Utc::now();
        let expires = now + self.ttl;

        let claims = SessionClaims {
            uid: uid.to_string(),
            email: email.map(str::to_string).or_else(|| profile.email.clone()),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            photo_url: profile.photo_url.clone(),
            role: profile.role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(format!("failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token: SessionToken::new(token),
            expires_at_millis: claims.exp * 1000,
        })
    }

    /// Check a token's signature and expiry and return its claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired.into(),
                _ => AuthError::InvalidToken(e.to_string()).into(),
            })
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}
