//! Credentials and session tokens.

mod credentials;
mod tokens;

pub use credentials::Credentials;
pub use tokens::{DEFAULT_TOKEN_TTL, IssuedToken, SessionClaims, SessionToken, TokenIssuer};
