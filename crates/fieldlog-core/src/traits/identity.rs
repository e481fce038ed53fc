//! Identity provider trait.

use async_trait::async_trait;

use crate::{Credentials, Result};

/// An identity asserted by a federated sign-in (Google, GitHub, Twitter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedIdentity {
    pub uid: String,
    /// Provider display name, if shared.
    pub name: Option<String>,
    pub email: Option<String>,
    /// Avatar URL, if shared.
    pub picture: Option<String>,
}

/// Account and credential verification service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password account and return its uid.
    async fn create_user(&self, credentials: &Credentials) -> Result<String>;

    /// Check an email/password pair and return the account uid.
    ///
    /// Rejected credentials are [`AuthError::InvalidCredentials`](crate::error::AuthError).
    async fn sign_in(&self, credentials: &Credentials) -> Result<String>;

    /// Send a password reset message to `email`.
    async fn send_password_reset(&self, email: &str) -> Result<()>;

    /// Verify an ID token minted by a federated sign-in.
    async fn verify_id_token(&self, id_token: &str) -> Result<FederatedIdentity>;

    /// Delete the account with the given uid.
    async fn delete_user(&self, uid: &str) -> Result<()>;
}
