//! Identity Toolkit REST provider.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use fieldlog_core::error::{AuthError, BackendError, Error};
use fieldlog_core::{BackendUrl, Credentials, FederatedIdentity, IdentityProvider, Result};

use crate::client::RestClient;

const SIGN_UP: &str = "v1/accounts:signUp";
const SIGN_IN_WITH_PASSWORD: &str = "v1/accounts:signInWithPassword";
const SEND_OOB_CODE: &str = "v1/accounts:sendOobCode";
const LOOKUP: &str = "v1/accounts:lookup";
const DELETE: &str = "v1/accounts:delete";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    display_name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
}

/// Identity provider speaking the Identity Toolkit v1 REST API.
#[derive(Debug, Clone)]
pub struct RestIdentity {
    client: RestClient,
    api_key: String,
    /// OAuth access token for admin operations (account deletion).
    admin_token: Option<String>,
}

impl RestIdentity {
    pub fn new(
        identity: BackendUrl,
        api_key: impl Into<String>,
        admin_token: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(identity).map_err(Error::Identity)?,
            api_key: api_key.into(),
            admin_token,
        })
    }

    async fn call<B, R>(&self, endpoint: &str, body: &B) -> std::result::Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.client
            .send_json(Method::POST, endpoint, &[("key", self.api_key.as_str())], body)
            .await
    }
}

/// Rejected credentials become [`AuthError::InvalidCredentials`]; anything
/// else stays an identity failure.
fn credential_error(err: BackendError) -> Error {
    match err {
        BackendError::Protocol(p) if p.is_auth_error() => {
            let reason = p.code.clone().unwrap_or_else(|| p.to_string());
            AuthError::InvalidCredentials(reason).into()
        }
        other => Error::Identity(other),
    }
}

#[async_trait]
impl IdentityProvider for RestIdentity {
    #[instrument(skip(self, credentials))]
    async fn create_user(&self, credentials: &Credentials) -> Result<String> {
        let request = PasswordRequest {
            email: credentials.email(),
            password: credentials.password(),
            return_secure_token: true,
        };

        let response: AccountResponse = self.call(SIGN_UP, &request).await.map_err(Error::Identity)?;
        debug!(uid = %response.local_id, "Created account");
        Ok(response.local_id)
    }

    #[instrument(skip(self, credentials))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<String> {
        let request = PasswordRequest {
            email: credentials.email(),
            password: credentials.password(),
            return_secure_token: true,
        };

        let response: AccountResponse = self
            .call(SIGN_IN_WITH_PASSWORD, &request)
            .await
            .map_err(credential_error)?;
        Ok(response.local_id)
    }

    #[instrument(skip(self))]
    async fn send_password_reset(&self, email: &str) -> Result<()> {
        let request = json!({"requestType": "PASSWORD_RESET", "email": email});
        let _: Value = self
            .call(SEND_OOB_CODE, &request)
            .await
            .map_err(Error::Identity)?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify_id_token(&self, id_token: &str) -> Result<FederatedIdentity> {
        let response: LookupResponse = self
            .call(LOOKUP, &json!({"idToken": id_token}))
            .await
            .map_err(credential_error)?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::InvalidCredentials("INVALID_ID_TOKEN".to_string()))?;

        Ok(FederatedIdentity {
            uid: user.local_id,
            name: user.display_name,
            email: user.email,
            picture: user.photo_url,
        })
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, uid: &str) -> Result<()> {
        let request = self
            .client
            .request(Method::POST, DELETE, self.admin_token.as_deref())
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({"localId": uid}));

        let _: Value = self.client.send(request).await.map_err(Error::Identity)?;
        debug!("Deleted account");
        Ok(())
    }
}
