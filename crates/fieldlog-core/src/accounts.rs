//! User accounts and sessions.
//!
//! Credentials live with the [`IdentityProvider`]; profiles live in the
//! record store at `users/{uid}`. Every successful sign-in path ends with a
//! session token from the [`TokenIssuer`].

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::Result;
use crate::auth::{Credentials, IssuedToken, SessionClaims, TokenIssuer};
use crate::error::{AuthError, BackendError, Error, InvalidInputError, NotFoundError};
use crate::logs::{decode_children, codec_failed};
use crate::model::{PhotoFile, Role, UserProfile, UserRecord, UserStatus, split_display_name};
use crate::traits::{BlobUploader, IdentityProvider, RecordStore};
use crate::types::RecordKey;

/// Store collection holding user profiles.
pub const USERS: &str = "users";

fn user_path(uid: &RecordKey) -> String {
    format!("{}/{}", USERS, uid)
}

/// Registration form as submitted. Every field is required.
#[derive(Debug, Default)]
pub struct Registration {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub photo: Option<PhotoFile>,
}

/// A signed-in user and their fresh session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserRecord,
    pub token: IssuedToken,
}

/// Federated sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FederatedProvider {
    Google,
    Github,
    Twitter,
}

impl FederatedProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            FederatedProvider::Google => "google",
            FederatedProvider::Github => "github",
            FederatedProvider::Twitter => "twitter",
        }
    }

    /// Twitter does not share an email address.
    pub fn shares_email(&self) -> bool {
        !matches!(self, FederatedProvider::Twitter)
    }
}

impl fmt::Display for FederatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters for [`AccountService::search`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    /// Case-insensitive substring of first name, last name or email.
    pub q: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserQuery {
    pub fn matches(&self, user: &UserRecord) -> bool {
        let profile = &user.profile;

        if self.role.is_some_and(|role| profile.role != role) {
            return false;
        }
        if self.status.is_some_and(|status| profile.status != status) {
            return false;
        }

        match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            None => true,
            Some(q) => {
                let needle = q.to_lowercase();
                [
                    Some(profile.first_name.as_str()),
                    Some(profile.last_name.as_str()),
                    profile.email.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Account operations over injected collaborators.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobUploader>,
    identity: Arc<dyn IdentityProvider>,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobUploader>,
        identity: Arc<dyn IdentityProvider>,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            store,
            blobs,
            identity,
            tokens,
        }
    }

    /// Create an account, upload its profile photo and store the profile.
    #[instrument(skip_all)]
    pub async fn register(&self, form: Registration) -> Result<Session> {
        let result = async {
            let mut missing = Vec::new();
            let first_name = required(form.first_name, "firstName", &mut missing);
            let last_name = required(form.last_name, "lastName", &mut missing);
            let email = required(form.email, "email", &mut missing);
            let password = required(form.password, "password", &mut missing);
            let role = required(form.role, "role", &mut missing);
            let photo = form.photo.filter(|p| !p.is_empty());
            if photo.is_none() {
                missing.push("photo");
            }

            let Some(photo) = photo.filter(|_| missing.is_empty()) else {
                return Err(InvalidInputError::MissingFields { fields: missing }.into());
            };

            let role: Role = role.parse()?;
            let credentials = Credentials::new(email.trim(), password);

            let uid = self.identity.create_user(&credentials).await?;
            let uid = identity_key(uid)?;

            let photo_url = self
                .blobs
                .upload(
                    &format!("{}/{}/profile.jpg", USERS, uid),
                    &photo.bytes,
                    photo.content_type.as_deref(),
                )
                .await?;

            let profile = UserProfile {
                first_name,
                last_name,
                email: Some(credentials.email().to_string()),
                photo_url: Some(photo_url),
                role,
                status: UserStatus::Active,
                extra: Map::new(),
            };
            let value = profile.to_value().map_err(codec_failed)?;
            self.store.set(&user_path(&uid), &value).await?;

            info!(%uid, %role, "Registered user");
            self.open_session(uid, Some(credentials.email()), profile)
        }
        .await;

        result.inspect_err(|e| error!(operation = "register", error = %e, "Account operation failed"))
    }

    /// Email/password sign-in.
    #[instrument(skip_all)]
    pub async fn login(&self, email: Option<&str>, password: Option<&str>) -> Result<Session> {
        let result = async {
            let (Some(email), Some(password)) = (
                email.map(str::trim).filter(|e| !e.is_empty()),
                password.filter(|p| !p.is_empty()),
            ) else {
                return Err(Error::bad_request("email and password are required"));
            };
            let credentials = Credentials::new(email, password);

            let uid = identity_key(self.identity.sign_in(&credentials).await?)?;
            let profile = self
                .load_profile(&uid)
                .await?
                .ok_or_else(|| NotFoundError::new("user", uid.as_str()))?;

            if profile.is_inactive() {
                return Err(AuthError::Inactive.into());
            }

            debug!(%uid, "Signed in");
            self.open_session(uid, Some(email), profile)
        }
        .await;

        result.inspect_err(|e| error!(operation = "login", error = %e, "Account operation failed"))
    }

    /// Sign in with a provider token, creating the profile on first use.
    #[instrument(skip(self, token))]
    pub async fn federated_login(
        &self,
        provider: FederatedProvider,
        token: Option<&str>,
    ) -> Result<Session> {
        let result = async {
            let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
                return Err(Error::bad_request(format!("{} token is required", provider)));
            };

            let identity = self.identity.verify_id_token(token).await?;
            let uid = identity_key(identity.uid)?;
            let email = identity.email.filter(|_| provider.shares_email());

            let profile = match self.load_profile(&uid).await? {
                Some(profile) => profile,
                None => {
                    let (first_name, last_name) = split_display_name(identity.name.as_deref());
                    let profile = UserProfile {
                        first_name,
                        last_name,
                        email: email.clone(),
                        photo_url: identity.picture,
                        role: Role::Colaborador,
                        status: UserStatus::Active,
                        extra: Map::new(),
                    };
                    let value = profile.to_value().map_err(codec_failed)?;
            self.store.set(&user_path(&uid), &value).await?;
                    info!(%uid, %provider, "Created profile from federated identity");
                    profile
                }
            };

            if profile.is_inactive() {
                return Err(AuthError::Inactive.into());
            }

            self.open_session(uid, email.as_deref(), profile)
        }
        .await;

        result.inspect_err(|e| error!(operation = "federated_login", %provider, error = %e, "Account operation failed"))
    }

    #[instrument(skip(self))]
    pub async fn reset_password(&self, email: Option<&str>) -> Result<()> {
        let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
            return Err(Error::bad_request("email is required"));
        };

        self.identity
            .send_password_reset(email)
            .await
            .inspect_err(|e| error!(operation = "reset_password", error = %e, "Account operation failed"))
    }

    /// Check a session token's signature and expiry. No store access.
    pub fn authenticate(&self, token: &str) -> Result<SessionClaims> {
        self.tokens.verify(token)
    }

    /// Check a session token and load the profile it names.
    #[instrument(skip_all)]
    pub async fn verify_session(&self, token: &str) -> Result<(SessionClaims, UserRecord)> {
        let claims = self.authenticate(token)?;
        let uid = RecordKey::new(claims.uid.as_str())
            .map_err(|_| AuthError::InvalidToken("token names an invalid uid".to_string()))?;

        let user = self.get_user(&uid).await?;
        Ok((claims, user))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, uid: &RecordKey) -> Result<UserRecord> {
        let profile = self
            .load_profile(uid)
            .await?
            .ok_or_else(|| NotFoundError::new("user", uid.as_str()))?;

        Ok(UserRecord {
            uid: uid.clone(),
            profile,
        })
    }

    /// Every stored profile.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<UserRecord>> {
        self.search(&UserQuery::default()).await
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &UserQuery) -> Result<Vec<UserRecord>> {
        let result = async {
            let Some(value) = self.store.get(USERS).await? else {
                return Ok(Vec::new());
            };

            let users = decode_children(value, |uid, doc| {
                let profile = serde_json::from_value::<UserProfile>(doc).ok()?;
                let user = UserRecord { uid, profile };
                query.matches(&user).then_some(user)
            });
            debug!(count = users.len(), "Searched users");
            Ok(users)
        }
        .await;

        result.inspect_err(|e| error!(operation = "search_users", error = %e, "Account operation failed"))
    }

    /// Shallow update of a stored profile. `uid` is never written and a
    /// supplied `role` or `status` must be valid.
    #[instrument(skip(self, fields))]
    pub async fn update_user(
        &self,
        uid: &RecordKey,
        mut fields: Map<String, Value>,
    ) -> Result<UserRecord> {
        let result = async {
            fields.remove("uid");

            if let Some(role) = fields.get("role") {
                let role: Role = role
                    .as_str()
                    .ok_or_else(|| InvalidInputError::Role {
                        value: role.to_string(),
                    })?
                    .parse()?;
                fields.insert("role".to_string(), Value::String(role.as_str().to_string()));
            }

            if let Some(status) = fields.get("status") {
                serde_json::from_value::<UserStatus>(status.clone()).map_err(|_| {
                    Error::bad_request(format!("invalid status {}", status))
                })?;
            }

            if fields.is_empty() {
                return Err(Error::bad_request("no fields to update"));
            }

            self.get_user(uid).await?;
            self.store.update(&user_path(uid), &fields).await?;

            info!(fields = fields.len(), "Updated user");
            self.get_user(uid).await
        }
        .await;

        result.inspect_err(|e| error!(operation = "update_user", %uid, error = %e, "Account operation failed"))
    }

    /// Remove the profile, then the identity.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, uid: &RecordKey) -> Result<()> {
        let result = async {
            self.store.remove(&user_path(uid)).await?;
            self.identity.delete_user(uid.as_str()).await?;
            info!("Deleted user");
            Ok(())
        }
        .await;

        result.inspect_err(|e| error!(operation = "delete_user", %uid, error = %e, "Account operation failed"))
    }

    async fn load_profile(&self, uid: &RecordKey) -> Result<Option<UserProfile>> {
        match self.store.get(&user_path(uid)).await? {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(codec_failed),
        }
    }

    fn open_session(
        &self,
        uid: RecordKey,
        email: Option<&str>,
        profile: UserProfile,
    ) -> Result<Session> {
        let token = self.tokens.issue(uid.as_str(), email, &profile)?;
        Ok(Session {
            user: UserRecord { uid, profile },
            token,
        })
    }
}

fn required(value: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v,
        None => {
            missing.push(name);
            String::new()
        }
    }
}

fn identity_key(uid: String) -> Result<RecordKey> {
    RecordKey::new(uid.as_str()).map_err(|_| {
        Error::Identity(BackendError::Decode {
            message: format!("identity provider returned unusable uid {:?}", uid),
        })
    })
}
