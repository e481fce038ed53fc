//! Filesystem identity provider.
//!
//! Accounts live at `{root}/identity/accounts/{uid}/account.json` with
//! bcrypt password hashes. Federated sign-in accepts local ID tokens, which
//! are plain JSON identities minted by [`FileIdentity::mint_id_token`];
//! this backend is for development and tests only.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use fieldlog_core::error::{AuthError, BackendError, Error, ProtocolError};
use fieldlog_core::{Credentials, FederatedIdentity, IdentityProvider, Result};

/// Shortest password accepted for a new account.
const MIN_PASSWORD_LEN: usize = 6;

fn identity_failed(err: impl Into<BackendError>) -> Error {
    Error::Identity(err.into())
}

fn rejected(code: &str, message: impl Into<String>) -> Error {
    Error::Identity(BackendError::Protocol(ProtocolError::new(
        400,
        Some(code.to_string()),
        Some(message.into()),
    )))
}

/// Account stored by the file identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    pub uid: String,
    pub email: String,
    pub created_at: String,
    /// Password hash (bcrypt).
    pub password_hash: String,
}

/// Filesystem-backed identity provider.
#[derive(Debug, Clone)]
pub struct FileIdentity {
    root: PathBuf,
}

impl FileIdentity {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn identity_dir(&self) -> PathBuf {
        self.root.join("identity")
    }

    fn accounts_dir(&self) -> PathBuf {
        self.identity_dir().join("accounts")
    }

    fn account_path(&self, uid: &str) -> PathBuf {
        self.accounts_dir().join(uid).join("account.json")
    }

    /// Log of requested password resets, one JSON object per line.
    pub fn resets_path(&self) -> PathBuf {
        self.identity_dir().join("password-resets.jsonl")
    }

    fn resets_lock_path(&self) -> PathBuf {
        self.identity_dir().join("password-resets.lock")
    }

    /// Encode an identity as a token [`IdentityProvider::verify_id_token`]
    /// accepts.
    pub fn mint_id_token(identity: &FederatedIdentity) -> String {
        json!({
            "uid": identity.uid,
            "name": identity.name,
            "email": identity.email,
            "picture": identity.picture,
        })
        .to_string()
    }

    fn parse_id_token(token: &str) -> Result<FederatedIdentity> {
        let invalid = |reason: &str| -> Error {
            AuthError::InvalidCredentials(format!("invalid ID token: {}", reason)).into()
        };

        let value: serde_json::Value =
            serde_json::from_str(token).map_err(|_| invalid("not a local token"))?;

        let uid = value
            .get("uid")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing 'uid'"))?;

        let text = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);

        Ok(FederatedIdentity {
            uid: uid.to_string(),
            name: text("name"),
            email: text("email"),
            picture: text("picture"),
        })
    }

    pub fn list_accounts(&self) -> Result<Vec<LocalAccount>> {
        let accounts_dir = self.accounts_dir();

        if !accounts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut accounts = Vec::new();

        for entry in fs::read_dir(&accounts_dir).map_err(identity_failed)? {
            let entry = entry.map_err(identity_failed)?;
            let account_file = entry.path().join("account.json");

            if account_file.exists() {
                let content = fs::read_to_string(&account_file).map_err(identity_failed)?;
                if let Ok(account) = serde_json::from_str::<LocalAccount>(&content) {
                    accounts.push(account);
                }
            }
        }

        Ok(accounts)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<LocalAccount>> {
        let accounts = self.list_accounts()?;
        Ok(accounts
            .into_iter()
            .find(|a| a.email.eq_ignore_ascii_case(email)))
    }
}

#[async_trait]
impl IdentityProvider for FileIdentity {
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    async fn create_user(&self, credentials: &Credentials) -> Result<String> {
        if credentials.password().len() < MIN_PASSWORD_LEN {
            return Err(rejected(
                "WEAK_PASSWORD",
                format!("password must be at least {} characters", MIN_PASSWORD_LEN),
            ));
        }
        if self.find_by_email(credentials.email())?.is_some() {
            return Err(rejected("EMAIL_EXISTS", "email already in use"));
        }

        let password_hash = hash(credentials.password(), DEFAULT_COST).map_err(|e| {
            identity_failed(BackendError::Io {
                message: e.to_string(),
            })
        })?;

        let uid = Uuid::new_v4().simple().to_string();
        let account = LocalAccount {
            uid: uid.clone(),
            email: credentials.email().to_string(),
            created_at: Utc::now().to_rfc3339(),
            password_hash,
        };

        let account_path = self.account_path(&uid);
        if let Some(parent) = account_path.parent() {
            fs::create_dir_all(parent).map_err(identity_failed)?;
        }

        let content = serde_json::to_string_pretty(&account).map_err(identity_failed)?;
        fs::write(&account_path, content).map_err(identity_failed)?;

        debug!(%uid, "Created local account");
        Ok(uid)
    }

    #[instrument(skip(self, credentials))]
    async fn sign_in(&self, credentials: &Credentials) -> Result<String> {
        let account = self
            .find_by_email(credentials.email())?
            .ok_or_else(|| AuthError::InvalidCredentials("INVALID_LOGIN_CREDENTIALS".to_string()))?;

        let ok = verify(credentials.password(), &account.password_hash).map_err(|e| {
            identity_failed(BackendError::Decode {
                message: e.to_string(),
            })
        })?;

        if !ok {
            return Err(AuthError::InvalidCredentials("INVALID_LOGIN_CREDENTIALS".to_string()).into());
        }

        Ok(account.uid)
    }

    /// Records the request. Unknown addresses are recorded too, so callers
    /// cannot probe which emails have accounts.
    #[instrument(skip(self))]
    async fn send_password_reset(&self, email: &str) -> Result<()> {
        fs::create_dir_all(self.identity_dir()).map_err(identity_failed)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.resets_lock_path())
            .map_err(identity_failed)?;
        lock_file.lock_exclusive().map_err(identity_failed)?;

        let known = self.find_by_email(email)?.is_some();
        let line = json!({
            "email": email,
            "known": known,
            "time": Utc::now().to_rfc3339(),
        });

        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.resets_path())
            .and_then(|mut file| {
                writeln!(file, "{}", line)?;
                file.sync_data()
            });

        lock_file.unlock().map_err(identity_failed)?;
        written.map_err(identity_failed)?;

        debug!(known, "Recorded password reset request");
        Ok(())
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<FederatedIdentity> {
        Self::parse_id_token(id_token)
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, uid: &str) -> Result<()> {
        if uid.is_empty() || uid.contains(['/', '\\', '.']) {
            return Err(rejected("INVALID_ID", "invalid uid"));
        }

        let account_dir = self.accounts_dir().join(uid);
        if !account_dir.exists() {
            return Err(rejected("USER_NOT_FOUND", format!("no account {}", uid)));
        }

        fs::remove_dir_all(&account_dir).map_err(identity_failed)?;
        debug!("Removed local account");
        Ok(())
    }
}
