#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use fieldlog_core::error::{AuthError, BackendError, Error, ProtocolError};
use fieldlog_core::{
    BlobUploader, Credentials, FederatedIdentity, IdentityProvider, PhotoFile, RecordKey,
    RecordStore, Result, push_id, tree,
};
use serde_json::{Map, Value, json};

/// Record store over an in-memory JSON tree, counting writes.
#[derive(Default)]
pub struct MemoryStore {
    root: Mutex<Value>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(json!({})),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with(path: &str, value: Value) -> Self {
        let store = Self::new();
        tree::set(&mut store.root.lock().unwrap(), path, value);
        store
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn read(&self, path: &str) -> Option<Value> {
        tree::get(&self.root.lock().unwrap(), path).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.read(path))
    }

    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        tree::set(&mut self.root.lock().unwrap(), path, value.clone());
        Ok(())
    }

    async fn push_key(&self, _collection: &str) -> Result<RecordKey> {
        Ok(push_id::generate())
    }

    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        tree::update(&mut self.root.lock().unwrap(), path, fields);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        tree::remove(&mut self.root.lock().unwrap(), path);
        Ok(())
    }
}

/// Uploader that records every path and hands out `mem://` URLs.
///
/// Uploads whose path contains `fail_on` fail with an IO error.
#[derive(Default)]
pub struct RecordingUploader {
    paths: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl RecordingUploader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(fragment: &str) -> Self {
        Self {
            paths: Mutex::new(Vec::new()),
            fail_on: Some(fragment.to_string()),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.paths.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobUploader for RecordingUploader {
    async fn upload(&self, path: &str, _bytes: &[u8], _content_type: Option<&str>) -> Result<String> {
        if self.fail_on.as_deref().is_some_and(|f| path.contains(f)) {
            return Err(Error::UploadFailed(BackendError::Io {
                message: format!("refusing {}", path),
            }));
        }
        self.paths.lock().unwrap().push(path.to_string());
        Ok(format!("mem://{}", path))
    }
}

/// Identity provider keeping accounts in a map.
#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, (String, String)>>,
    federated: Mutex<HashMap<String, FederatedIdentity>>,
    resets: Mutex<Vec<String>>,
    next: AtomicUsize,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a federated sign-in for `identity`.
    pub fn allow_token(&self, token: &str, identity: FederatedIdentity) {
        self.federated
            .lock()
            .unwrap()
            .insert(token.to_string(), identity);
    }

    pub fn resets(&self) -> Vec<String> {
        self.resets.lock().unwrap().clone()
    }

    pub fn has_account(&self, uid: &str) -> bool {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .any(|(account_uid, _)| account_uid == uid)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn create_user(&self, credentials: &Credentials) -> Result<String> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(credentials.email()) {
            return Err(Error::Identity(BackendError::Protocol(ProtocolError::new(
                400,
                Some("EMAIL_EXISTS".to_string()),
                None,
            ))));
        }
        let uid = format!("uid{}", self.next.fetch_add(1, Ordering::SeqCst) + 1);
        accounts.insert(
            credentials.email().to_string(),
            (uid.clone(), credentials.password().to_string()),
        );
        Ok(uid)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<String> {
        match self.accounts.lock().unwrap().get(credentials.email()) {
            Some((uid, password)) if password == credentials.password() => Ok(uid.clone()),
            _ => Err(AuthError::InvalidCredentials("INVALID_LOGIN_CREDENTIALS".to_string()).into()),
        }
    }

    async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.resets.lock().unwrap().push(email.to_string());
        Ok(())
    }

    async fn verify_id_token(&self, id_token: &str) -> Result<FederatedIdentity> {
        self.federated
            .lock()
            .unwrap()
            .get(id_token)
            .cloned()
            .ok_or_else(|| AuthError::InvalidCredentials("INVALID_ID_TOKEN".to_string()).into())
    }

    async fn delete_user(&self, uid: &str) -> Result<()> {
        self.accounts
            .lock()
            .unwrap()
            .retain(|_, (account_uid, _)| account_uid != uid);
        Ok(())
    }
}

pub fn photo(name: &str) -> PhotoFile {
    PhotoFile::new(name, Some("image/jpeg".to_string()), name.as_bytes().to_vec())
}

pub fn photos(names: &[&str]) -> Vec<PhotoFile> {
    names.iter().map(|n| photo(n)).collect()
}
