//! Record store trait.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;
use crate::types::RecordKey;

/// Keyed JSON document storage (a realtime database tree).
///
/// Paths are `/`-separated segments such as `fieldLogs/-Nx1a2b`. Every
/// failure is reported as [`Error::StoreFailed`](crate::Error::StoreFailed).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the document at `path`. `None` if nothing is stored there.
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Overwrite the document at `path`.
    async fn set(&self, path: &str, value: &Value) -> Result<()>;

    /// Reserve a fresh, chronologically ordered key under `collection`.
    ///
    /// Nothing is written until the caller calls [`RecordStore::set`].
    async fn push_key(&self, collection: &str) -> Result<RecordKey>;

    /// Replace only the given top-level children of the document at `path`.
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()>;

    /// Delete the document at `path`. Removing a missing path is not an error.
    async fn remove(&self, path: &str) -> Result<()>;
}
