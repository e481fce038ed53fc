//! Filesystem record store.
//!
//! The whole database is one JSON document at `{root}/db.json`. Every
//! operation takes an `fs2` lock on `{root}/db.lock` (shared for reads,
//! exclusive for writes), and writes go through a temp file and a rename,
//! so concurrent processes never see a torn tree.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use fieldlog_core::error::{BackendError, Error};
use fieldlog_core::{RecordKey, RecordStore, Result, push_id, tree};

fn store_failed(err: impl Into<BackendError>) -> Error {
    Error::StoreFailed(err.into())
}

/// Filesystem-backed record store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. Nothing is touched until first use.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn db_path(&self) -> PathBuf {
        self.root.join("db.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("db.lock")
    }

    fn open_lock(&self) -> Result<File> {
        fs::create_dir_all(&self.root).map_err(store_failed)?;
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(store_failed)
    }

    fn read_tree(&self) -> Result<Value> {
        let path = self.db_path();
        if !path.exists() {
            return Ok(Value::Object(Map::new()));
        }

        let content = fs::read_to_string(&path).map_err(store_failed)?;
        if content.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&content).map_err(store_failed)
    }

    fn write_tree(&self, root: &Value) -> Result<()> {
        let path = self.db_path();
        let content = serde_json::to_string_pretty(root).map_err(store_failed)?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content).map_err(store_failed)?;
        fs::rename(&temp_path, &path).map_err(store_failed)?;
        Ok(())
    }

    fn read_locked(&self) -> Result<Value> {
        let lock_file = self.open_lock()?;
        lock_file.lock_shared().map_err(store_failed)?;

        let result = self.read_tree();

        lock_file.unlock().map_err(store_failed)?;
        result
    }

    /// Read, modify and write the tree under the exclusive lock.
    fn mutate(&self, change: impl FnOnce(&mut Value)) -> Result<()> {
        let lock_file = self.open_lock()?;
        lock_file.lock_exclusive().map_err(store_failed)?;

        let result = self.read_tree().and_then(|mut root| {
            change(&mut root);
            self.write_tree(&root)
        });

        lock_file.unlock().map_err(store_failed)?;
        result
    }
}

#[async_trait]
impl RecordStore for FileStore {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let root = self.read_locked()?;
        Ok(tree::get(&root, path).cloned())
    }

    #[instrument(skip(self, value))]
    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        self.mutate(|root| tree::set(root, path, value.clone()))?;
        debug!("Wrote record");
        Ok(())
    }

    async fn push_key(&self, _collection: &str) -> Result<RecordKey> {
        Ok(push_id::generate())
    }

    #[instrument(skip(self, fields), fields(count = fields.len()))]
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        self.mutate(|root| tree::update(root, path, fields))?;
        debug!("Updated record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<()> {
        self.mutate(|root| tree::remove(root, path))?;
        debug!("Removed record");
        Ok(())
    }
}
