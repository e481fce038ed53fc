//! Realtime database REST store.
//!
//! Paths map to `{database}/{path}.json`; `set` is a PUT, `update` a PATCH
//! and `remove` a DELETE. A missing path reads back as JSON `null`.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use fieldlog_core::error::{BackendError, Error};
use fieldlog_core::{BackendUrl, RecordKey, RecordStore, Result, push_id};

use crate::client::RestClient;

fn store_failed(err: BackendError) -> Error {
    Error::StoreFailed(err)
}

/// Record store speaking the realtime database REST protocol.
#[derive(Debug, Clone)]
pub struct RestStore {
    client: RestClient,
    /// Database secret or access token, sent as the `auth` parameter.
    auth: Option<String>,
}

impl RestStore {
    pub fn new(database: BackendUrl, auth: Option<String>) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(database).map_err(store_failed)?,
            auth,
        })
    }

    fn resource(path: &str) -> String {
        format!("{}.json", path.trim_matches('/'))
    }

    fn query(&self) -> Vec<(&str, &str)> {
        match &self.auth {
            Some(auth) => vec![("auth", auth.as_str())],
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl RecordStore for RestStore {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let value: Value = self
            .client
            .get_json(&Self::resource(path), &self.query())
            .await
            .map_err(store_failed)?;

        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    #[instrument(skip(self, value))]
    async fn set(&self, path: &str, value: &Value) -> Result<()> {
        let _: Value = self
            .client
            .send_json(Method::PUT, &Self::resource(path), &self.query(), value)
            .await
            .map_err(store_failed)?;
        debug!("Wrote record");
        Ok(())
    }

    async fn push_key(&self, _collection: &str) -> Result<RecordKey> {
        // Push keys are generated client-side, as the database SDKs do.
        Ok(push_id::generate())
    }

    #[instrument(skip(self, fields), fields(count = fields.len()))]
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        let _: Value = self
            .client
            .send_json(Method::PATCH, &Self::resource(path), &self.query(), fields)
            .await
            .map_err(store_failed)?;
        debug!("Updated record");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, path: &str) -> Result<()> {
        self.client
            .send_no_response(Method::DELETE, &Self::resource(path), &self.query())
            .await
            .map_err(store_failed)?;
        debug!("Removed record");
        Ok(())
    }
}
