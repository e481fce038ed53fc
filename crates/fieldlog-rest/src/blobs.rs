//! Object storage REST uploader.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::form_urlencoded::byte_serialize;

use fieldlog_core::error::{BackendError, Error};
use fieldlog_core::{BackendUrl, BlobUploader, Result};

use crate::client::RestClient;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata returned after an upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    /// Comma-separated download tokens.
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Uploads to `{storage}/v0/b/{bucket}/o?name={path}` and returns the
/// tokenized public download URL.
#[derive(Debug, Clone)]
pub struct RestBlobs {
    client: RestClient,
    bucket: String,
    token: Option<String>,
}

impl RestBlobs {
    pub fn new(storage: BackendUrl, bucket: impl Into<String>, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client: RestClient::new(storage).map_err(Error::UploadFailed)?,
            bucket: bucket.into(),
            token,
        })
    }

    fn objects_path(&self) -> String {
        format!("v0/b/{}/o", self.bucket)
    }

    /// Public URL of a stored object.
    pub fn download_url(&self, name: &str, download_token: Option<&str>) -> String {
        let encoded: String = byte_serialize(name.as_bytes()).collect();
        let mut url = self
            .client
            .url(&format!("{}/{}?alt=media", self.objects_path(), encoded));
        if let Some(token) = download_token {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

#[async_trait]
impl BlobUploader for RestBlobs {
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String> {
        let response: UploadResponse = self
            .client
            .post_bytes(
                &self.objects_path(),
                &[("name", path)],
                bytes.to_vec(),
                content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
                self.token.as_deref(),
            )
            .await
            .map_err(Error::UploadFailed)?;

        if response.name != path {
            return Err(Error::UploadFailed(BackendError::Decode {
                message: format!("stored as {:?}, expected {:?}", response.name, path),
            }));
        }

        let token = response
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|t| !t.is_empty());

        debug!(%path, "Uploaded blob");
        Ok(self.download_url(&response.name, token))
    }
}
