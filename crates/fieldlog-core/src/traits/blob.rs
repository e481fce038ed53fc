//! Blob uploader trait.

use async_trait::async_trait;

use crate::Result;

/// Binary object storage returning public URLs.
#[async_trait]
pub trait BlobUploader: Send + Sync {
    /// Store `bytes` at `path` (overwriting anything there) and return a
    /// URL the file can be downloaded from.
    ///
    /// Failures are reported as [`Error::UploadFailed`](crate::Error::UploadFailed).
    async fn upload(&self, path: &str, bytes: &[u8], content_type: Option<&str>)
    -> Result<String>;
}
