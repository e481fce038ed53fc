//! Filesystem blob storage.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use fieldlog_core::error::{BackendError, Error};
use fieldlog_core::{BackendUrl, BlobUploader, Result};

fn upload_failed(err: impl Into<BackendError>) -> Error {
    Error::UploadFailed(err.into())
}

/// Stores blobs under `{root}/blobs/{path}`.
///
/// Returned URLs are `{public_base}/{path}` when a public base is
/// configured (a static file server in front of the blob directory), and
/// `file://` URLs otherwise.
#[derive(Debug, Clone)]
pub struct FileBlobs {
    root: PathBuf,
    public_base: Option<BackendUrl>,
}

impl FileBlobs {
    pub fn new(root: impl AsRef<Path>, public_base: Option<BackendUrl>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_base,
        }
    }

    fn blobs_dir(&self) -> PathBuf {
        self.root.join("blobs")
    }

    /// Filesystem location of the blob at `path`.
    ///
    /// Rejects paths that could escape the blob directory.
    pub fn blob_file(&self, path: &str) -> Result<PathBuf> {
        let mut file = self.blobs_dir();
        let mut segments = 0;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." || segment.contains('\\') {
                return Err(upload_failed(BackendError::Io {
                    message: format!("refusing blob path {:?}", path),
                }));
            }
            file.push(segment);
            segments += 1;
        }

        if segments == 0 {
            return Err(upload_failed(BackendError::Io {
                message: "blob path is empty".to_string(),
            }));
        }
        Ok(file)
    }

    fn public_url(&self, path: &str, file: &Path) -> Result<String> {
        if let Some(base) = &self.public_base {
            return Ok(base.join(path));
        }

        let absolute = if file.is_absolute() {
            file.to_path_buf()
        } else {
            std::env::current_dir().map_err(upload_failed)?.join(file)
        };
        Url::from_file_path(&absolute)
            .map(String::from)
            .map_err(|_| {
                upload_failed(BackendError::Io {
                    message: format!("cannot express {} as a URL", absolute.display()),
                })
            })
    }
}

#[async_trait]
impl BlobUploader for FileBlobs {
    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn upload(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<String> {
        let file = self.blob_file(path)?;

        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).map_err(upload_failed)?;
        }

        let temp_path = temp_path_for(&file);
        fs::write(&temp_path, bytes).map_err(upload_failed)?;
        fs::rename(&temp_path, &file).map_err(upload_failed)?;

        debug!(file = %file.display(), "Stored blob");
        self.public_url(path, &file)
    }
}

/// A unique sibling of `file` to write into before the rename.
fn temp_path_for(file: &Path) -> PathBuf {
    let mut name = file.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.uploading", Uuid::new_v4()));
    file.with_file_name(name)
}
