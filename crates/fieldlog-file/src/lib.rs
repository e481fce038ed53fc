//! fieldlog-file - Filesystem-backed collaborators for local development.

mod blobs;
mod identity;
mod store;

use std::path::{Path, PathBuf};

use fieldlog_core::BackendUrl;

pub use blobs::FileBlobs;
pub use identity::{FileIdentity, LocalAccount};
pub use store::FileStore;

/// The three file collaborators sharing one data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    pub store: FileStore,
    pub blobs: FileBlobs,
    pub identity: FileIdentity,
}

impl FileBackend {
    /// Open (lazily) a backend rooted at `root`.
    pub fn open(root: impl AsRef<Path>, public_blob_url: Option<BackendUrl>) -> Self {
        let root: PathBuf = root.as_ref().to_path_buf();
        Self {
            store: FileStore::new(&root),
            blobs: FileBlobs::new(&root, public_blob_url),
            identity: FileIdentity::new(&root),
        }
    }
}
