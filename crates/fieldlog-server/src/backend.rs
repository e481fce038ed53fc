//! Backend selection.
//!
//! The collaborators are built once at startup from [`BackendArgs`] and
//! shared by every request.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::info;

use fieldlog_core::{BackendUrl, BlobUploader, IdentityProvider, RecordStore};
use fieldlog_file::FileBackend;
use fieldlog_rest::{RestBlobs, RestIdentity, RestStore};

use crate::config::{BackendArgs, BackendKind};

/// Connected collaborators.
#[derive(Debug, Clone)]
pub enum Backend {
    File(FileBackend),
    Rest {
        store: RestStore,
        blobs: RestBlobs,
        identity: RestIdentity,
    },
}

impl Backend {
    /// Build the collaborators described by `args`.
    pub fn connect(args: &BackendArgs) -> Result<Self> {
        let database =
            BackendUrl::new(&args.database_url).context("Invalid database URL")?;

        let kind = args.backend.unwrap_or(if database.is_local() {
            BackendKind::File
        } else {
            BackendKind::Rest
        });

        match kind {
            BackendKind::File => {
                let root = database
                    .to_file_path()
                    .context("The file backend needs a file:// database URL")?;
                let public_blob_url = args
                    .public_blob_url
                    .as_deref()
                    .map(BackendUrl::new)
                    .transpose()
                    .context("Invalid public blob URL")?;

                info!(root = %root.display(), "Using file backend");
                Ok(Backend::File(FileBackend::open(root, public_blob_url)))
            }
            BackendKind::Rest => {
                if database.is_local() {
                    bail!("The REST backend needs an http(s) database URL");
                }
                let bucket = args
                    .storage_bucket
                    .clone()
                    .context("FIELDLOG_STORAGE_BUCKET is required for the REST backend")?;
                let api_key = args
                    .api_key
                    .clone()
                    .context("FIELDLOG_API_KEY is required for the REST backend")?;

                let storage = BackendUrl::new(&args.storage_url).context("Invalid storage URL")?;
                let identity =
                    BackendUrl::new(&args.identity_url).context("Invalid identity URL")?;

                info!(database = %database, bucket = %bucket, "Using REST backend");
                Ok(Backend::Rest {
                    store: RestStore::new(database, args.admin_token.clone())
                        .context("Failed to create database client")?,
                    blobs: RestBlobs::new(storage, bucket, args.admin_token.clone())
                        .context("Failed to create storage client")?,
                    identity: RestIdentity::new(identity, api_key, args.admin_token.clone())
                        .context("Failed to create identity client")?,
                })
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::File(_) => BackendKind::File,
            Backend::Rest { .. } => BackendKind::Rest,
        }
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        match self {
            Backend::File(file) => Arc::new(file.store.clone()),
            Backend::Rest { store, .. } => Arc::new(store.clone()),
        }
    }

    pub fn blobs(&self) -> Arc<dyn BlobUploader> {
        match self {
            Backend::File(file) => Arc::new(file.blobs.clone()),
            Backend::Rest { blobs, .. } => Arc::new(blobs.clone()),
        }
    }

    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        match self {
            Backend::File(file) => Arc::new(file.identity.clone()),
            Backend::Rest { identity, .. } => Arc::new(identity.clone()),
        }
    }
}
