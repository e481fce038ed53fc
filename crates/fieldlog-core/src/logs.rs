//! Field log service.
//!
//! Wires the reconciler and the creation path to the record store and blob
//! uploader, and provides the plain read, soft-delete and comment
//! operations. Logs live at `fieldLogs/{id}`, comments at
//! `comments/{logId}/{commentId}`.
//!
//! An update reads the stored log and later overwrites it without any
//! version check, so two concurrent edits of the same log can lose one of
//! them.

use std::cmp::Reverse;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::auth::SessionClaims;
use crate::error::{BackendError, Error, NotFoundError};
use crate::model::{Comment, CommentRecord, FieldLog, FieldLogRecord, LogDraft, PhotoFile};
use crate::reconcile;
use crate::traits::{BlobUploader, RecordStore};
use crate::types::{RecordKey, Timestamp};
use crate::Result;

/// Store collection holding field logs.
pub const FIELD_LOGS: &str = "fieldLogs";

/// Store collection holding comments, grouped by log id.
pub const COMMENTS: &str = "comments";

/// Longest accepted comment, in characters.
const MAX_COMMENT_CHARS: usize = 2000;

fn log_path(id: &RecordKey) -> String {
    format!("{}/{}", FIELD_LOGS, id)
}

fn comments_path(id: &RecordKey) -> String {
    format!("{}/{}", COMMENTS, id)
}

/// Field log operations over injected collaborators.
#[derive(Clone)]
pub struct FieldLogService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobUploader>,
}

impl FieldLogService {
    pub fn new(store: Arc<dyn RecordStore>, blobs: Arc<dyn BlobUploader>) -> Self {
        Self { store, blobs }
    }

    /// Create a log: upload all files, then store the new record.
    #[instrument(skip_all, fields(site = site_files.len(), species = species_files.len()))]
    pub async fn create(
        &self,
        draft: LogDraft,
        site_files: &[PhotoFile],
        species_files: &[PhotoFile],
    ) -> Result<FieldLogRecord> {
        let result = async {
            let log = reconcile::build_new(
                draft,
                site_files,
                species_files,
                self.blobs.as_ref(),
                Timestamp::now(),
            )
            .await?;

            let id = self.store.push_key(FIELD_LOGS).await?;
            self.store.set(&log_path(&id), &encode(&log)?).await?;

            info!(%id, "Created field log");
            Ok(FieldLogRecord { id, log })
        }
        .await;

        result.inspect_err(|e| error!(operation = "create_field_log", error = %e, "Field log operation failed"))
    }

    /// Apply an edit to the log at `id` and overwrite the stored record.
    ///
    /// Fails with [`Error::NotFound`] before any upload if the log does not
    /// exist.
    #[instrument(skip_all, fields(%id, site = site_files.len(), species = species_files.len()))]
    pub async fn update(
        &self,
        id: &RecordKey,
        draft: LogDraft,
        site_files: &[PhotoFile],
        species_files: &[PhotoFile],
    ) -> Result<FieldLogRecord> {
        let result = async {
            let existing = self.load(id).await?;

            let log = reconcile::apply_edit(
                existing,
                draft,
                site_files,
                species_files,
                self.blobs.as_ref(),
                Timestamp::now(),
            )
            .await?;

            self.store.set(&log_path(id), &encode(&log)?).await?;

            info!("Updated field log");
            Ok(FieldLogRecord {
                id: id.clone(),
                log,
            })
        }
        .await;

        result.inspect_err(|e| error!(operation = "update_field_log", %id, error = %e, "Field log operation failed"))
    }

    /// Fetch one log, active or not.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &RecordKey) -> Result<FieldLogRecord> {
        self.load(id)
            .await
            .map(|log| FieldLogRecord {
                id: id.clone(),
                log,
            })
            .inspect_err(|e| error!(operation = "get_field_log", %id, error = %e, "Field log operation failed"))
    }

    /// All active logs, newest first.
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<FieldLogRecord>> {
        let result = async {
            let Some(value) = self.store.get(FIELD_LOGS).await? else {
                return Ok(Vec::new());
            };

            let mut records = decode_children(value, |id, doc| {
                if doc.get("status") != Some(&Value::Bool(true)) {
                    return None;
                }
                match FieldLog::from_value(doc) {
                    Ok(log) => Some(FieldLogRecord { id, log }),
                    Err(e) => {
                        warn!(%id, error = %e, "Skipping undecodable field log");
                        None
                    }
                }
            });

            // Logs without a creation time sort last.
            records.sort_by_key(|r| Reverse(r.log.created_at));
            debug!(count = records.len(), "Listed active field logs");
            Ok(records)
        }
        .await;

        result.inspect_err(|e| error!(operation = "list_field_logs", error = %e, "Field log operation failed"))
    }

    /// Mark a log inactive. Only `status` changes.
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, id: &RecordKey) -> Result<()> {
        let result = async {
            self.load(id).await?;

            let mut fields = Map::new();
            fields.insert("status".to_string(), Value::Bool(false));
            self.store.update(&log_path(id), &fields).await?;

            info!("Soft-deleted field log");
            Ok(())
        }
        .await;

        result.inspect_err(|e| error!(operation = "delete_field_log", %id, error = %e, "Field log operation failed"))
    }

    /// Attach a comment from the signed-in user to a log.
    #[instrument(skip(self, author, text), fields(uid = %author.uid))]
    pub async fn add_comment(
        &self,
        id: &RecordKey,
        author: &SessionClaims,
        text: &str,
    ) -> Result<CommentRecord> {
        let result = async {
            let text = text.trim();
            if text.is_empty() {
                return Err(Error::bad_request("comment text is required"));
            }
            if text.chars().count() > MAX_COMMENT_CHARS {
                return Err(Error::bad_request(format!(
                    "comment text exceeds {} characters",
                    MAX_COMMENT_CHARS
                )));
            }

            self.load(id).await?;

            let comment = Comment {
                author_uid: author.uid.clone(),
                author_name: author.display_name(),
                text: text.to_string(),
                created_at: Timestamp::now(),
            };

            let collection = comments_path(id);
            let key = self.store.push_key(&collection).await?;
            let value = serde_json::to_value(&comment).map_err(codec_failed)?;
            self.store
                .set(&format!("{}/{}", collection, key), &value)
                .await?;

            debug!(comment = %key, "Added comment");
            Ok(CommentRecord { id: key, comment })
        }
        .await;

        result.inspect_err(|e| error!(operation = "add_comment", %id, error = %e, "Field log operation failed"))
    }

    /// Comments on a log, oldest first.
    #[instrument(skip(self))]
    pub async fn list_comments(&self, id: &RecordKey) -> Result<Vec<CommentRecord>> {
        let result = async {
            self.load(id).await?;

            let Some(value) = self.store.get(&comments_path(id)).await? else {
                return Ok(Vec::new());
            };

            let mut comments = decode_children(value, |key, doc| {
                match serde_json::from_value::<Comment>(doc) {
                    Ok(comment) => Some(CommentRecord { id: key, comment }),
                    Err(e) => {
                        warn!(comment = %key, error = %e, "Skipping undecodable comment");
                        None
                    }
                }
            });
            comments.sort_by_key(|c| c.comment.created_at);
            Ok(comments)
        }
        .await;

        result.inspect_err(|e| error!(operation = "list_comments", %id, error = %e, "Field log operation failed"))
    }

    async fn load(&self, id: &RecordKey) -> Result<FieldLog> {
        let value = self
            .store
            .get(&log_path(id))
            .await?
            .ok_or_else(|| NotFoundError::new("field log", id.as_str()))?;

        FieldLog::from_value(value).map_err(codec_failed)
    }
}

fn encode(log: &FieldLog) -> Result<Value> {
    log.to_value().map_err(codec_failed)
}

pub(crate) fn codec_failed(err: serde_json::Error) -> Error {
    Error::StoreFailed(BackendError::from(err))
}

/// Decode the children of a collection object, skipping keys that are not
/// valid record keys and children `decode` rejects.
pub(crate) fn decode_children<T>(
    collection: Value,
    mut decode: impl FnMut(RecordKey, Value) -> Option<T>,
) -> Vec<T> {
    let Value::Object(children) = collection else {
        return Vec::new();
    };

    children
        .into_iter()
        .filter_map(|(key, doc)| {
            let key = RecordKey::new(key).ok()?;
            decode(key, doc)
        })
        .collect()
}
