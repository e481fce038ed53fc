//! Comments attached to a field log.

use serde::{Deserialize, Serialize};

use crate::types::{RecordKey, Timestamp};

/// A comment stored at `comments/{logId}/{key}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author_uid: String,
    #[serde(default)]
    pub author_name: String,
    pub text: String,
    pub created_at: Timestamp,
}

/// A stored comment together with its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: RecordKey,

    #[serde(flatten)]
    pub comment: Comment,
}
