//! Domain documents.
//!
//! Documents are plain serde types; the record store sees them as JSON
//! trees and never interprets their contents.

mod comment;
mod field_log;
mod photo;
mod user;

pub use comment::{Comment, CommentRecord};
pub use field_log::{FieldLog, FieldLogRecord, LogDraft, SpeciesDraft, SpeciesObservation};
pub use photo::PhotoFile;
pub use user::{Role, UserProfile, UserRecord, UserStatus, split_display_name};
