//! fieldlog-core - Field log domain types, collaborator traits and services.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod logs;
pub mod model;
pub mod photos;
pub mod push_id;
pub mod reconcile;
pub mod traits;
pub mod tree;
pub mod types;

pub use accounts::{AccountService, FederatedProvider, Registration, Session, USERS, UserQuery};
pub use auth::{Credentials, IssuedToken, SessionClaims, SessionToken, TokenIssuer};
pub use error::Error;
pub use logs::{COMMENTS, FIELD_LOGS, FieldLogService};
pub use model::{
    Comment, CommentRecord, FieldLog, FieldLogRecord, LogDraft, PhotoFile, Role,
    SpeciesObservation, UserProfile, UserRecord, UserStatus,
};
pub use traits::{BlobUploader, FederatedIdentity, IdentityProvider, RecordStore};
pub use types::{BackendUrl, RecordKey, Timestamp};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
