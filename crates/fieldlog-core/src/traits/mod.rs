//! Collaborator traits implemented by storage backends.

mod blob;
mod identity;
mod store;

pub use blob::BlobUploader;
pub use identity::{FederatedIdentity, IdentityProvider};
pub use store::RecordStore;
