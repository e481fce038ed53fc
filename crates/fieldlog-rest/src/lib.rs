//! fieldlog-rest - Collaborators backed by hosted database, storage and
//! identity REST APIs.

mod blobs;
mod client;
mod identity;
mod store;

pub use blobs::RestBlobs;
pub use client::RestClient;
pub use identity::RestIdentity;
pub use store::RestStore;
