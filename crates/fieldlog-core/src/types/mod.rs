//! Validated primitive types.
//!
//! These types enforce their invariants at construction time, so keys and
//! URLs that reach a collaborator are always well formed.

mod backend_url;
mod record_key;
mod timestamp;

pub use backend_url::BackendUrl;
pub use record_key::RecordKey;
pub use timestamp::Timestamp;
