//! Record key type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Maximum key length accepted by the realtime database, in bytes.
const MAX_KEY_BYTES: usize = 768;

/// A validated record key (a single path segment in the record store).
///
/// Keys identify field logs, users and comments. They are assigned by the
/// store (push keys) or the identity provider (uids) and arrive back from
/// clients in URLs, so they are validated before being spliced into a path.
///
/// # Example
///
/// ```
/// use fieldlog_core::RecordKey;
///
/// let key = RecordKey::new("-NxA1b2C3d4E5f6G7h8").unwrap();
/// assert_eq!(key.as_str(), "-NxA1b2C3d4E5f6G7h8");
/// assert!(RecordKey::new("fieldLogs/other").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey(String);

impl RecordKey {
    /// Create a new key from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] if the string cannot be used as a key.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Wrap a string already known to be a valid key.
    pub(crate) fn from_trusted(s: String) -> Self {
        debug_assert!(Self::validate(&s).is_ok());
        Self(s)
    }

    /// Returns the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        // Realtime database key rules:
        // - 1-768 bytes
        // - no '.', '$', '#', '[', ']', '/' or ASCII control characters
        if s.is_empty() {
            return Err(invalid(s, "cannot be empty"));
        }

        if s.len() > MAX_KEY_BYTES {
            return Err(invalid(s, "exceeds maximum length of 768 bytes"));
        }

        for c in s.chars() {
            if matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_ascii_control() {
                return Err(invalid(s, &format!("contains invalid character {:?}", c)));
            }
        }

        Ok(())
    }
}

fn invalid(value: &str, reason: &str) -> Error {
    InvalidInputError::RecordKey {
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.0
    }
}

impl AsRef<str> for RecordKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
