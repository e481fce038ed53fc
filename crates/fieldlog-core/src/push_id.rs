//! Chronological push keys.
//!
//! Keys are 20 characters: 8 encode the creation time in milliseconds and 12
//! are random, all drawn from a 64-character alphabet whose ASCII order
//! matches its numeric order, so keys sort by creation time.

use chrono::Utc;
use uuid::Uuid;

use crate::types::RecordKey;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generate a push key for the current instant.
pub fn generate() -> RecordKey {
    generate_at(Utc::now().timestamp_millis(), *Uuid::new_v4().as_bytes())
}

/// Generate a push key from an explicit time and random bytes.
pub fn generate_at(timestamp_millis: i64, random: [u8; 16]) -> RecordKey {
    let mut key = [0u8; 20];

    let mut now = timestamp_millis.max(0) as u64;
    for slot in key[..8].iter_mut().rev() {
        *slot = PUSH_CHARS[(now % 64) as usize];
        now /= 64;
    }

    for (slot, byte) in key[8..].iter_mut().zip(random.iter()) {
        *slot = PUSH_CHARS[(byte % 64) as usize];
    }

    // PUSH_CHARS contains no character a key forbids.
    RecordKey::from_trusted(String::from_utf8_lossy(&key).into_owned())
}
