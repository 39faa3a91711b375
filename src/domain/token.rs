//! Deterministic participation tokens.
//!
//! A token identifies one (activity, identity) pair without storing the
//! identity in client-visible places. The same inputs always produce the
//! same token, which is what makes duplicate detection and later recovery
//! by email possible without any extra lookup table.

use sha2::{Digest, Sha256};

/// Derives the participation token for an identity within an activity.
///
/// The token is the lowercase hex SHA-256 digest of
/// `"{activity}:{identity}:{salt}"`. The salt comes from configuration
/// and must stay stable for the lifetime of stored participation records.
#[must_use]
pub fn participation_token(activity: &str, identity: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(activity.as_bytes());
    hasher.update(b":");
    hasher.update(identity.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}
