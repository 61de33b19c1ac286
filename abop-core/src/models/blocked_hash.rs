//! Content hashes that must never re-enter the library (§3.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedHash {
    /// 64-character lowercase hex SHA-256 digest; the primary key.
    pub hash: String,
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
}

impl BlockedHash {
    /// Builds a new blocked-hash record, validating the hash shape per
    /// §7 `ValidationError`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `hash` is not 64 lowercase hex chars.
    pub fn new(hash: &str, reason: &str) -> crate::error::Result<Self> {
        validate_hash(hash)?;
        Ok(Self {
            hash: hash.to_string(),
            reason: reason.to_string(),
            blocked_at: Utc::now(),
        })
    }
}

/// Validates that `hash` is exactly 64 lowercase hex characters, as
/// required by `AddBlockedHash` (§6.2).
///
/// # Errors
///
/// Returns a validation error describing why the hash was rejected.
pub fn validate_hash(hash: &str) -> crate::error::Result<()> {
    if hash.len() != 64 {
        return Err(crate::error::AppError::validation(
            "hash",
            format!("expected 64 hex characters, got {}", hash.len()),
        ));
    }
    if !hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        return Err(crate::error::AppError::validation(
            "hash",
            "expected lowercase hex digits",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_length() {
        assert!(validate_hash("deadbeef").is_err());
    }

    #[test]
    fn rejects_uppercase() {
        let hash = "A".repeat(64);
        assert!(validate_hash(&hash).is_err());
    }

    #[test]
    fn accepts_well_formed_hash() {
        let hash = "a".repeat(64);
        assert!(validate_hash(&hash).is_ok());
    }
}
