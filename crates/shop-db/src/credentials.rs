//! Password hashing.
//!
//! Stored form is a bcrypt hash string (`$2b$<cost>$<salt><digest>`), so the
//! salt and cost travel with the hash and need no column of their own.

use anyhow::{Context, Result};

/// Work factor for new hashes. Existing hashes verify at whatever cost they
/// were created with.
pub const HASH_COST: u32 = 10;

pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, HASH_COST).context("password hashing failed")
}

/// `false` for a wrong password and for a stored value that is not a bcrypt
/// hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}
