//! Password hashing
//!
//! `password_hash = salted_hash(secret_salt, password)`. The stored hash is
//! compared in constant time.

use safeharbor_core::SaltedDigest;
use std::sync::Arc;

/// Hashes and verifies passwords with the server-wide digest
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    digest: Arc<SaltedDigest>,
}

impl PasswordHasher {
    /// Hasher sharing `digest`
    pub fn new(digest: Arc<SaltedDigest>) -> Self {
        Self { digest }
    }

    /// Hash to persist for `password`
    pub fn hash(&self, password: &str) -> Vec<u8> {
        self.digest.digest(password.as_bytes()).to_vec()
    }

    /// Whether `password` matches the stored hash
    pub fn verify(&self, password: &str, stored_hash: &[u8]) -> bool {
        self.digest.verify(password.as_bytes(), stored_hash)
    }
}
