//! Salted digests for session ids, password hashes and verification tokens
//!
//! All tamper-evident values in SafeHarbor are produced by one primitive:
//! `salted_hash(secret_salt, message)`, a 32-byte digest keyed by a
//! server-wide secret. Two schemes are available and both produce the same
//! output size, so the hex-encoded wire formats do not change between them:
//!
//! - [`DigestScheme::SaltedSha256`]: one SHA-256 pass over `salt || message`.
//!   This is what existing password hashes were produced with.
//! - [`DigestScheme::HmacSha256`]: HMAC-SHA256 keyed by the salt. Not subject
//!   to length extension; preferred for new deployments.
//!
//! Neither scheme is a slow password KDF.

use crate::{HarborError, Result};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Digest algorithm used for every salted hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestScheme {
    /// SHA-256 over the salt followed by the message
    #[default]
    SaltedSha256,
    /// HMAC-SHA256 keyed with the salt
    HmacSha256,
}

enum Keyed {
    Salted(Zeroizing<Vec<u8>>),
    Hmac(HmacSha256),
}

/// Digest keyed by the server-wide secret salt
pub struct SaltedDigest {
    keyed: Keyed,
}

impl SaltedDigest {
    /// Prepare a digest for `scheme` keyed by `salt`
    pub fn new(scheme: DigestScheme, salt: &[u8]) -> Result<Self> {
        if salt.is_empty() {
            return Err(HarborError::config("secret salt must not be empty"));
        }
        let keyed = match scheme {
            DigestScheme::SaltedSha256 => Keyed::Salted(Zeroizing::new(salt.to_vec())),
            DigestScheme::HmacSha256 => Keyed::Hmac(
                HmacSha256::new_from_slice(salt)
                    .map_err(|e| HarborError::config(format!("unusable secret salt: {e}")))?,
            ),
        };
        Ok(Self { keyed })
    }

    /// The scheme this digest was built with
    pub fn scheme(&self) -> DigestScheme {
        match self.keyed {
            Keyed::Salted(_) => DigestScheme::SaltedSha256,
            Keyed::Hmac(_) => DigestScheme::HmacSha256,
        }
    }

    /// `salted_hash(salt, message)`
    pub fn digest(&self, message: &[u8]) -> [u8; 32] {
        match &self.keyed {
            Keyed::Salted(salt) => {
                let mut hasher = Sha256::new();
                hasher.update(salt.as_slice());
                hasher.update(message);
                hasher.finalize().into()
            }
            Keyed::Hmac(mac) => {
                let mut mac = mac.clone();
                mac.update(message);
                mac.finalize().into_bytes().into()
            }
        }
    }

    /// Lower-case hex encoding of [`SaltedDigest::digest`]
    pub fn digest_hex(&self, message: &[u8]) -> String {
        hex::encode(self.digest(message))
    }

    /// Recompute the digest of `message` and compare it with `expected`
    pub fn verify(&self, message: &[u8], expected: &[u8]) -> bool {
        constant_time_eq(&self.digest(message), expected)
    }

    /// Like [`SaltedDigest::verify`] for a hex-encoded expectation
    ///
    /// Malformed hex never verifies.
    pub fn verify_hex(&self, message: &[u8], expected_hex: &str) -> bool {
        match hex::decode(expected_hex) {
            Ok(expected) => self.verify(message, &expected),
            Err(_) => false,
        }
    }
}

impl fmt::Debug for SaltedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaltedDigest")
            .field("scheme", &self.scheme())
            .finish_non_exhaustive()
    }
}

/// Constant-time byte comparison; slices of different length never match
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salted_sha256_prepends_salt() {
        let digest = SaltedDigest::new(DigestScheme::SaltedSha256, b"pepper").unwrap();
        let mut hasher = Sha256::new();
        hasher.update(b"pepper");
        hasher.update(b"12345");
        let expected: [u8; 32] = hasher.finalize().into();
        assert_eq!(digest.digest(b"12345"), expected);
    }

    #[test]
    fn schemes_disagree_but_share_a_size() {
        let salted = SaltedDigest::new(DigestScheme::SaltedSha256, b"pepper").unwrap();
        let hmac = SaltedDigest::new(DigestScheme::HmacSha256, b"pepper").unwrap();
        assert_ne!(salted.digest(b"m"), hmac.digest(b"m"));
        assert_eq!(salted.digest_hex(b"m").len(), hmac.digest_hex(b"m").len());
    }

    #[test]
    fn verify_hex_rejects_tampering() {
        let digest = SaltedDigest::new(DigestScheme::HmacSha256, b"pepper").unwrap();
        let good = digest.digest_hex(b"nonce");
        assert!(digest.verify_hex(b"nonce", &good));
        assert!(!digest.verify_hex(b"nonce2", &good));
        assert!(!digest.verify_hex(b"nonce", "zz"));
        assert!(!digest.verify_hex(b"nonce", &good[..10]));
    }

    #[test]
    fn empty_salt_is_a_config_error() {
        assert!(matches!(
            SaltedDigest::new(DigestScheme::SaltedSha256, b""),
            Err(HarborError::Config { .. })
        ));
    }

    #[test]
    fn debug_does_not_print_the_salt() {
        let digest = SaltedDigest::new(DigestScheme::SaltedSha256, b"topsecret").unwrap();
        assert!(!format!("{digest:?}").contains("topsecret"));
    }
}
