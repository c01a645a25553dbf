//! Email address verification tokens
//!
//! Token form: `<issued_nanos>:<hex(salted_hash(issued_nanos ":" email))>`.
//! The token is bound to the address it was minted for and expires a fixed
//! time after issuance. Delivery is left to an [`EmailSender`].

use async_trait::async_trait;
use safeharbor_core::{Clock, HarborError, Result, SaltedDigest, Timestamp};
use std::sync::Arc;
use std::time::Duration;

/// Delivers verification tokens to users
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send `token` to `email_address`
    async fn send_verification(&self, email_address: &str, token: &str) -> Result<()>;
}

/// Mints and checks email verification tokens
#[derive(Debug, Clone)]
pub struct EmailVerifier {
    digest: Arc<SaltedDigest>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl EmailVerifier {
    /// Verifier sharing the session digest
    pub fn new(digest: Arc<SaltedDigest>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { digest, clock, ttl }
    }

    fn message(issued: &str, email_address: &str) -> String {
        format!("{issued}:{email_address}")
    }

    /// Fresh token for `email_address`
    pub fn mint(&self, email_address: &str) -> String {
        let issued = self.clock.now().as_nanos().to_string();
        let hash = self.digest.digest_hex(Self::message(&issued, email_address).as_bytes());
        format!("{issued}:{hash}")
    }

    /// Accept `token` only if it was minted for `email_address` and is unexpired
    pub fn verify(&self, email_address: &str, token: &str) -> Result<()> {
        let malformed = || HarborError::unauthorized("malformed verification token");
        let (issued, hash) = token.split_once(':').ok_or_else(malformed)?;
        let issued_at = issued
            .parse::<u64>()
            .map(Timestamp::from_nanos)
            .map_err(|_| malformed())?;
        if !self
            .digest
            .verify_hex(Self::message(issued, email_address).as_bytes(), hash)
        {
            return Err(HarborError::unauthorized(
                "verification token does not match this address",
            ));
        }
        if self.clock.now().since(issued_at) > self.ttl {
            return Err(HarborError::unauthorized("verification token has expired"));
        }
        Ok(())
    }

    /// Mint a token and hand it to `sender`; returns the token sent
    pub async fn send(&self, sender: &dyn EmailSender, email_address: &str) -> Result<String> {
        let token = self.mint(email_address);
        sender.send_verification(email_address, &token).await?;
        tracing::info!(%email_address, "verification email sent");
        Ok(token)
    }
}
