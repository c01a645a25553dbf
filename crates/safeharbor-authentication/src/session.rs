//! Session manager
//!
//! A session id has the wire form `<nonce>:<hex(salted_hash(nonce))>`, where
//! the nonce is the minting time in nanoseconds. A presented id must pass
//! two independent gates:
//!
//! - liveness: the live-session table holds an unrevoked, unexpired entry
//! - integrity: the hash suffix recomputes from the nonce
//!
//! Failing either one is enough to refuse the request. A logged-out id still
//! verifies but is no longer live; a forged id may collide with nothing live
//! and never verifies.

use crate::config::SessionConfig;
use crate::password::PasswordHasher;
use crate::throttle::LoginThrottle;
use crate::token::{Credentials, SessionToken};
use parking_lot::{Mutex, RwLock};
use safeharbor_core::{Clock, HarborConfig, HarborError, ObjectId, Result, SaltedDigest, Timestamp};
use safeharbor_store::{EntitySource, ObjectStore, User};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum LiveSession {
    Active(SessionEntry),
    Revoked { created_at: Timestamp },
}

#[derive(Debug, Clone)]
struct SessionEntry {
    login_id: String,
    user_id: ObjectId,
    realm_id: ObjectId,
    is_admin_user: bool,
    created_at: Timestamp,
}

impl LiveSession {
    fn created_at(&self) -> Timestamp {
        match self {
            LiveSession::Active(entry) => entry.created_at,
            LiveSession::Revoked { created_at } => *created_at,
        }
    }
}

/// Mints, validates and revokes session tokens
#[derive(Debug)]
pub struct SessionManager {
    store: Arc<ObjectStore>,
    clock: Arc<dyn Clock>,
    digest: Arc<SaltedDigest>,
    passwords: PasswordHasher,
    throttle: LoginThrottle,
    config: SessionConfig,
    live: RwLock<HashMap<String, LiveSession>>,
    last_nonce: Mutex<u64>,
}

fn invalid_credentials() -> HarborError {
    HarborError::unauthorized("invalid login name or password")
}

impl SessionManager {
    /// Manager over `store`, validating `config` first
    pub fn new(config: SessionConfig, store: Arc<ObjectStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let digest = Arc::new(SaltedDigest::new(config.digest, config.secret_salt.as_bytes())?);
        Ok(Self {
            store,
            clock,
            passwords: PasswordHasher::new(Arc::clone(&digest)),
            digest,
            throttle: LoginThrottle::new(config.max_login_attempts, config.login_window()),
            config,
            live: RwLock::new(HashMap::new()),
            last_nonce: Mutex::new(0),
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The digest keyed by the secret salt, shared with other token issuers
    pub fn digest(&self) -> &Arc<SaltedDigest> {
        &self.digest
    }

    /// Password hasher using the same secret salt
    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    /// Fresh session id; nonces strictly increase even within one nanosecond
    pub fn mint_session_id(&self) -> String {
        let nonce = {
            let mut last = self.last_nonce.lock();
            let nonce = self.clock.now().as_nanos().max(last.saturating_add(1));
            *last = nonce;
            nonce.to_string()
        };
        let hash = self.digest.digest_hex(nonce.as_bytes());
        format!("{nonce}:{hash}")
    }

    /// Open a session for the user named by `credentials`
    ///
    /// The password is not checked here; [`SessionManager::login`] does that.
    pub fn create_session(&self, credentials: &Credentials) -> Result<SessionToken> {
        let (user_id, realm_id, is_admin_user) = {
            let view = self.store.view();
            let user = view.user_by_login(&credentials.login_id)?;
            (user.id().clone(), user.party.realm_id.clone(), is_realm_admin(&view, user)?)
        };
        let session_id = self.mint_session_id();
        let entry = SessionEntry {
            login_id: credentials.login_id.clone(),
            user_id: user_id.clone(),
            realm_id: realm_id.clone(),
            is_admin_user,
            created_at: self.clock.now(),
        };
        self.live
            .write()
            .insert(session_id.clone(), LiveSession::Active(entry));
        tracing::info!(%user_id, login_id = %credentials.login_id, "session created");
        Ok(SessionToken {
            session_id,
            authenticated_user_id: user_id,
            realm_id,
            is_admin_user,
        })
    }

    /// Verify credentials under the throttle and open a session
    ///
    /// Unknown, deactivated and throttled accounts are refused the same way as
    /// a wrong password. Every attempt that reaches password verification is
    /// recorded, including failed ones.
    pub fn login(&self, credentials: &Credentials) -> Result<SessionToken> {
        let user_id = self
            .store
            .view()
            .user_id_by_login(&credentials.login_id)
            .ok_or_else(|| {
                tracing::warn!(login_id = %credentials.login_id, "login for unknown account");
                invalid_credentials()
            })?;

        let _lock = self.store.lock_objects(std::slice::from_ref(&user_id))?;
        let now = self.clock.now();
        let verified = self.store.transaction(|tx| {
            let user = tx.user(&user_id)?;
            if !user.party.is_active {
                tracing::warn!(%user_id, "login for deactivated account");
                return Err(invalid_credentials());
            }
            if self.throttle.is_throttled(&user.recent_login_timestamps, now) {
                tracing::warn!(%user_id, "login throttled");
                return Err(invalid_credentials());
            }
            let verified = self.passwords.verify(credentials.password(), &user.password_hash);
            let user = tx.user_mut(&user_id)?;
            self.throttle.record(&mut user.recent_login_timestamps, now);
            Ok(verified)
        })?;

        if !verified {
            tracing::warn!(%user_id, "login with wrong password");
            return Err(invalid_credentials());
        }
        self.create_session(credentials)
    }

    /// Revoke a session; its id stays in the table as a tombstone
    ///
    /// Ids the table does not hold are ignored.
    pub fn invalidate_session(&self, session_id: &str) {
        let mut live = self.live.write();
        let Some(session) = live.get_mut(session_id) else {
            tracing::debug!("invalidation of unknown session ignored");
            return;
        };
        *session = LiveSession::Revoked {
            created_at: session.created_at(),
        };
        tracing::info!("session invalidated");
    }

    /// Integrity gate: exactly two `:`-separated parts and a matching hash
    pub fn structurally_valid(&self, session_id: &str) -> bool {
        let mut parts = session_id.split(':');
        let (Some(nonce), Some(hash), None) = (parts.next(), parts.next(), parts.next()) else {
            return false;
        };
        !nonce.is_empty() && self.digest.verify_hex(nonce.as_bytes(), hash)
    }

    /// Resolve a presented session id
    ///
    /// Both gates must pass and the user must still exist and be active.
    pub fn authenticate(&self, session_id: &str) -> Result<SessionToken> {
        let entry = match self.live.read().get(session_id) {
            Some(LiveSession::Active(entry)) => entry.clone(),
            Some(LiveSession::Revoked { .. }) | None => {
                tracing::debug!("session is not live");
                return Err(HarborError::unauthorized("session is not live"));
            }
        };
        if self.is_expired(entry.created_at) {
            tracing::debug!(user_id = %entry.user_id, "session expired");
            return Err(HarborError::unauthorized("session has expired"));
        }
        if !self.structurally_valid(session_id) {
            tracing::warn!(user_id = %entry.user_id, "live session id failed integrity check");
            return Err(HarborError::unauthorized("session id is malformed"));
        }
        let active = self
            .store
            .view()
            .user(&entry.user_id)
            .is_ok_and(|user| user.party.is_active);
        if !active {
            tracing::warn!(user_id = %entry.user_id, "session for missing or deactivated account");
            return Err(HarborError::unauthorized("account is not active"));
        }
        Ok(SessionToken {
            session_id: session_id.to_string(),
            authenticated_user_id: entry.user_id,
            realm_id: entry.realm_id,
            is_admin_user: entry.is_admin_user,
        })
    }

    /// Login name recorded for a live session
    pub fn login_id(&self, session_id: &str) -> Option<String> {
        match self.live.read().get(session_id) {
            Some(LiveSession::Active(entry)) => Some(entry.login_id.clone()),
            _ => None,
        }
    }

    /// Drop table entries, live or revoked, older than the session lifetime
    pub fn purge_expired(&self) -> usize {
        let mut live = self.live.write();
        let before = live.len();
        live.retain(|_, session| !self.is_expired(session.created_at()));
        let purged = before - live.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
        purged
    }

    /// Number of table entries, tombstones included
    pub fn table_len(&self) -> usize {
        self.live.read().len()
    }

    fn is_expired(&self, created_at: Timestamp) -> bool {
        self.clock.now().since(created_at) > self.config.session_max_age()
    }
}

fn is_realm_admin<S: EntitySource + ?Sized>(src: &S, user: &User) -> Result<bool> {
    let realm = src.realm(&user.party.realm_id).map_err(|_| {
        HarborError::internal(format!(
            "user {} belongs to missing realm {}",
            user.id(),
            user.party.realm_id
        ))
    })?;
    Ok(&realm.admin_user_id == user.id())
}
