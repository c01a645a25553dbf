//! Session lifecycle against a populated store

use assert_matches::assert_matches;
use async_trait::async_trait;
use parking_lot::Mutex;
use safeharbor_authentication::{
    Credentials, EmailSender, EmailVerifier, SessionConfig, SessionCookie, SessionManager,
};
use safeharbor_core::{HarborError, ObjectId, Result};
use safeharbor_store::EntitySource;
use safeharbor_testkit::{init_test_tracing, Fixture};
use std::sync::Arc;
use std::time::Duration;

struct Setup {
    fx: Fixture,
    sessions: SessionManager,
    realm: ObjectId,
    alice: ObjectId,
}

fn setup() -> Setup {
    init_test_tracing();
    let fx = Fixture::new();
    let config = SessionConfig {
        max_login_attempts: 3,
        ..SessionConfig::with_salt("integration-salt")
    };
    let sessions = SessionManager::new(config, fx.store().clone(), fx.clock().clone()).unwrap();
    let realm = fx.realm("acme");
    let alice = fx.user_with_hash(&realm, "alice", sessions.passwords().hash("s3cret"));
    fx.make_admin(&realm, &alice);
    Setup {
        fx,
        sessions,
        realm,
        alice,
    }
}

#[test]
fn login_then_authenticate_then_logout() {
    let s = setup();
    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    assert_eq!(token.authenticated_user_id, s.alice);
    assert_eq!(token.realm_id, s.realm);
    assert!(token.is_admin_user);

    let resolved = s.sessions.authenticate(&token.session_id).unwrap();
    assert_eq!(resolved, token);
    assert_eq!(s.sessions.login_id(&token.session_id).as_deref(), Some("alice"));

    s.sessions.invalidate_session(&token.session_id);
    // Still verifies, but the liveness gate refuses it
    assert!(s.sessions.structurally_valid(&token.session_id));
    assert_matches!(
        s.sessions.authenticate(&token.session_id),
        Err(HarborError::Unauthorized { .. })
    );
}

#[test]
fn forged_suffix_fails_even_when_nonce_is_live() {
    let s = setup();
    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    let (nonce, _) = token.session_id.split_once(':').unwrap();
    let forged = format!("{nonce}:{}", "0".repeat(64));
    assert_matches!(s.sessions.authenticate(&forged), Err(HarborError::Unauthorized { .. }));
    // A structurally valid id that was never issued is not live either
    let unissued = s.sessions.mint_session_id();
    assert_matches!(s.sessions.authenticate(&unissued), Err(HarborError::Unauthorized { .. }));
}

#[test]
fn wrong_password_and_unknown_login_are_unauthorized() {
    let s = setup();
    assert_matches!(
        s.sessions.login(&Credentials::new("alice", "guess")),
        Err(HarborError::Unauthorized { .. })
    );
    assert_matches!(
        s.sessions.login(&Credentials::new("mallory", "s3cret")),
        Err(HarborError::Unauthorized { .. })
    );
    // The failed attempt was recorded
    let view = s.fx.store().view();
    assert_eq!(view.user(&s.alice).unwrap().recent_login_timestamps.len(), 1);
}

#[test]
fn throttle_blocks_even_the_right_password() {
    let s = setup();
    for _ in 0..3 {
        assert!(s.sessions.login(&Credentials::new("alice", "nope")).is_err());
        s.fx.clock().advance(Duration::from_secs(1));
    }
    assert_matches!(
        s.sessions.login(&Credentials::new("alice", "s3cret")),
        Err(HarborError::Unauthorized { .. })
    );
    // Throttled attempts are not recorded, so the window drains normally
    s.fx.clock().advance(Duration::from_secs(600));
    assert!(s.sessions.login(&Credentials::new("alice", "s3cret")).is_ok());
}

#[test]
fn deactivated_users_cannot_log_in() {
    let s = setup();
    s.fx.store()
        .transaction(|tx| {
            tx.party_mut(&s.alice)?.is_active = false;
            Ok(())
        })
        .unwrap();
    assert_matches!(
        s.sessions.login(&Credentials::new("alice", "s3cret")),
        Err(HarborError::Unauthorized { .. })
    );
}

#[test]
fn open_sessions_end_when_the_account_is_deactivated() {
    let s = setup();
    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    s.fx.store()
        .transaction(|tx| {
            tx.party_mut(&s.alice)?.is_active = false;
            Ok(())
        })
        .unwrap();
    assert_matches!(
        s.sessions.authenticate(&token.session_id),
        Err(HarborError::Unauthorized { .. })
    );

    let bob = s.fx.user_with_hash(&s.realm, "bob", s.sessions.passwords().hash("pw"));
    let token = s.sessions.login(&Credentials::new("bob", "pw")).unwrap();
    s.fx.store().delete(&bob).unwrap();
    assert_matches!(
        s.sessions.authenticate(&token.session_id),
        Err(HarborError::Unauthorized { .. })
    );
}

#[test]
fn logout_of_unknown_ids_leaves_the_table_alone() {
    let s = setup();
    for n in 0..5 {
        s.sessions.invalidate_session(&format!("{n}:made-up"));
    }
    s.sessions.invalidate_session(&s.sessions.mint_session_id());
    assert_eq!(s.sessions.table_len(), 0);

    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    s.sessions.invalidate_session(&token.session_id);
    s.sessions.invalidate_session(&token.session_id);
    assert_eq!(s.sessions.table_len(), 1);
}

#[test]
fn sessions_expire_and_are_purged() {
    let s = setup();
    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    let revoked = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    s.sessions.invalidate_session(&revoked.session_id);
    assert_eq!(s.sessions.table_len(), 2);

    s.fx.clock().advance(Duration::from_secs(86_400));
    assert!(s.sessions.authenticate(&token.session_id).is_ok());
    assert_eq!(s.sessions.purge_expired(), 0);

    s.fx.clock().advance(Duration::from_secs(1));
    assert_matches!(
        s.sessions.authenticate(&token.session_id),
        Err(HarborError::Unauthorized { .. })
    );
    assert_eq!(s.sessions.purge_expired(), 2);
    assert_eq!(s.sessions.table_len(), 0);
}

#[test]
fn cookie_round_trip_through_header() {
    let s = setup();
    let token = s.sessions.login(&Credentials::new("alice", "s3cret")).unwrap();
    let cookie = SessionCookie::with_max_age(&token.session_id, s.sessions.config().session_max_age_secs);
    assert!(cookie.to_string().ends_with("; Max-Age=86400; HttpOnly"));
    let header = format!("lang=en; {}", cookie.to_string().split(';').next().unwrap());
    let presented = SessionCookie::from_cookie_header(&header).unwrap();
    assert!(s.sessions.authenticate(&presented).is_ok());
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl EmailSender for Outbox {
    async fn send_verification(&self, email_address: &str, token: &str) -> Result<()> {
        self.sent.lock().push((email_address.to_string(), token.to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn email_tokens_bind_address_and_expire() {
    let s = setup();
    let verifier = EmailVerifier::new(
        Arc::clone(s.sessions.digest()),
        s.fx.clock().clone(),
        s.sessions.config().email_token_ttl(),
    );
    let outbox = Outbox::default();
    let token = verifier.send(&outbox, "alice@example.com").await.unwrap();
    assert_eq!(outbox.sent.lock().clone(), vec![("alice@example.com".to_string(), token.clone())]);

    assert!(verifier.verify("alice@example.com", &token).is_ok());
    assert!(verifier.verify("mallory@example.com", &token).is_err());
    assert!(verifier.verify("alice@example.com", "not-a-token").is_err());

    s.fx.clock().advance(Duration::from_secs(72 * 3_600 + 1));
    assert_matches!(
        verifier.verify("alice@example.com", &token),
        Err(HarborError::Unauthorized { .. })
    );
}
