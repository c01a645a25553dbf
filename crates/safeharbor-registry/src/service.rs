//! Wiring of every SafeHarbor component over one store
//!
//! A request handler holds a [`HarborService`] and follows one path:
//! authenticate the presented session id, authorize the resolved user, then
//! call a registry or ACL operation.

use crate::config::ServiceConfig;
use crate::registry::Registry;
use safeharbor_authentication::{EmailVerifier, SessionManager, SessionToken};
use safeharbor_authorization::{AccessControl, Authorizer};
use safeharbor_core::{Action, Clock, HarborConfig, ObjectId, Result};
use safeharbor_store::ObjectStore;
use std::sync::Arc;

/// Shared handles to the store and the services built on it
#[derive(Debug, Clone)]
pub struct HarborService {
    store: Arc<ObjectStore>,
    sessions: Arc<SessionManager>,
    access: AccessControl,
    authorizer: Authorizer,
    registry: Registry,
    email: EmailVerifier,
}

impl HarborService {
    /// Services over a fresh, empty store
    pub fn new(config: ServiceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let store = Arc::new(ObjectStore::new(config.store.clone()));
        Self::with_store(config, store, clock)
    }

    /// Services over an existing store, e.g. one rebuilt from persisted entities
    pub fn with_store(
        config: ServiceConfig,
        store: Arc<ObjectStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let sessions = Arc::new(SessionManager::new(
            config.session.clone(),
            Arc::clone(&store),
            Arc::clone(&clock),
        )?);
        let registry = Registry::new(
            config.registry.clone(),
            Arc::clone(&store),
            Arc::clone(&clock),
            sessions.passwords().clone(),
        )?;
        let email = EmailVerifier::new(
            Arc::clone(sessions.digest()),
            clock,
            config.session.email_token_ttl(),
        );
        tracing::info!(file_root = %config.registry.file_root.display(), "services initialized");
        Ok(Self {
            access: AccessControl::new(Arc::clone(&store)),
            authorizer: Authorizer::new(Arc::clone(&store)),
            store,
            sessions,
            registry,
            email,
        })
    }

    /// The object store
    pub fn store(&self) -> &Arc<ObjectStore> {
        &self.store
    }

    /// Session manager
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// ACL mutation
    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    /// Authorization checks
    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    /// Lifecycle operations
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Email verification tokens
    pub fn email(&self) -> &EmailVerifier {
        &self.email
    }

    /// Authenticate `session_id` and require `action` on `resource_id`
    pub fn authorize_session(
        &self,
        session_id: &str,
        action: Action,
        resource_id: &ObjectId,
    ) -> Result<SessionToken> {
        let token = self.sessions.authenticate(session_id)?;
        self.authorizer
            .require(&token.authenticated_user_id, action, resource_id)?;
        Ok(token)
    }
}
