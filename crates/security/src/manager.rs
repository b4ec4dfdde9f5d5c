//! Capability lifecycle: grant, persist, recover, and bracket access sessions
//!
//! The manager owns no durable state. Tokens live in the [`TokenStore`], open sessions
//! in the [`AccessSessionRegistry`], and every OS interaction goes through the injected
//! [`CapabilityPrimitive`]. A stored token is never deleted while a session for the
//! same resource is open, except by [`CapabilityManager::revoke`], which closes the
//! session first.

use crate::audit::{AccessEvent, AuditLog};
use crate::primitive::{CapabilityPrimitive, Resolution};
use crate::registry::AccessSessionRegistry;
use dashmap::DashMap;
use sandbox_access_core::{
    AccessConfig, CapabilityError, CapabilityToken, OsError, ResourceIdentity, Result, TokenId,
    TokenMode,
};
use sandbox_access_store::TokenStore;
use sandbox_access_utils::tracing::resource_span;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;

/// Coordinates the OS primitive, the token store and the session registry
pub struct CapabilityManager<P: CapabilityPrimitive> {
    primitive: P,
    store: TokenStore,
    registry: Arc<AccessSessionRegistry<P::Handle>>,
    audit: Arc<AuditLog>,
    probe_on_recover: bool,
    /// Serialises read-modify-write cycles on one resource's stored record
    record_locks: DashMap<ResourceIdentity, Arc<Mutex<()>>>,
}

impl<P: CapabilityPrimitive> fmt::Debug for CapabilityManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityManager")
            .field("store", &self.store)
            .field("active_sessions", &self.registry.len())
            .field("probe_on_recover", &self.probe_on_recover)
            .finish_non_exhaustive()
    }
}

/// Why a stale or broken token is being thrown away
enum Discard<'a> {
    Stale,
    Unresolvable(&'a str),
    ProbeFailed,
}

impl fmt::Display for Discard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discard::Stale => write!(f, "stale"),
            Discard::Unresolvable(message) => write!(f, "unresolvable: {message}"),
            Discard::ProbeFailed => write!(f, "access probe failed"),
        }
    }
}

fn os_error(
    resource: &ResourceIdentity,
    operation: &'static str,
    error: OsError,
) -> CapabilityError {
    match error {
        OsError::Denied { message } => {
            CapabilityError::permission_denied(resource.as_str(), message)
        }
        other => CapabilityError::os(operation, other),
    }
}

impl<P: CapabilityPrimitive> CapabilityManager<P> {
    pub fn new(primitive: P, store: TokenStore, config: &AccessConfig) -> Self {
        Self {
            primitive,
            store,
            registry: Arc::new(AccessSessionRegistry::new()),
            audit: Arc::new(AuditLog::new()),
            probe_on_recover: config.probe_on_recover,
            record_locks: DashMap::new(),
        }
    }

    /// Share a session registry with other components
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<AccessSessionRegistry<P::Handle>>) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// First-grant path for read-write access
    pub async fn request_and_persist(
        &self,
        resource: &ResourceIdentity,
    ) -> Result<CapabilityToken> {
        self.request_and_persist_with_mode(resource, TokenMode::ReadWrite)
            .await
    }

    /// Ask the OS for a new token and persist it.
    ///
    /// A denial returns [`CapabilityError::PermissionDenied`] and leaves the store
    /// untouched. Nothing is persisted until the OS call has returned, so cancelling
    /// this future leaves no partial state.
    pub async fn request_and_persist_with_mode(
        &self,
        resource: &ResourceIdentity,
        mode: TokenMode,
    ) -> Result<CapabilityToken> {
        async {
            let bytes = self
                .primitive
                .create(resource, mode)
                .await
                .map_err(|e| os_error(resource, "create", e))?;

            let token = CapabilityToken::new(resource.clone(), bytes, mode);
            self.audit.record(AccessEvent::TokenCreated {
                resource: resource.clone(),
                token_id: token.id(),
                mode,
            });

            {
                let _record = self.lock_record(resource).await;
                self.store.save(resource, &token).await?;
            }
            self.audit.record(AccessEvent::TokenPersisted {
                resource: resource.clone(),
                token_id: token.id(),
            });
            Ok::<_, CapabilityError>(token)
        }
        .instrument(resource_span("request", resource.as_str()))
        .await
    }

    /// Check whether a previously persisted token still grants access.
    ///
    /// Returns `Ok(false)` when nothing is stored, and also when the stored token
    /// turned out stale, unresolvable or failed the start/stop probe; in those cases
    /// the token is deleted first.
    pub async fn recover_access(&self, resource: &ResourceIdentity) -> Result<bool> {
        async {
            if self.registry.is_active(resource) {
                tracing::debug!("session already open, skipping probe");
                return Ok(true);
            }

            let Some(token) = self.store.load(resource).await? else {
                return Ok(false);
            };

            let Some(resolution) = self.resolve(resource, &token).await? else {
                return Ok(false);
            };

            if self.probe_on_recover && !self.probe(resource, &resolution.handle) {
                self.discard(resource, token.id(), Discard::ProbeFailed)
                    .await?;
                return Ok(false);
            }
            Ok::<_, CapabilityError>(true)
        }
        .instrument(resource_span("recover", resource.as_str()))
        .await
    }

    /// Resolve `token` and open an access session for `resource`.
    ///
    /// Fails with `AlreadyAccessing` if a session is open, `TokenMismatch` if the
    /// token names another resource, and `TokenStale` (after discarding the stored
    /// token) if the OS reports it stale.
    pub async fn begin_session(
        &self,
        resource: &ResourceIdentity,
        token: &CapabilityToken,
    ) -> Result<P::Handle> {
        async {
            if token.resource() != resource {
                return Err(CapabilityError::TokenMismatch {
                    resource: resource.to_string(),
                    token_resource: token.resource().to_string(),
                });
            }
            if self.registry.is_active(resource) {
                return Err(CapabilityError::already_accessing(resource.as_str()));
            }

            let Some(resolution) = self.resolve(resource, token).await? else {
                return Err(CapabilityError::token_stale(resource.as_str()));
            };
            let handle = resolution.handle;

            // Reserve the slot before touching the OS so racing callers cannot double-start
            if !self.registry.try_start(resource, handle.clone()) {
                return Err(CapabilityError::already_accessing(resource.as_str()));
            }
            if !self.primitive.start_access(&handle) {
                self.registry.stop(resource);
                return Err(CapabilityError::permission_denied(
                    resource.as_str(),
                    "the OS refused to start access",
                ));
            }

            self.audit.record(AccessEvent::SessionStarted {
                resource: resource.clone(),
                token_id: token.id(),
            });

            if let Err(error) = self.record_access(resource, token.id()).await {
                tracing::warn!(%error, "failed to record token access");
            }
            Ok::<_, CapabilityError>(handle)
        }
        .instrument(resource_span("begin", resource.as_str()))
        .await
    }

    /// Load the stored token for `resource` and open a session with it
    pub async fn open_session(&self, resource: &ResourceIdentity) -> Result<P::Handle> {
        let token = self
            .store
            .load(resource)
            .await?
            .ok_or_else(|| CapabilityError::token_missing(resource.as_str()))?;
        self.begin_session(resource, &token).await
    }

    /// Close the session for `resource`; the OS stop call is best effort
    pub fn end_session(&self, resource: &ResourceIdentity) -> Result<()> {
        let _span = resource_span("end", resource.as_str()).entered();
        let handle = self
            .registry
            .stop(resource)
            .ok_or_else(|| CapabilityError::not_accessing(resource.as_str()))?;
        self.stop_handle(resource, &handle);
        Ok(())
    }

    /// Close any open session for `resource`, then delete its stored token
    pub async fn revoke(&self, resource: &ResourceIdentity) -> Result<()> {
        async {
            let _record = self.lock_record(resource).await;
            let had_session = match self.registry.stop(resource) {
                Some(handle) => {
                    self.stop_handle(resource, &handle);
                    true
                }
                None => false,
            };

            self.store.delete(resource).await?;
            self.audit.record(AccessEvent::Revoked {
                resource: resource.clone(),
                had_session,
            });
            Ok::<_, CapabilityError>(())
        }
        .instrument(resource_span("revoke", resource.as_str()))
        .await
    }

    /// Stop every open session. Call once at teardown after quiescing other callers.
    ///
    /// Returns the number of sessions closed.
    pub fn shutdown(&self) -> usize {
        let sessions = self.registry.drain_all();
        let closed = sessions.len();
        for (resource, handle) in sessions {
            self.stop_handle(&resource, &handle);
        }
        self.audit.record(AccessEvent::Shutdown {
            sessions_closed: closed,
        });
        closed
    }

    /// Run `f` inside an access session, ending the session once `f` completes
    pub async fn with_session<F, Fut, T>(
        &self,
        resource: &ResourceIdentity,
        token: &CapabilityToken,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(P::Handle) -> Fut,
        Fut: Future<Output = T>,
    {
        let handle = self.begin_session(resource, token).await?;
        let output = f(handle).await;
        match self.end_session(resource) {
            Ok(()) | Err(CapabilityError::NotAccessing { .. }) => Ok(output),
            Err(error) => Err(error),
        }
    }

    #[must_use]
    pub fn is_active(&self, resource: &ResourceIdentity) -> bool {
        self.registry.is_active(resource)
    }

    #[must_use]
    pub fn active_sessions(&self) -> Vec<ResourceIdentity> {
        self.registry.active_resources()
    }

    /// Resolve a token, discarding it when the OS says it is stale or unreadable
    async fn resolve(
        &self,
        resource: &ResourceIdentity,
        token: &CapabilityToken,
    ) -> Result<Option<Resolution<P::Handle>>> {
        match self.primitive.resolve(token.bytes()).await {
            Ok(resolution) if resolution.is_stale => {
                self.audit.record(AccessEvent::TokenStale {
                    resource: resource.clone(),
                });
                self.discard(resource, token.id(), Discard::Stale).await?;
                Ok(None)
            }
            Ok(resolution) => Ok(Some(resolution)),
            Err(OsError::Unresolvable { message }) => {
                self.discard(resource, token.id(), Discard::Unresolvable(&message))
                    .await?;
                Ok(None)
            }
            Err(error) => Err(os_error(resource, "resolve", error)),
        }
    }

    /// Start then immediately stop access to confirm the handle is usable
    fn probe(&self, resource: &ResourceIdentity, handle: &P::Handle) -> bool {
        if !self.primitive.start_access(handle) {
            tracing::debug!("access probe refused");
            return false;
        }
        if let Err(error) = self.primitive.stop_access(handle) {
            tracing::warn!(resource = %resource, %error, "access probe stop failed");
        }
        true
    }

    async fn lock_record(&self, resource: &ResourceIdentity) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.record_locks.entry(resource.clone()).or_default().value());
        lock.lock_owned().await
    }

    /// Bump the access counter on the stored record, if it is still the token in use
    async fn record_access(&self, resource: &ResourceIdentity, token_id: TokenId) -> Result<()> {
        let _record = self.lock_record(resource).await;
        match self.store.load(resource).await? {
            Some(mut stored) if stored.id() == token_id => {
                stored.record_access();
                self.store.save(resource, &stored).await?;
            }
            Some(stored) => tracing::debug!(
                token_id = %token_id,
                stored_id = %stored.id(),
                "stored record superseded, access not recorded"
            ),
            None => {
                tracing::debug!(token_id = %token_id, "no stored record, access not recorded");
            }
        }
        Ok(())
    }

    /// Delete the stored record when it is the token that failed and no session is open
    async fn discard(
        &self,
        resource: &ResourceIdentity,
        token_id: TokenId,
        reason: Discard<'_>,
    ) -> Result<()> {
        let _record = self.lock_record(resource).await;
        if self.registry.is_active(resource) {
            tracing::debug!(%reason, "session open, keeping stored token");
            return Ok(());
        }
        match self.store.load(resource).await? {
            Some(stored) if stored.id() == token_id => {}
            Some(_) => {
                tracing::debug!(
                    %reason,
                    token_id = %token_id,
                    "stored record superseded, keeping it"
                );
                return Ok(());
            }
            None => return Ok(()),
        }
        self.store.delete(resource).await?;
        self.audit.record(AccessEvent::TokenDiscarded {
            resource: resource.clone(),
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn stop_handle(&self, resource: &ResourceIdentity, handle: &P::Handle) {
        match self.primitive.stop_access(handle) {
            Ok(()) => self.audit.record(AccessEvent::SessionEnded {
                resource: resource.clone(),
            }),
            Err(error) => self.audit.record(AccessEvent::StopFailed {
                resource: resource.clone(),
                error: error.to_string(),
            }),
        }
    }
}
