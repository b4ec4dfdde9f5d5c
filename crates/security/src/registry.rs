//! In-memory bookkeeping of open access sessions
//!
//! One exclusive lock guards the whole map. Session churn is low, and every
//! operation is a single check-and-mutate under that lock, so two callers racing to
//! start the same resource can never both succeed. The lock is never held across an
//! await point or an OS call.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sandbox_access_core::ResourceIdentity;
use std::collections::HashMap;

/// An open access session; never persisted
#[derive(Debug, Clone)]
pub struct AccessSession<H> {
    pub resource: ResourceIdentity,
    pub handle: H,
    pub started_at: DateTime<Utc>,
}

/// At most one session per resource identity
#[derive(Debug)]
pub struct AccessSessionRegistry<H> {
    sessions: Mutex<HashMap<ResourceIdentity, AccessSession<H>>>,
}

impl<H> Default for AccessSessionRegistry<H> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }
}

impl<H> AccessSessionRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session unless one is already open; returns whether it was recorded
    pub fn try_start(&self, resource: &ResourceIdentity, handle: H) -> bool {
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(resource) {
            return false;
        }
        sessions.insert(
            resource.clone(),
            AccessSession {
                resource: resource.clone(),
                handle,
                started_at: Utc::now(),
            },
        );
        true
    }

    /// Remove the session and hand back its handle
    pub fn stop(&self, resource: &ResourceIdentity) -> Option<H> {
        self.sessions
            .lock()
            .remove(resource)
            .map(|session| session.handle)
    }

    #[must_use]
    pub fn is_active(&self, resource: &ResourceIdentity) -> bool {
        self.sessions.lock().contains_key(resource)
    }

    /// Empty the registry, returning every session so the caller can stop it
    pub fn drain_all(&self) -> Vec<(ResourceIdentity, H)> {
        let drained: Vec<_> = self.sessions.lock().drain().collect();
        drained
            .into_iter()
            .map(|(resource, session)| (resource, session.handle))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Resources with an open session, sorted
    #[must_use]
    pub fn active_resources(&self) -> Vec<ResourceIdentity> {
        let mut resources: Vec<_> = self.sessions.lock().keys().cloned().collect();
        resources.sort();
        resources
    }

    /// When the open session for `resource` started
    #[must_use]
    pub fn started_at(&self, resource: &ResourceIdentity) -> Option<DateTime<Utc>> {
        self.sessions
            .lock()
            .get(resource)
            .map(|session| session.started_at)
    }
}
