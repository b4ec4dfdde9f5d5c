//! Structured audit trail for capability lifecycle events
//!
//! Events are emitted through `tracing` on a dedicated target so operators can route
//! them separately, and the most recent ones are kept in a bounded in-memory ring.

use parking_lot::Mutex;
use sandbox_access_core::{ResourceIdentity, TokenId, TokenMode, AUDIT_TARGET};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::Level;

const DEFAULT_HISTORY: usize = 256;

/// Lifecycle event for a capability token or access session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AccessEvent {
    /// The OS issued a new token
    TokenCreated {
        resource: ResourceIdentity,
        token_id: TokenId,
        mode: TokenMode,
    },
    /// A token was written to the vault
    TokenPersisted {
        resource: ResourceIdentity,
        token_id: TokenId,
    },
    /// Resolution reported the token as stale
    TokenStale { resource: ResourceIdentity },
    /// A stored token was deleted because it can no longer be used
    TokenDiscarded {
        resource: ResourceIdentity,
        reason: String,
    },
    SessionStarted {
        resource: ResourceIdentity,
        token_id: TokenId,
    },
    SessionEnded { resource: ResourceIdentity },
    /// The OS stop call failed after the session was forgotten
    StopFailed {
        resource: ResourceIdentity,
        error: String,
    },
    /// Access was revoked and the stored token removed
    Revoked {
        resource: ResourceIdentity,
        had_session: bool,
    },
    /// Every open session was stopped at teardown
    Shutdown { sessions_closed: usize },
}

impl AccessEvent {
    /// Stable event name used as the log message
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenCreated { .. } => "token_created",
            Self::TokenPersisted { .. } => "token_persisted",
            Self::TokenStale { .. } => "token_stale",
            Self::TokenDiscarded { .. } => "token_discarded",
            Self::SessionStarted { .. } => "session_started",
            Self::SessionEnded { .. } => "session_ended",
            Self::StopFailed { .. } => "stop_failed",
            Self::Revoked { .. } => "revoked",
            Self::Shutdown { .. } => "shutdown",
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::StopFailed { .. } => Level::ERROR,
            Self::TokenStale { .. } | Self::TokenDiscarded { .. } => Level::WARN,
            Self::SessionStarted { .. } | Self::SessionEnded { .. } => Level::DEBUG,
            Self::TokenCreated { .. }
            | Self::TokenPersisted { .. }
            | Self::Revoked { .. }
            | Self::Shutdown { .. } => Level::INFO,
        }
    }

    /// The resource the event concerns, if it concerns exactly one
    #[must_use]
    pub fn resource(&self) -> Option<&ResourceIdentity> {
        match self {
            Self::TokenCreated { resource, .. }
            | Self::TokenPersisted { resource, .. }
            | Self::TokenStale { resource }
            | Self::TokenDiscarded { resource, .. }
            | Self::SessionStarted { resource, .. }
            | Self::SessionEnded { resource }
            | Self::StopFailed { resource, .. }
            | Self::Revoked { resource, .. } => Some(resource),
            Self::Shutdown { .. } => None,
        }
    }

    /// String-keyed metadata describing the event
    #[must_use]
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut metadata = BTreeMap::new();
        if let Some(resource) = self.resource() {
            metadata.insert("resource".to_string(), resource.to_string());
        }
        match self {
            Self::TokenCreated { token_id, mode, .. } => {
                metadata.insert("token_id".to_string(), token_id.to_string());
                metadata.insert("mode".to_string(), mode.to_string());
            }
            Self::TokenPersisted { token_id, .. } | Self::SessionStarted { token_id, .. } => {
                metadata.insert("token_id".to_string(), token_id.to_string());
            }
            Self::TokenDiscarded { reason, .. } => {
                metadata.insert("reason".to_string(), reason.clone());
            }
            Self::StopFailed { error, .. } => {
                metadata.insert("error".to_string(), error.clone());
            }
            Self::Revoked { had_session, .. } => {
                metadata.insert("had_session".to_string(), had_session.to_string());
            }
            Self::Shutdown { sessions_closed } => {
                metadata.insert("sessions_closed".to_string(), sessions_closed.to_string());
            }
            Self::TokenStale { .. } | Self::SessionEnded { .. } => {}
        }
        metadata
    }
}

/// Fire-and-forget sink for [`AccessEvent`]s
#[derive(Debug)]
pub struct AuditLog {
    capacity: usize,
    history: Mutex<VecDeque<AccessEvent>>,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }
}

impl AuditLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` recent events in memory; zero disables the ring
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            history: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY))),
        }
    }

    pub fn record(&self, event: AccessEvent) {
        let metadata = event.metadata();
        let name = event.name();
        match event.level() {
            Level::ERROR => tracing::error!(target: AUDIT_TARGET, ?metadata, "{name}"),
            Level::WARN => tracing::warn!(target: AUDIT_TARGET, ?metadata, "{name}"),
            Level::INFO => tracing::info!(target: AUDIT_TARGET, ?metadata, "{name}"),
            Level::DEBUG => tracing::debug!(target: AUDIT_TARGET, ?metadata, "{name}"),
            _ => tracing::trace!(target: AUDIT_TARGET, ?metadata, "{name}"),
        }

        if self.capacity == 0 {
            return;
        }
        let mut history = self.history.lock();
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(event);
    }

    /// Snapshot of the retained events, oldest first
    #[must_use]
    pub fn recent(&self) -> Vec<AccessEvent> {
        self.history.lock().iter().cloned().collect()
    }
}
