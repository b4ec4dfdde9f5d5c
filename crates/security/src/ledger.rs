//! In-memory record of which permission kinds are held and at what level

use dashmap::DashMap;
use sandbox_access_core::{AccessLevel, PermissionGrant, PermissionKind};

/// Concurrent map of permission kind to its current grant
#[derive(Debug, Default)]
pub struct PermissionLedger {
    grants: DashMap<PermissionKind, PermissionGrant>,
}

impl PermissionLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the grant for `kind`, returning the previous level
    pub fn grant(&self, kind: PermissionKind, level: AccessLevel) -> Option<AccessLevel> {
        tracing::debug!(kind = %kind, level = %level, "permission_granted");
        self.grants
            .insert(kind.clone(), PermissionGrant::new(kind, level))
            .map(|previous| previous.level)
    }

    #[must_use]
    pub fn current_level(&self, kind: &PermissionKind) -> Option<AccessLevel> {
        self.grants.get(kind).map(|grant| grant.level.clone())
    }

    /// Remove the grant for `kind`
    pub fn revoke(&self, kind: &PermissionKind) -> Option<PermissionGrant> {
        let removed = self.grants.remove(kind).map(|(_, grant)| grant);
        if removed.is_some() {
            tracing::debug!(kind = %kind, "permission_revoked");
        }
        removed
    }

    /// Snapshot of every grant, ordered by kind name
    #[must_use]
    pub fn grants(&self) -> Vec<PermissionGrant> {
        let mut grants: Vec<_> = self
            .grants
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        grants.sort_by(|a, b| a.kind.to_string().cmp(&b.kind.to_string()));
        grants
    }

    pub fn clear(&self) {
        self.grants.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_replaces_previous_level() {
        let ledger = PermissionLedger::new();
        assert_eq!(ledger.grant(PermissionKind::Camera, AccessLevel::ReadOnly), None);
        assert_eq!(
            ledger.grant(PermissionKind::Camera, AccessLevel::Full),
            Some(AccessLevel::ReadOnly)
        );
        assert_eq!(
            ledger.current_level(&PermissionKind::Camera),
            Some(AccessLevel::Full)
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_revoke_and_clear() {
        let ledger = PermissionLedger::new();
        ledger.grant(PermissionKind::Network, AccessLevel::ReadWrite);
        ledger.grant(PermissionKind::Contacts, AccessLevel::ReadOnly);

        let revoked = ledger.revoke(&PermissionKind::Network).unwrap();
        assert_eq!(revoked.level, AccessLevel::ReadWrite);
        assert!(ledger.revoke(&PermissionKind::Network).is_none());
        assert!(ledger.current_level(&PermissionKind::Network).is_none());

        ledger.clear();
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_grants_snapshot_is_sorted() {
        let ledger = PermissionLedger::new();
        ledger.grant(PermissionKind::Network, AccessLevel::Full);
        ledger.grant(PermissionKind::Camera, AccessLevel::ReadOnly);
        ledger.grant(
            PermissionKind::Custom("sync".into()),
            AccessLevel::Custom("mirror".into()),
        );

        let kinds: Vec<_> = ledger.grants().into_iter().map(|g| g.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PermissionKind::Camera,
                PermissionKind::Custom("sync".into()),
                PermissionKind::Network,
            ]
        );
    }
}
