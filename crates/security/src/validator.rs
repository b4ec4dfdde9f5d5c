//! Checks a permission request against the ledger and resource availability
//!
//! Every problem is collected; validation never stops at the first issue.

use crate::ledger::PermissionLedger;
use sandbox_access_core::{
    AccessLevel, PermissionKind, ValidationIssue, ValidationIssueKind, ValidationResult,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Reports whether the resource behind a permission kind can be reached
pub trait ResourceAvailability: Send + Sync {
    fn is_available(&self, kind: &PermissionKind) -> bool;
}

impl<F> ResourceAvailability for F
where
    F: Fn(&PermissionKind) -> bool + Send + Sync,
{
    fn is_available(&self, kind: &PermissionKind) -> bool {
        self(kind)
    }
}

/// Every resource is reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

impl ResourceAvailability for AlwaysAvailable {
    fn is_available(&self, _kind: &PermissionKind) -> bool {
        true
    }
}

/// A fixed set of kinds is unreachable
#[derive(Debug, Clone, Default)]
pub struct UnavailableKinds(HashSet<PermissionKind>);

impl UnavailableKinds {
    pub fn new(kinds: impl IntoIterator<Item = PermissionKind>) -> Self {
        Self(kinds.into_iter().collect())
    }
}

impl ResourceAvailability for UnavailableKinds {
    fn is_available(&self, kind: &PermissionKind) -> bool {
        !self.0.contains(kind)
    }
}

/// Validates requests against a shared [`PermissionLedger`]
#[derive(Clone)]
pub struct PermissionValidator {
    ledger: Arc<PermissionLedger>,
    availability: Arc<dyn ResourceAvailability>,
}

impl fmt::Debug for PermissionValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionValidator")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl PermissionValidator {
    pub fn new(ledger: Arc<PermissionLedger>, availability: Arc<dyn ResourceAvailability>) -> Self {
        Self {
            ledger,
            availability,
        }
    }

    /// Validator that treats every resource as reachable
    pub fn with_ledger(ledger: Arc<PermissionLedger>) -> Self {
        Self::new(ledger, Arc::new(AlwaysAvailable))
    }

    pub fn ledger(&self) -> &PermissionLedger {
        &self.ledger
    }

    /// Check that `kind` is held at a level satisfying `required` and is reachable
    #[must_use]
    pub fn validate(&self, kind: &PermissionKind, required: &AccessLevel) -> ValidationResult {
        let mut issues = Vec::new();

        match self.ledger.current_level(kind) {
            None => issues.push(
                ValidationIssue::new(
                    ValidationIssueKind::PermissionMissing,
                    format!("no {kind} permission has been granted"),
                )
                .with_context("kind", kind)
                .with_context("required", required),
            ),
            Some(granted) if !granted.satisfies(required) => issues.push(
                ValidationIssue::new(
                    ValidationIssueKind::InvalidAccessLevel,
                    format!("{kind} is granted {granted} but {required} was requested"),
                )
                .with_context("kind", kind)
                .with_context("granted", &granted)
                .with_context("required", required),
            ),
            Some(_) => {}
        }

        if !self.availability.is_available(kind) {
            issues.push(
                ValidationIssue::new(
                    ValidationIssueKind::ResourceUnavailable,
                    format!("the resource behind {kind} is unavailable"),
                )
                .with_context("kind", kind),
            );
        }

        let result = ValidationResult::from_issues(issues);
        if !result.passed {
            tracing::debug!(
                kind = %kind,
                required = %required,
                issues = result.issues.len(),
                "permission_validation_failed"
            );
        }
        result
    }
}
