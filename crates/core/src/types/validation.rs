//! Results of validating a permission request

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Category of problem found while validating a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueKind {
    /// No grant exists for the permission kind
    PermissionMissing,
    /// A grant exists but its level does not cover the request
    InvalidAccessLevel,
    /// The resource backing the permission is not reachable
    ResourceUnavailable,
}

impl fmt::Display for ValidationIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssueKind::PermissionMissing => write!(f, "permission_missing"),
            ValidationIssueKind::InvalidAccessLevel => write!(f, "invalid_access_level"),
            ValidationIssueKind::ResourceUnavailable => write!(f, "resource_unavailable"),
        }
    }
}

/// A single problem with a human description and structured context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: ValidationIssueKind,
    pub description: String,
    pub context: BTreeMap<String, String>,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(kind: ValidationIssueKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a context entry
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }
}

/// Outcome of a validation call; `passed` is true only when no issue was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Build a result from the collected issues, in discovery order
    #[must_use]
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            passed: issues.is_empty(),
            issues,
        }
    }

    #[must_use]
    pub fn passed() -> Self {
        Self::from_issues(Vec::new())
    }

    /// Count the issues of one kind
    #[must_use]
    pub fn count(&self, kind: ValidationIssueKind) -> usize {
        self.issues.iter().filter(|issue| issue.kind == kind).count()
    }

    #[must_use]
    pub fn has(&self, kind: ValidationIssueKind) -> bool {
        self.count(kind) > 0
    }
}
