//! Permission kinds, access levels and the grants that pair them

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical kind of permission an application can hold
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Filesystem,
    SecureCredentialStore,
    Network,
    Camera,
    Microphone,
    Location,
    Notifications,
    Calendar,
    Contacts,
    PhotoLibrary,
    /// Application-defined permission kind
    Custom(String),
}

impl PermissionKind {
    /// Stable name used in logs and validation context
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PermissionKind::Filesystem => "filesystem",
            PermissionKind::SecureCredentialStore => "secure_credential_store",
            PermissionKind::Network => "network",
            PermissionKind::Camera => "camera",
            PermissionKind::Microphone => "microphone",
            PermissionKind::Location => "location",
            PermissionKind::Notifications => "notifications",
            PermissionKind::Calendar => "calendar",
            PermissionKind::Contacts => "contacts",
            PermissionKind::PhotoLibrary => "photo_library",
            PermissionKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for PermissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionKind::Custom(name) => write!(f, "custom:{name}"),
            other => write!(f, "{}", other.name()),
        }
    }
}

impl FromStr for PermissionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim() {
            "filesystem" => PermissionKind::Filesystem,
            "secure_credential_store" => PermissionKind::SecureCredentialStore,
            "network" => PermissionKind::Network,
            "camera" => PermissionKind::Camera,
            "microphone" => PermissionKind::Microphone,
            "location" => PermissionKind::Location,
            "notifications" => PermissionKind::Notifications,
            "calendar" => PermissionKind::Calendar,
            "contacts" => PermissionKind::Contacts,
            "photo_library" => PermissionKind::PhotoLibrary,
            other => match other.strip_prefix("custom:") {
                Some(name) if !name.is_empty() => PermissionKind::Custom(name.to_string()),
                _ => {
                    return Err(Error::configuration(format!(
                        "unknown permission kind '{other}'"
                    )))
                }
            },
        };
        Ok(kind)
    }
}

/// Level of access held for a permission kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    ReadOnly,
    ReadWrite,
    Full,
    /// Application-defined level, only comparable with itself
    Custom(String),
}

impl AccessLevel {
    /// Whether holding `self` satisfies a request for `required`.
    ///
    /// `Full` satisfies anything, `ReadWrite` satisfies `ReadWrite` and `ReadOnly`,
    /// `ReadOnly` only itself, and custom levels only an identically named custom level.
    #[must_use]
    pub fn satisfies(&self, required: &AccessLevel) -> bool {
        match (self, required) {
            (AccessLevel::Full, _) => true,
            (AccessLevel::ReadWrite, AccessLevel::ReadWrite | AccessLevel::ReadOnly) => true,
            (AccessLevel::ReadOnly, AccessLevel::ReadOnly) => true,
            (AccessLevel::Custom(held), AccessLevel::Custom(wanted)) => held == wanted,
            _ => false,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::ReadOnly => write!(f, "read_only"),
            AccessLevel::ReadWrite => write!(f, "read_write"),
            AccessLevel::Full => write!(f, "full"),
            AccessLevel::Custom(name) => write!(f, "custom:{name}"),
        }
    }
}

impl FromStr for AccessLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "read_only" | "read-only" => Ok(AccessLevel::ReadOnly),
            "read_write" | "read-write" => Ok(AccessLevel::ReadWrite),
            "full" => Ok(AccessLevel::Full),
            other => match other.strip_prefix("custom:") {
                Some(name) if !name.is_empty() => Ok(AccessLevel::Custom(name.to_string())),
                _ => Err(Error::configuration(format!(
                    "unknown access level '{other}'"
                ))),
            },
        }
    }
}

/// A permission kind granted at a given level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub kind: PermissionKind,
    pub level: AccessLevel,
    pub granted_at: DateTime<Utc>,
}

impl PermissionGrant {
    #[must_use]
    pub fn new(kind: PermissionKind, level: AccessLevel) -> Self {
        Self {
            kind,
            level,
            granted_at: Utc::now(),
        }
    }
}
