use std::path::PathBuf;

/// Result type alias for capability operations
pub type Result<T> = std::result::Result<T, CapabilityError>;

/// Re-export CapabilityError as Error for callers that prefer the short name
pub use CapabilityError as Error;

/// Failure reported by the external secure key-value vault
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The vault refused the operation
    #[error("vault permission denied: {message}")]
    PermissionDenied { message: String },

    /// The vault could not be reached
    #[error("vault unavailable: {message}")]
    Unavailable { message: String },

    /// Underlying I/O failure
    #[error("vault I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The vault's own storage could not be interpreted
    #[error("vault data corrupt: {message}")]
    Corrupt { message: String },
}

impl VaultError {
    /// Create a permission denied error
    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    /// Create an unavailable error
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a corruption error
    #[must_use]
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Token persistence failure, carrying the vault key it concerns
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The vault operation itself failed
    #[error("token store {operation} failed for '{key}': {source}")]
    Vault {
        key: String,
        operation: &'static str,
        #[source]
        source: VaultError,
    },

    /// The stored blob could not be encoded or decoded
    #[error("token record for '{key}' could not be encoded: {message}")]
    Codec { key: String, message: String },
}

impl StoreError {
    /// Check whether retrying the same call may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Vault {
                source: VaultError::Unavailable { .. } | VaultError::Io(_),
                ..
            }
        )
    }

    /// The vault key this error concerns
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Vault { key, .. } | Self::Codec { key, .. } => key,
        }
    }
}

/// Failure reported by the operating-system capability primitive
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OsError {
    /// The OS (or the user) declined to grant the capability
    #[error("capability denied: {message}")]
    Denied { message: String },

    /// The token bytes can no longer be interpreted at all
    #[error("capability token unresolvable: {message}")]
    Unresolvable { message: String },

    /// Any other failure of the primitive
    #[error("capability primitive failed: {message}")]
    Failed { message: String },
}

impl OsError {
    /// Create a denial error
    #[must_use]
    pub fn denied(message: impl Into<String>) -> Self {
        Self::Denied {
            message: message.into(),
        }
    }

    /// Create an unresolvable-token error
    #[must_use]
    pub fn unresolvable(message: impl Into<String>) -> Self {
        Self::Unresolvable {
            message: message.into(),
        }
    }

    /// Create a generic failure
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// What a caller can do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryHint {
    /// Ask the user to select the location again
    Reselect,
    /// The failure may be transient; the same call can be retried
    Retry,
    /// The caller broke the session protocol
    FixCaller,
    /// No automatic recovery applies
    None,
}

/// Error type for capability-token and access-session operations
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// The OS declined to grant access
    #[error("permission denied for '{resource}': {message}")]
    PermissionDenied { resource: String, message: String },

    /// The token no longer resolves to a valid resource; it has been discarded
    #[error("capability token for '{resource}' is stale")]
    TokenStale { resource: String },

    /// No token has been persisted for the resource
    #[error("no capability token stored for '{resource}'")]
    TokenMissing { resource: String },

    /// The token was created for a different resource
    #[error("capability token for '{token_resource}' cannot open '{resource}'")]
    TokenMismatch {
        resource: String,
        token_resource: String,
    },

    /// An access session is already open for the resource
    #[error("an access session is already open for '{resource}'")]
    AlreadyAccessing { resource: String },

    /// No access session is open for the resource
    #[error("no access session is open for '{resource}'")]
    NotAccessing { resource: String },

    /// Token persistence failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The capability primitive failed
    #[error("capability {operation} failed: {source}")]
    Os {
        operation: &'static str,
        #[source]
        source: OsError,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

// Helper methods for creating errors with context
impl CapabilityError {
    /// Create a permission denied error
    #[must_use]
    pub fn permission_denied(resource: impl Into<String>, message: impl Into<String>) -> Self {
        CapabilityError::PermissionDenied {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Create a stale token error
    #[must_use]
    pub fn token_stale(resource: impl Into<String>) -> Self {
        CapabilityError::TokenStale {
            resource: resource.into(),
        }
    }

    /// Create a missing token error
    #[must_use]
    pub fn token_missing(resource: impl Into<String>) -> Self {
        CapabilityError::TokenMissing {
            resource: resource.into(),
        }
    }

    /// Create an already-accessing error
    #[must_use]
    pub fn already_accessing(resource: impl Into<String>) -> Self {
        CapabilityError::AlreadyAccessing {
            resource: resource.into(),
        }
    }

    /// Create a not-accessing error
    #[must_use]
    pub fn not_accessing(resource: impl Into<String>) -> Self {
        CapabilityError::NotAccessing {
            resource: resource.into(),
        }
    }

    /// Wrap a primitive failure for the named operation
    #[must_use]
    pub fn os(operation: &'static str, source: OsError) -> Self {
        CapabilityError::Os { operation, source }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        CapabilityError::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        CapabilityError::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::PermissionDenied { .. }
            | Self::TokenStale { .. }
            | Self::TokenMissing { .. } => RecoveryHint::Reselect,
            Self::AlreadyAccessing { .. }
            | Self::NotAccessing { .. }
            | Self::TokenMismatch { .. } => RecoveryHint::FixCaller,
            Self::Store(store) if store.is_transient() => RecoveryHint::Retry,
            Self::FileSystem { .. } => RecoveryHint::Retry,
            _ => RecoveryHint::None,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Retry)
    }

    /// Check if the user must re-select the location
    #[must_use]
    pub fn requires_reselection(&self) -> bool {
        matches!(self.recovery_hint(), RecoveryHint::Reselect)
    }
}

/// Extension trait for attaching store context to vault results
pub trait VaultResultExt<T> {
    /// Tag a vault failure with the key and operation it belongs to
    fn in_store(self, key: &str, operation: &'static str) -> std::result::Result<T, StoreError>;
}

impl<T> VaultResultExt<T> for std::result::Result<T, VaultError> {
    fn in_store(self, key: &str, operation: &'static str) -> std::result::Result<T, StoreError> {
        self.map_err(|source| StoreError::Vault {
            key: key.to_string(),
            operation,
            source,
        })
    }
}
