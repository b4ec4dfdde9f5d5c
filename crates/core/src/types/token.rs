//! Capability tokens ("bookmarks") and the opaque OS bytes they carry

use super::resource::ResourceIdentity;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque token blob issued by the OS capability primitive
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct TokenBytes(Vec<u8>);

impl TokenBytes {
    /// Wrap raw token bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Never print token contents
impl fmt::Debug for TokenBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenBytes({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for TokenBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for TokenBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for TokenBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for TokenBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Unique identifier generated for each capability token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(Uuid);

impl TokenId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access mode fixed when a token is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenMode {
    ReadOnly,
    ReadWrite,
}

impl TokenMode {
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::ReadOnly)
    }
}

impl fmt::Display for TokenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenMode::ReadOnly => write!(f, "read-only"),
            TokenMode::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// A persisted capability token and its bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    /// Unique token identifier
    id: TokenId,
    /// Resource this token was created for
    resource: ResourceIdentity,
    /// Opaque OS-issued bytes
    bytes: TokenBytes,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Timestamp of the last successful access start
    last_accessed_at: DateTime<Utc>,
    /// Number of successful access starts
    access_count: u64,
    /// Mode fixed at creation
    mode: TokenMode,
}

impl CapabilityToken {
    /// Create a record for freshly issued token bytes
    #[must_use]
    pub fn new(resource: ResourceIdentity, bytes: TokenBytes, mode: TokenMode) -> Self {
        let now = Utc::now();
        Self {
            id: TokenId::generate(),
            resource,
            bytes,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            mode,
        }
    }

    #[must_use]
    pub fn id(&self) -> TokenId {
        self.id
    }

    #[must_use]
    pub fn resource(&self) -> &ResourceIdentity {
        &self.resource
    }

    #[must_use]
    pub fn bytes(&self) -> &TokenBytes {
        &self.bytes
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    #[must_use]
    pub fn access_count(&self) -> u64 {
        self.access_count
    }

    #[must_use]
    pub fn mode(&self) -> TokenMode {
        self.mode
    }

    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.mode.is_read_only()
    }

    /// Record a successful access start
    pub fn record_access(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = Utc::now().max(self.last_accessed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> CapabilityToken {
        CapabilityToken::new(
            ResourceIdentity::new("/Users/x/Documents").unwrap(),
            TokenBytes::new(vec![1, 2, 3, 4]),
            TokenMode::ReadWrite,
        )
    }

    #[test]
    fn test_new_token_starts_unused() {
        let token = token();
        assert_eq!(token.access_count(), 0);
        assert_eq!(token.created_at(), token.last_accessed_at());
        assert!(!token.is_read_only());
    }

    #[test]
    fn test_record_access_is_monotonic() {
        let mut token = token();
        let before = token.last_accessed_at();

        token.record_access();
        token.record_access();

        assert_eq!(token.access_count(), 2);
        assert!(token.last_accessed_at() >= before);
        assert_eq!(token.created_at(), before);
    }

    #[test]
    fn test_token_ids_are_unique() {
        assert_ne!(token().id(), token().id());
    }

    #[test]
    fn test_debug_hides_token_bytes() {
        let rendered = format!("{:?}", TokenBytes::new(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(rendered, "TokenBytes(4 bytes)");
    }

    #[test]
    fn test_bytes_serialize_as_base64() {
        let json = serde_json::to_value(token()).unwrap();
        assert_eq!(json["bytes"], "AQIDBA==");
        assert_eq!(json["mode"], "read_write");
    }
}
