//! The seam to the external secure key-value vault
//!
//! A vault stores opaque byte blobs by key. Every call carries an optional shared
//! scope (an access group): an entry written under a scope is only visible through
//! that same scope, and unscoped entries are private to the process.

mod file;
mod memory;

pub use file::FileVault;
pub use memory::MemoryVault;

use async_trait::async_trait;
use sandbox_access_core::VaultError;
use std::sync::Arc;

/// Persistent secure key-value store
#[async_trait]
pub trait Vault: Send + Sync {
    /// Store or overwrite `bytes` under `key`
    async fn put(&self, key: &str, bytes: &[u8], scope: Option<&str>) -> Result<(), VaultError>;

    /// Fetch the bytes stored under `key`, if any
    async fn get(&self, key: &str, scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError>;

    /// Remove `key`; removing a missing key succeeds
    async fn delete(&self, key: &str, scope: Option<&str>) -> Result<(), VaultError>;
}

#[async_trait]
impl<V: Vault + ?Sized> Vault for Arc<V> {
    async fn put(&self, key: &str, bytes: &[u8], scope: Option<&str>) -> Result<(), VaultError> {
        (**self).put(key, bytes, scope).await
    }

    async fn get(&self, key: &str, scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError> {
        (**self).get(key, scope).await
    }

    async fn delete(&self, key: &str, scope: Option<&str>) -> Result<(), VaultError> {
        (**self).delete(key, scope).await
    }
}
