//! In-process vault for tests and platforms without a secure store

use super::Vault;
use async_trait::async_trait;
use parking_lot::RwLock;
use sandbox_access_core::VaultError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

type EntryKey = (Option<String>, String);

/// In-memory vault (NOT durable - contents are lost with the process)
#[derive(Debug, Default)]
pub struct MemoryVault {
    entries: RwLock<HashMap<EntryKey, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `VaultError::Unavailable` until reset
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored entries across all scopes
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether an entry exists, bypassing the availability switch
    #[must_use]
    pub fn contains(&self, key: &str, scope: Option<&str>) -> bool {
        self.entries.read().contains_key(&entry_key(key, scope))
    }

    fn check_available(&self) -> Result<(), VaultError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(VaultError::unavailable("memory vault switched off"))
        } else {
            Ok(())
        }
    }
}

fn entry_key(key: &str, scope: Option<&str>) -> EntryKey {
    (scope.map(str::to_string), key.to_string())
}

#[async_trait]
impl Vault for MemoryVault {
    async fn put(&self, key: &str, bytes: &[u8], scope: Option<&str>) -> Result<(), VaultError> {
        self.check_available()?;
        self.entries
            .write()
            .insert(entry_key(key, scope), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str, scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError> {
        self.check_available()?;
        Ok(self.entries.read().get(&entry_key(key, scope)).cloned())
    }

    async fn delete(&self, key: &str, scope: Option<&str>) -> Result<(), VaultError> {
        self.check_available()?;
        self.entries.write().remove(&entry_key(key, scope));
        Ok(())
    }
}
