//! Durable token persistence keyed by resource identity
//!
//! Every call round-trips to the vault; nothing is cached here. Vault failures are
//! returned as `StoreError` with the vault cause attached and are never retried.

use crate::codec;
use crate::vault::Vault;
use sandbox_access_core::{
    AccessConfig, CapabilityToken, ResourceIdentity, StoreError, VaultResultExt,
    VAULT_KEY_SEPARATOR,
};
use std::fmt;
use std::sync::Arc;

/// Persists capability tokens in a vault
#[derive(Clone)]
pub struct TokenStore {
    vault: Arc<dyn Vault>,
    service: String,
    access_group: Option<String>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("service", &self.service)
            .field("access_group", &self.access_group)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Create a store using the service namespace and access group from `config`
    pub fn new(vault: Arc<dyn Vault>, config: &AccessConfig) -> Self {
        Self {
            vault,
            service: config.service.clone(),
            access_group: config.access_group.clone(),
        }
    }

    /// The default shared scope used by `save`, `load` and `delete`
    #[must_use]
    pub fn access_group(&self) -> Option<&str> {
        self.access_group.as_deref()
    }

    /// Vault key for a resource
    #[must_use]
    pub fn key_for(&self, resource: &ResourceIdentity) -> String {
        format!("{}{}{}", self.service, VAULT_KEY_SEPARATOR, resource)
    }

    /// Persist or overwrite the token for `resource` in the default scope
    pub async fn save(
        &self,
        resource: &ResourceIdentity,
        token: &CapabilityToken,
    ) -> Result<(), StoreError> {
        self.save_scoped(resource, token, self.access_group.as_deref())
            .await
    }

    /// Load the token for `resource` from the default scope
    pub async fn load(
        &self,
        resource: &ResourceIdentity,
    ) -> Result<Option<CapabilityToken>, StoreError> {
        self.load_scoped(resource, self.access_group.as_deref())
            .await
    }

    /// Delete the token for `resource` from the default scope; missing entries are fine
    pub async fn delete(&self, resource: &ResourceIdentity) -> Result<(), StoreError> {
        self.delete_scoped(resource, self.access_group.as_deref())
            .await
    }

    /// Persist or overwrite the token for `resource` under an explicit scope
    pub async fn save_scoped(
        &self,
        resource: &ResourceIdentity,
        token: &CapabilityToken,
        scope: Option<&str>,
    ) -> Result<(), StoreError> {
        let key = self.key_for(resource);
        if token.resource() != resource {
            return Err(StoreError::Codec {
                key,
                message: format!("token was created for '{}'", token.resource()),
            });
        }

        let bytes = codec::encode(&key, token)?;
        self.vault.put(&key, &bytes, scope).await.in_store(&key, "save")?;
        tracing::debug!(
            resource = %resource,
            token_id = %token.id(),
            scope = scope.unwrap_or("private"),
            "token_saved"
        );
        Ok(())
    }

    /// Load the token for `resource` from an explicit scope
    pub async fn load_scoped(
        &self,
        resource: &ResourceIdentity,
        scope: Option<&str>,
    ) -> Result<Option<CapabilityToken>, StoreError> {
        let key = self.key_for(resource);
        let Some(bytes) = self.vault.get(&key, scope).await.in_store(&key, "load")? else {
            tracing::debug!(resource = %resource, "token_not_found");
            return Ok(None);
        };

        let token = codec::decode(&key, &bytes)?;
        if token.resource() != resource {
            return Err(StoreError::Codec {
                key,
                message: format!("stored record belongs to '{}'", token.resource()),
            });
        }
        Ok(Some(token))
    }

    /// Delete the token for `resource` from an explicit scope
    pub async fn delete_scoped(
        &self,
        resource: &ResourceIdentity,
        scope: Option<&str>,
    ) -> Result<(), StoreError> {
        let key = self.key_for(resource);
        self.vault.delete(&key, scope).await.in_store(&key, "delete")?;
        tracing::debug!(resource = %resource, "token_deleted");
        Ok(())
    }
}
