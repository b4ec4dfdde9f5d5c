#![allow(dead_code)]

use async_trait::async_trait;
use sandbox_access_core::{
    AccessConfig, CapabilityToken, ResourceIdentity, TokenBytes, TokenMode, VaultError,
};
use sandbox_access_store::Vault;

/// Vault that refuses every operation, like a keychain without the entitlement
pub struct DeniedVault;

#[async_trait]
impl Vault for DeniedVault {
    async fn put(&self, _key: &str, _bytes: &[u8], _scope: Option<&str>) -> Result<(), VaultError> {
        Err(VaultError::permission_denied("missing keychain entitlement"))
    }

    async fn get(&self, _key: &str, _scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError> {
        Err(VaultError::permission_denied("missing keychain entitlement"))
    }

    async fn delete(&self, _key: &str, _scope: Option<&str>) -> Result<(), VaultError> {
        Err(VaultError::permission_denied("missing keychain entitlement"))
    }
}

pub fn resource(path: &str) -> ResourceIdentity {
    ResourceIdentity::new(path).unwrap()
}

pub fn token_for(path: &str) -> CapabilityToken {
    CapabilityToken::new(
        resource(path),
        TokenBytes::new(path.as_bytes().to_vec()),
        TokenMode::ReadWrite,
    )
}

pub fn config() -> AccessConfig {
    AccessConfig::builder()
        .with_service("com.example.editor")
        .build()
        .unwrap()
}
