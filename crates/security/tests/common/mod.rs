#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sandbox_access_core::{
    AccessConfig, OsError, ResourceIdentity, TokenBytes, TokenMode, VaultError,
};
use sandbox_access_security::{CapabilityManager, CapabilityPrimitive, Resolution};
use sandbox_access_store::{MemoryVault, TokenStore, Vault};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STUB_PREFIX: &str = "stub:";

/// Handle naming the resource it was resolved for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StubHandle(pub String);

#[derive(Debug, Default)]
struct Script {
    deny_create: bool,
    stale: bool,
    unresolvable: bool,
    refuse_start: bool,
    fail_stop: bool,
    creates: usize,
    starts: HashMap<String, usize>,
    stops: HashMap<String, usize>,
}

/// Scripted capability primitive that counts start and stop calls per handle
#[derive(Debug, Clone, Default)]
pub struct StubPrimitive {
    script: Arc<Mutex<Script>>,
}

impl StubPrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_create(&self, deny: bool) {
        self.script.lock().deny_create = deny;
    }

    pub fn report_stale(&self, stale: bool) {
        self.script.lock().stale = stale;
    }

    pub fn report_unresolvable(&self, unresolvable: bool) {
        self.script.lock().unresolvable = unresolvable;
    }

    pub fn refuse_start(&self, refuse: bool) {
        self.script.lock().refuse_start = refuse;
    }

    pub fn fail_stop(&self, fail: bool) {
        self.script.lock().fail_stop = fail;
    }

    /// Number of OS permission prompts shown
    pub fn creates(&self) -> usize {
        self.script.lock().creates
    }

    pub fn starts(&self, resource: &str) -> usize {
        self.script.lock().starts.get(resource).copied().unwrap_or(0)
    }

    pub fn stops(&self, resource: &str) -> usize {
        self.script.lock().stops.get(resource).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CapabilityPrimitive for StubPrimitive {
    type Handle = StubHandle;

    async fn create(
        &self,
        resource: &ResourceIdentity,
        _mode: TokenMode,
    ) -> Result<TokenBytes, OsError> {
        let mut script = self.script.lock();
        if script.deny_create {
            return Err(OsError::denied("user cancelled the open panel"));
        }
        script.creates += 1;
        Ok(TokenBytes::new(format!("{STUB_PREFIX}{resource}").into_bytes()))
    }

    async fn resolve(&self, bytes: &TokenBytes) -> Result<Resolution<StubHandle>, OsError> {
        let script = self.script.lock();
        if script.unresolvable {
            return Err(OsError::unresolvable("bookmark data is corrupt"));
        }
        let text = std::str::from_utf8(bytes.as_bytes())
            .ok()
            .and_then(|text| text.strip_prefix(STUB_PREFIX))
            .ok_or_else(|| OsError::unresolvable("not a stub token"))?;
        let handle = StubHandle(text.to_string());
        Ok(if script.stale {
            Resolution::stale(handle)
        } else {
            Resolution::fresh(handle)
        })
    }

    fn start_access(&self, handle: &StubHandle) -> bool {
        let mut script = self.script.lock();
        if script.refuse_start {
            return false;
        }
        *script.starts.entry(handle.0.clone()).or_default() += 1;
        true
    }

    fn stop_access(&self, handle: &StubHandle) -> Result<(), OsError> {
        let mut script = self.script.lock();
        *script.stops.entry(handle.0.clone()).or_default() += 1;
        if script.fail_stop {
            return Err(OsError::failed("stop rejected"));
        }
        Ok(())
    }
}

pub fn resource(path: &str) -> ResourceIdentity {
    ResourceIdentity::new(path).unwrap()
}

pub fn config() -> AccessConfig {
    AccessConfig::builder()
        .with_service("com.example.editor")
        .build()
        .unwrap()
}

pub fn manager_over(
    vault: Arc<dyn Vault>,
    primitive: StubPrimitive,
) -> CapabilityManager<StubPrimitive> {
    let config = config();
    CapabilityManager::new(primitive, TokenStore::new(vault, &config), &config)
}

pub struct Harness {
    pub manager: CapabilityManager<StubPrimitive>,
    pub primitive: StubPrimitive,
    pub vault: Arc<MemoryVault>,
}

pub fn harness() -> Harness {
    let vault = Arc::new(MemoryVault::new());
    let primitive = StubPrimitive::new();
    let manager = manager_over(vault.clone(), primitive.clone());
    Harness {
        manager,
        primitive,
        vault,
    }
}

/// Memory vault whose writes can be held back to widen race windows
#[derive(Debug, Default)]
pub struct SlowVault {
    inner: MemoryVault,
    put_delay_ms: AtomicU64,
}

impl SlowVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay_puts(&self, delay: Duration) {
        self.put_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl Vault for SlowVault {
    async fn put(&self, key: &str, bytes: &[u8], scope: Option<&str>) -> Result<(), VaultError> {
        let delay = self.put_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.inner.put(key, bytes, scope).await
    }

    async fn get(&self, key: &str, scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError> {
        self.inner.get(key, scope).await
    }

    async fn delete(&self, key: &str, scope: Option<&str>) -> Result<(), VaultError> {
        self.inner.delete(key, scope).await
    }
}
