//! Vault backed by a single JSON document on disk
//!
//! Used on hosts without a platform keychain and in development. Every mutation is
//! a read-modify-write of the whole document, serialised by an async mutex within
//! one instance and by an advisory lock on `<path>.lock` across instances and
//! processes, then committed with an atomic rename so a crash never truncates the file.

use super::Vault;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use fs2::FileExt;
use sandbox_access_core::{AccessConfig, CapabilityError, VaultError};
use sandbox_access_utils::{read_optional, write_atomic, XdgPaths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

const DOCUMENT_VERSION: u32 = 1;
const LOCK_SUFFIX: &str = ".lock";

#[derive(Debug, Serialize, Deserialize)]
struct VaultDocument {
    version: u32,
    /// Unscoped entries, key -> base64 blob
    #[serde(default)]
    private: BTreeMap<String, String>,
    /// Scoped entries, access group -> key -> base64 blob
    #[serde(default)]
    shared: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for VaultDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            private: BTreeMap::new(),
            shared: BTreeMap::new(),
        }
    }
}

impl VaultDocument {
    fn entries(&self, scope: Option<&str>) -> Option<&BTreeMap<String, String>> {
        match scope {
            None => Some(&self.private),
            Some(group) => self.shared.get(group),
        }
    }

    fn entries_mut(&mut self, scope: Option<&str>) -> &mut BTreeMap<String, String> {
        match scope {
            None => &mut self.private,
            Some(group) => self.shared.entry(group.to_string()).or_default(),
        }
    }
}

/// File-backed vault
#[derive(Debug, Clone)]
pub struct FileVault {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl FileVault {
    /// Create a vault stored at `path`; the file is created on first write
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a vault at the configured path, defaulting to the XDG data directory
    #[must_use]
    pub fn from_config(config: &AccessConfig) -> Self {
        Self::new(config.vault_path_or(&XdgPaths::vault_file()))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, operation: F) -> Result<T, VaultError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, VaultError> + Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || operation(&path))
            .await
            .map_err(|e| VaultError::unavailable(format!("vault worker failed: {e}")))?
    }

    async fn update<F>(&self, mutate: F) -> Result<(), VaultError>
    where
        F: FnOnce(&mut VaultDocument) -> bool + Send + 'static,
    {
        let _guard = self.lock.lock().await;
        self.blocking(move |path| {
            let _file_lock = DocumentLock::exclusive(path)?;
            let mut document = load_document(path)?;
            if mutate(&mut document) {
                store_document(path, &document)?;
            }
            Ok(())
        })
        .await
    }
}

/// Advisory lock on the sidecar file next to the vault document, released on drop
#[derive(Debug)]
struct DocumentLock {
    file: File,
}

impl DocumentLock {
    fn exclusive(path: &Path) -> Result<Self, VaultError> {
        let file = open_lock_file(path)?;
        FileExt::lock_exclusive(&file).map_err(io_error)?;
        Ok(Self { file })
    }

    fn shared(path: &Path) -> Result<Self, VaultError> {
        let file = open_lock_file(path)?;
        FileExt::lock_shared(&file).map_err(io_error)?;
        Ok(Self { file })
    }
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

fn open_lock_file(path: &Path) -> Result<File, VaultError> {
    let lock_path = lock_path(path);
    if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(io_error)
}

fn io_error(error: std::io::Error) -> VaultError {
    match error.kind() {
        ErrorKind::PermissionDenied => VaultError::permission_denied(error.to_string()),
        _ => VaultError::Io(error),
    }
}

fn load_document(path: &Path) -> Result<VaultDocument, VaultError> {
    let Some(bytes) = read_optional(path).map_err(io_error)? else {
        return Ok(VaultDocument::default());
    };

    let document: VaultDocument = serde_json::from_slice(&bytes)
        .map_err(|e| VaultError::corrupt(format!("{}: {e}", path.display())))?;
    if document.version != DOCUMENT_VERSION {
        return Err(VaultError::corrupt(format!(
            "{}: unsupported vault version {}",
            path.display(),
            document.version
        )));
    }
    Ok(document)
}

fn store_document(path: &Path, document: &VaultDocument) -> Result<(), VaultError> {
    let bytes = serde_json::to_vec_pretty(document)
        .map_err(|e| VaultError::corrupt(format!("cannot encode vault document: {e}")))?;
    write_atomic(path, &bytes).map_err(|error| match error {
        CapabilityError::FileSystem { source, .. } => io_error(source),
        other => VaultError::unavailable(other.to_string()),
    })
}

#[async_trait]
impl Vault for FileVault {
    async fn put(&self, key: &str, bytes: &[u8], scope: Option<&str>) -> Result<(), VaultError> {
        let key = key.to_string();
        let scope = scope.map(str::to_string);
        let encoded = STANDARD.encode(bytes);
        self.update(move |document| {
            document
                .entries_mut(scope.as_deref())
                .insert(key, encoded);
            true
        })
        .await
    }

    async fn get(&self, key: &str, scope: Option<&str>) -> Result<Option<Vec<u8>>, VaultError> {
        let _guard = self.lock.lock().await;
        let key = key.to_string();
        let scope = scope.map(str::to_string);
        self.blocking(move |path| {
            let _file_lock = DocumentLock::shared(path)?;
            let document = load_document(path)?;
            document
                .entries(scope.as_deref())
                .and_then(|entries| entries.get(&key))
                .map(|encoded| {
                    STANDARD
                        .decode(encoded.as_bytes())
                        .map_err(|e| VaultError::corrupt(format!("entry '{key}': {e}")))
                })
                .transpose()
        })
        .await
    }

    async fn delete(&self, key: &str, scope: Option<&str>) -> Result<(), VaultError> {
        let key = key.to_string();
        let scope = scope.map(str::to_string);
        self.update(move |document| {
            let removed = document
                .entries_mut(scope.as_deref())
                .remove(&key)
                .is_some();
            if let Some(group) = scope.as_deref() {
                if document.shared.get(group).is_some_and(BTreeMap::is_empty) {
                    document.shared.remove(group);
                }
            }
            removed
        })
        .await
    }
}
