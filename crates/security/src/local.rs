//! Capability primitive for hosts without an OS sandbox
//!
//! A token records the resource path and, on unix, its inode and device so a path
//! that was deleted and recreated, or replaced by a rename, resolves as stale.

use crate::primitive::{CapabilityPrimitive, Resolution};
use async_trait::async_trait;
use sandbox_access_core::{OsError, ResourceIdentity, TokenBytes, TokenMode};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Serialize, Deserialize)]
struct LocalToken {
    path: PathBuf,
    mode: TokenMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_id: Option<FileId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct FileId {
    dev: u64,
    ino: u64,
}

#[cfg(unix)]
fn file_id(metadata: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        dev: metadata.dev(),
        ino: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_metadata: &Metadata) -> Option<FileId> {
    None
}

/// Resolved local resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHandle {
    path: PathBuf,
    mode: TokenMode,
}

impl LocalHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> TokenMode {
        self.mode
    }
}

/// Path-based primitive; `stop_access` has nothing to release
#[derive(Debug, Default)]
pub struct LocalPrimitive {
    active: AtomicUsize,
}

impl LocalPrimitive {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of started accesses not yet stopped
    pub fn active_accesses(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

async fn metadata(path: &Path) -> std::io::Result<Option<Metadata>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn io_failure(path: &Path, error: &std::io::Error) -> OsError {
    let message = format!("{}: {error}", path.display());
    match error.kind() {
        ErrorKind::PermissionDenied => OsError::denied(message),
        _ => OsError::failed(message),
    }
}

#[async_trait]
impl CapabilityPrimitive for LocalPrimitive {
    type Handle = LocalHandle;

    async fn create(
        &self,
        resource: &ResourceIdentity,
        mode: TokenMode,
    ) -> Result<TokenBytes, OsError> {
        let path = resource.to_path_buf();
        let metadata = metadata(&path)
            .await
            .map_err(|e| io_failure(&path, &e))?
            .ok_or_else(|| OsError::failed(format!("{} does not exist", path.display())))?;

        if mode == TokenMode::ReadWrite && metadata.permissions().readonly() {
            return Err(OsError::denied(format!(
                "{} is read-only",
                path.display()
            )));
        }

        let token = LocalToken {
            path,
            mode,
            file_id: file_id(&metadata),
        };
        serde_json::to_vec(&token)
            .map(TokenBytes::new)
            .map_err(|e| OsError::failed(format!("cannot encode token: {e}")))
    }

    async fn resolve(&self, bytes: &TokenBytes) -> Result<Resolution<LocalHandle>, OsError> {
        let token: LocalToken = serde_json::from_slice(bytes.as_bytes())
            .map_err(|e| OsError::unresolvable(format!("not a local capability token: {e}")))?;

        let current = metadata(&token.path)
            .await
            .map_err(|e| io_failure(&token.path, &e))?;
        let handle = LocalHandle {
            path: token.path,
            mode: token.mode,
        };

        let Some(current) = current else {
            return Ok(Resolution::stale(handle));
        };
        match (token.file_id, file_id(&current)) {
            (Some(recorded), Some(now)) if recorded != now => Ok(Resolution::stale(handle)),
            _ => Ok(Resolution::fresh(handle)),
        }
    }

    fn start_access(&self, handle: &LocalHandle) -> bool {
        if !handle.path.exists() {
            return false;
        }
        self.active.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn stop_access(&self, _handle: &LocalHandle) -> Result<(), OsError> {
        let _ = self
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resource(path: &Path) -> ResourceIdentity {
        ResourceIdentity::from_path(path).unwrap()
    }

    #[tokio::test]
    async fn test_existing_directory_resolves_fresh() {
        let temp_dir = TempDir::new().unwrap();
        let primitive = LocalPrimitive::new();

        let bytes = primitive
            .create(&resource(temp_dir.path()), TokenMode::ReadWrite)
            .await
            .unwrap();
        let resolution = primitive.resolve(&bytes).await.unwrap();

        assert!(!resolution.is_stale);
        assert_eq!(resolution.handle.mode(), TokenMode::ReadWrite);
        assert!(primitive.start_access(&resolution.handle));
        assert_eq!(primitive.active_accesses(), 1);
        primitive.stop_access(&resolution.handle).unwrap();
        assert_eq!(primitive.active_accesses(), 0);
    }

    #[tokio::test]
    async fn test_removed_path_resolves_stale() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("project");
        std::fs::create_dir(&dir).unwrap();
        let primitive = LocalPrimitive::new();

        let bytes = primitive
            .create(&resource(&dir), TokenMode::ReadOnly)
            .await
            .unwrap();
        std::fs::remove_dir(&dir).unwrap();

        let resolution = primitive.resolve(&bytes).await.unwrap();
        assert!(resolution.is_stale);
        assert!(!primitive.start_access(&resolution.handle));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replaced_file_resolves_stale() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("notes.txt");
        let other = temp_dir.path().join("other.txt");
        std::fs::write(&file, "a").unwrap();
        std::fs::write(&other, "b").unwrap();
        let primitive = LocalPrimitive::new();

        let bytes = primitive
            .create(&resource(&file), TokenMode::ReadOnly)
            .await
            .unwrap();
        std::fs::rename(&other, &file).unwrap();

        assert!(primitive.resolve(&bytes).await.unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_missing_path_cannot_be_granted() {
        let temp_dir = TempDir::new().unwrap();
        let primitive = LocalPrimitive::new();

        let error = primitive
            .create(&resource(&temp_dir.path().join("absent")), TokenMode::ReadOnly)
            .await
            .unwrap_err();
        assert!(matches!(error, OsError::Failed { .. }));
    }

    #[tokio::test]
    async fn test_foreign_bytes_are_unresolvable() {
        let primitive = LocalPrimitive::new();
        let error = primitive
            .resolve(&TokenBytes::new(b"\x00bookmark".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(error, OsError::Unresolvable { .. }));
    }

    #[test]
    fn test_stop_without_start_does_not_underflow() {
        let primitive = LocalPrimitive::new();
        let handle = LocalHandle {
            path: PathBuf::from("/"),
            mode: TokenMode::ReadOnly,
        };
        primitive.stop_access(&handle).unwrap();
        assert_eq!(primitive.active_accesses(), 0);
    }
}
