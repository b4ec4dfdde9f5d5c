use sandbox_access_core::{DEFAULT_SERVICE_NAME, VAULT_FILE_NAME};
use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for sandbox-access
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_DATA_HOME/sandbox-access or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join(DEFAULT_SERVICE_NAME)
    }

    /// Default location of the file-backed token vault
    pub fn vault_file() -> PathBuf {
        Self::data_dir().join(VAULT_FILE_NAME)
    }
}
