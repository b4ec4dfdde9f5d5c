//! Access configuration with builder and environment precedence

use crate::constants::{
    ACCESS_GROUP_ENV_VAR, DEFAULT_SERVICE_NAME, PROBE_ENV_VAR, SERVICE_ENV_VAR,
    VAULT_KEY_SEPARATOR, VAULT_PATH_ENV_VAR,
};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Settings shared by the token store and the capability manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Namespace prefixed to every vault key
    pub service: String,
    /// Shared scope so a companion process can read persisted tokens
    pub access_group: Option<String>,
    /// File used by the file-backed vault; `None` selects the XDG data directory
    pub vault_path: Option<PathBuf>,
    /// Probe recovered tokens with a start/stop round trip
    pub probe_on_recover: bool,
    /// Where the last override came from
    pub source: ConfigSource,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            service: DEFAULT_SERVICE_NAME.to_string(),
            access_group: None,
            vault_path: None,
            probe_on_recover: true,
            source: ConfigSource::Default,
        }
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// Environment variable
    EnvironmentVariable(String),
    /// Set programmatically through the builder
    Explicit,
}

impl AccessConfig {
    /// Start a builder from the defaults
    #[must_use]
    pub fn builder() -> AccessConfigBuilder {
        AccessConfigBuilder::new()
    }

    /// Load the defaults overridden by `SANDBOX_ACCESS_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(service) = read_var(SERVICE_ENV_VAR) {
            config.service = service;
            config.source = ConfigSource::EnvironmentVariable(SERVICE_ENV_VAR.to_string());
        }
        if let Some(group) = read_var(ACCESS_GROUP_ENV_VAR) {
            config.access_group = Some(group);
            config.source = ConfigSource::EnvironmentVariable(ACCESS_GROUP_ENV_VAR.to_string());
        }
        if let Some(path) = read_var(VAULT_PATH_ENV_VAR) {
            config.vault_path = Some(PathBuf::from(path));
            config.source = ConfigSource::EnvironmentVariable(VAULT_PATH_ENV_VAR.to_string());
        }
        if let Some(flag) = read_var(PROBE_ENV_VAR) {
            config.probe_on_recover = parse_flag(PROBE_ENV_VAR, &flag)?;
            config.source = ConfigSource::EnvironmentVariable(PROBE_ENV_VAR.to_string());
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that the builder and environment loading cannot express
    pub fn validate(&self) -> Result<()> {
        if self.service.trim().is_empty() {
            return Err(Error::configuration("service name cannot be empty"));
        }
        if self.service.contains(VAULT_KEY_SEPARATOR) {
            return Err(Error::configuration(format!(
                "service name '{}' cannot contain '{VAULT_KEY_SEPARATOR}'",
                self.service
            )));
        }
        if matches!(&self.access_group, Some(group) if group.trim().is_empty()) {
            return Err(Error::configuration(
                "access group cannot be empty when set",
            ));
        }
        Ok(())
    }

    /// The configured vault file, or `default` when none is set
    #[must_use]
    pub fn vault_path_or(&self, default: &Path) -> PathBuf {
        self.vault_path
            .clone()
            .unwrap_or_else(|| default.to_path_buf())
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

/// Builder for creating access configurations
#[derive(Debug, Default)]
pub struct AccessConfigBuilder {
    config: AccessConfig,
}

impl AccessConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration, e.g. one loaded from the environment
    #[must_use]
    pub fn from_config(config: AccessConfig) -> Self {
        Self { config }
    }

    /// Set the vault key namespace
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.config.service = service.into();
        self.config.source = ConfigSource::Explicit;
        self
    }

    /// Share persisted tokens through an access group
    #[must_use]
    pub fn with_access_group(mut self, group: impl Into<String>) -> Self {
        self.config.access_group = Some(group.into());
        self.config.source = ConfigSource::Explicit;
        self
    }

    /// Set the file-backed vault location
    #[must_use]
    pub fn with_vault_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.vault_path = Some(path.into());
        self.config.source = ConfigSource::Explicit;
        self
    }

    /// Enable or disable the recovery probe
    #[must_use]
    pub fn with_probe_on_recover(mut self, probe: bool) -> Self {
        self.config.probe_on_recover = probe;
        self.config.source = ConfigSource::Explicit;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AccessConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for var in [
            SERVICE_ENV_VAR,
            ACCESS_GROUP_ENV_VAR,
            VAULT_PATH_ENV_VAR,
            PROBE_ENV_VAR,
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.service, DEFAULT_SERVICE_NAME);
        assert!(config.access_group.is_none());
        assert!(config.probe_on_recover);
        assert_eq!(config.source, ConfigSource::Default);
    }

    #[test]
    fn test_builder_overrides() {
        let config = AccessConfig::builder()
            .with_service("com.example.editor")
            .with_access_group("TEAMID.com.example.shared")
            .with_probe_on_recover(false)
            .build()
            .unwrap();

        assert_eq!(config.service, "com.example.editor");
        assert_eq!(
            config.access_group.as_deref(),
            Some("TEAMID.com.example.shared")
        );
        assert!(!config.probe_on_recover);
        assert_eq!(config.source, ConfigSource::Explicit);
    }

    #[test]
    fn test_builder_rejects_empty_names() {
        assert!(AccessConfig::builder().with_service("  ").build().is_err());
        assert!(AccessConfig::builder()
            .with_access_group("")
            .build()
            .is_err());
    }

    #[test]
    fn test_service_cannot_contain_the_key_separator() {
        let error = AccessConfig::builder()
            .with_service("com.example:editor")
            .build()
            .unwrap_err();
        assert!(matches!(error, Error::Configuration { .. }));
        assert!(AccessConfig::builder()
            .with_service("com.example.editor")
            .build()
            .is_ok());
    }

    #[test]
    fn test_vault_path_fallback() {
        let default = Path::new("/var/lib/tokens.json");
        assert_eq!(AccessConfig::default().vault_path_or(default), default);

        let config = AccessConfig::builder()
            .with_vault_path("/tmp/tokens.json")
            .build()
            .unwrap();
        assert_eq!(config.vault_path_or(default), Path::new("/tmp/tokens.json"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        env::set_var(SERVICE_ENV_VAR, "com.example.viewer");
        env::set_var(PROBE_ENV_VAR, "no");

        let config = AccessConfig::from_env().unwrap();
        assert_eq!(config.service, "com.example.viewer");
        assert!(!config.probe_on_recover);
        assert_eq!(
            config.source,
            ConfigSource::EnvironmentVariable(PROBE_ENV_VAR.to_string())
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_flag() {
        clear_env();
        env::set_var(PROBE_ENV_VAR, "sometimes");

        let error = AccessConfig::from_env().unwrap_err();
        assert!(error.to_string().contains(PROBE_ENV_VAR));

        clear_env();
    }
}
