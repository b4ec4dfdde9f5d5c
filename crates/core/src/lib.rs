//! Core domain types, errors, and configuration for `sandbox-access`.
//!
//! Everything the capability-token lifecycle needs to agree on lives here so the
//! store and security crates share one vocabulary.
//!
//! ## Key Components
//!
//! - **`errors`**: the `CapabilityError` taxonomy plus the vault, store and OS
//!   primitive errors it wraps, with a `Result` alias.
//! - **`types`**: `ResourceIdentity`, `CapabilityToken`, permission kinds and access
//!   levels, and validation results.
//! - **`config`**: `AccessConfig` and its builder/environment loading.
//! - **`constants`**: shared names such as environment variables and the audit target.

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    config::{AccessConfig, AccessConfigBuilder, ConfigSource},
    constants::*,
    errors::{
        CapabilityError, Error, OsError, RecoveryHint, Result, StoreError, VaultError,
        VaultResultExt,
    },
    types::*,
};
