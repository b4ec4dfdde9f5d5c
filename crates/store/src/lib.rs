//! Durable persistence of capability tokens
//!
//! This crate provides:
//! - The `Vault` trait, the seam to the external secure key-value store
//! - `MemoryVault` and `FileVault` implementations
//! - `TokenStore`, the only component that reads or writes persisted tokens

pub mod codec;
pub mod token_store;
pub mod vault;

pub use token_store::TokenStore;
pub use vault::{FileVault, MemoryVault, Vault};
