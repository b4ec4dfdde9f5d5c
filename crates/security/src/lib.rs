//! Capability-token lifecycle and access-session management
//!
//! This crate provides:
//! - The `CapabilityPrimitive` trait wrapping the OS capability calls, plus a
//!   `LocalPrimitive` for unsandboxed hosts
//! - `AccessSessionRegistry`, enforcing one open session per resource
//! - `CapabilityManager`, orchestrating create/recover/begin/end/revoke/shutdown
//! - `PermissionLedger` and `PermissionValidator` for permission kinds and levels
//! - Structured audit events for the access lifecycle

pub mod audit;
pub mod ledger;
pub mod local;
pub mod manager;
pub mod primitive;
pub mod registry;
pub mod validator;

pub use audit::{AccessEvent, AuditLog};
pub use ledger::PermissionLedger;
pub use local::{LocalHandle, LocalPrimitive};
pub use manager::CapabilityManager;
pub use primitive::{CapabilityPrimitive, Resolution};
pub use registry::{AccessSession, AccessSessionRegistry};
pub use validator::{AlwaysAvailable, PermissionValidator, ResourceAvailability, UnavailableKinds};
