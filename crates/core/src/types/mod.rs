//! Domain types for the capability-token lifecycle.
//!
//! ## Organization
//!
//! - **`resource`**: normalized resource identities used as store and registry keys
//! - **`token`**: persisted capability tokens and their opaque OS bytes
//! - **`permission`**: permission kinds, access levels and grants
//! - **`validation`**: validation results returned by permission checks

pub mod permission;
pub mod resource;
pub mod token;
pub mod validation;

pub use permission::*;
pub use resource::*;
pub use token::*;
pub use validation::*;
