//! Shared utilities for sandbox-access
//!
//! Small helpers used across the workspace: tracing setup, crash-safe file writes
//! and XDG directory resolution.

pub mod atomic_file;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use xdg::*;
