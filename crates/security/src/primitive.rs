//! The seam to the operating-system capability primitive

use async_trait::async_trait;
use sandbox_access_core::{OsError, ResourceIdentity, TokenBytes, TokenMode};
use std::fmt;

/// Outcome of resolving token bytes back into a live handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution<H> {
    pub handle: H,
    /// The token still resolved but no longer reliably names the resource
    pub is_stale: bool,
}

impl<H> Resolution<H> {
    pub fn fresh(handle: H) -> Self {
        Self {
            handle,
            is_stale: false,
        }
    }

    pub fn stale(handle: H) -> Self {
        Self {
            handle,
            is_stale: true,
        }
    }
}

/// OS capability primitive: create and resolve tokens, bracket access to a handle.
///
/// `create` and `resolve` may block on user interaction or disk access and are
/// async. `start_access` and `stop_access` are fast, synchronous OS calls.
#[async_trait]
pub trait CapabilityPrimitive: Send + Sync {
    /// Live handle to a resolved resource
    type Handle: Clone + fmt::Debug + Send + Sync + 'static;

    /// Issue token bytes for a resource the user has granted access to
    async fn create(
        &self,
        resource: &ResourceIdentity,
        mode: TokenMode,
    ) -> Result<TokenBytes, OsError>;

    /// Turn token bytes back into a handle, reporting staleness
    async fn resolve(&self, bytes: &TokenBytes) -> Result<Resolution<Self::Handle>, OsError>;

    /// Begin using the handle; returns false when the OS refuses
    fn start_access(&self, handle: &Self::Handle) -> bool;

    /// Stop using the handle
    fn stop_access(&self, handle: &Self::Handle) -> Result<(), OsError>;
}
