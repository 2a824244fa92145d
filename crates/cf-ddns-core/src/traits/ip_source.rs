// # IP Source Trait
//
// Defines the interface for discovering the host's current public address.
//
// ## Implementations
//
// - HTTP echo services: `cf-ddns-ip-http` crate

use async_trait::async_trait;
use std::net::IpAddr;

use crate::domain::IpFamily;

/// Trait for IP source implementations
///
/// No caching: every call performs a fresh lookup, the job decides how often
/// to ask. Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public address of the requested family
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: an address of exactly `family`
    /// - `Err(Error::IpLookup)`: transport failure, non-success status, or a
    ///   body that is not an address of that family
    async fn current(&self, family: IpFamily) -> Result<IpAddr, crate::Error>;
}
