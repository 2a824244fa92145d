// # DNS Provider Trait
//
// Defines the interface the reconciliation job uses to talk to the DNS
// provider's REST API.
//
// ## Implementations
//
// - Cloudflare: `cf-ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cf_ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     provider.verify_credential().await?;
//     for zone_id in provider.list_zones().await? {
//         for record in provider.list_records(&zone_id).await? {
//             println!("{} {}", record.record_type, record.name);
//         }
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::domain::RawRecord;

/// Trait for DNS provider implementations
///
/// Every call is authenticated with the provider credential the
/// implementation was built with. Calls are single-shot: implementations
/// must not retry, sleep or spawn tasks. Scheduling and failure policy are
/// owned by the reconciliation job.
///
/// # Error classification
///
/// - A non-2xx response carrying the provider's error envelope becomes
///   [`Error::Provider`](crate::Error::Provider) with the `code: message` list.
/// - Any other failure becomes [`Error::Transport`](crate::Error::Transport)
///   with the HTTP status and reason phrase.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Check that the credential is accepted
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the credential is valid
    /// - `Err(Error::CredentialInvalid)`: rejected, with the provider's
    ///   messages joined by " / "
    /// - `Err(Error::Transport)`: the check itself could not be performed
    async fn verify_credential(&self) -> Result<(), crate::Error>;

    /// List the ids of every zone visible to the credential
    async fn list_zones(&self) -> Result<Vec<String>, crate::Error>;

    /// List every record in a zone, of any type
    async fn list_records(&self, zone_id: &str) -> Result<Vec<RawRecord>, crate::Error>;

    /// Replace the content of one record
    ///
    /// Idempotent: sending the same content twice is safe.
    async fn patch_record_content(
        &self,
        zone_id: &str,
        record_id: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
