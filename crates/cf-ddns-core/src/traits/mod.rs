//! Core traits for the DDNS updater
//!
//! The reconciliation job only talks to the outside world through these:
//!
//! - [`DnsProvider`]: list and patch records via the provider API
//! - [`IpSource`]: discover the host's current public address

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::IpSource;
pub use dns_provider::DnsProvider;
