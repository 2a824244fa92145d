//! Configuration types for the DDNS updater
//!
//! [`RawJobConfig`] is what the front-end collects from the command line and
//! environment. The reconciliation job validates it into a [`JobConfig`].
//! Endpoint settings for the two remote services live in [`ProviderConfig`]
//! and [`IpSourceConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::DomainSpec;

/// Delay used when none is given
pub const DEFAULT_DELAY: &str = "5 minutes";

/// Cloudflare API v4 base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// IPv4-only echo service
pub const DEFAULT_IPV4_URL: &str = "https://api.ipify.org/";

/// IPv6-only echo service
pub const DEFAULT_IPV6_URL: &str = "https://api6.ipify.org/";

/// Provider API bearer token
///
/// The Debug implementation intentionally does NOT expose the token.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<REDACTED>)")
    }
}

/// Unvalidated job input
#[derive(Debug, Clone)]
pub struct RawJobConfig {
    /// Interval between update passes, in duration syntax (`"1h 30m"`)
    pub delay: String,

    /// Provider bearer token
    pub credential: Credential,

    /// Domain specs, `example.com` or `TYPE:example.com`
    pub domains: Vec<String>,

    /// Resolve and look up addresses, but never PATCH
    pub dry_run: bool,
}

impl RawJobConfig {
    pub fn new(credential: Credential, domains: Vec<String>) -> Self {
        Self {
            delay: DEFAULT_DELAY.to_string(),
            credential,
            domains,
            dry_run: false,
        }
    }

    /// Set the delay string
    pub fn with_delay(mut self, delay: impl Into<String>) -> Self {
        self.delay = delay.into();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Validated job configuration, immutable for the job's lifetime
///
/// Holds no credential: the token only lives in the provider the job owns.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Seconds between update passes, at least 1
    pub delay_secs: u64,

    /// Parsed domain specs, in input order, never empty
    pub domain_specs: Vec<DomainSpec>,

    /// Skip PATCH requests
    pub dry_run: bool,
}

impl JobConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// DNS provider endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API base URL, without trailing slash
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            http_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

/// Public address echo endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpSourceConfig {
    /// Endpoint reachable only over IPv4
    #[serde(default = "default_ipv4_url")]
    pub ipv4_url: String,

    /// Endpoint reachable only over IPv6
    #[serde(default = "default_ipv6_url")]
    pub ipv6_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_ip_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        Self {
            ipv4_url: default_ipv4_url(),
            ipv6_url: default_ipv6_url(),
            http_timeout_secs: default_ip_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_provider_timeout_secs() -> u64 {
    30
}

fn default_ipv4_url() -> String {
    DEFAULT_IPV4_URL.to_string()
}

fn default_ipv6_url() -> String {
    DEFAULT_IPV6_URL.to_string()
}

fn default_ip_timeout_secs() -> u64 {
    10
}
