use clap::Parser;

use cf_ddns_core::config::{DEFAULT_API_BASE, DEFAULT_DELAY, DEFAULT_IPV4_URL, DEFAULT_IPV6_URL};
use cf_ddns_core::{Credential, IpSourceConfig, ProviderConfig, RawJobConfig};

macro_rules! env_prefix {
    () => {
        "CF_DDNS_"
    };
}

/// Extra domains, space separated, appended after the command line ones
pub const DOMAINS_ENV_VAR: &str = concat!(env_prefix!(), "DOMAINS");

/// Keep Cloudflare A/AAAA records pointed at this host's public address
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Time between updates, e.g. "1h 30m" or "90 minutes"
    #[arg(
        short = 'd',
        long,
        default_value = DEFAULT_DELAY,
        env = concat!(env_prefix!(), "DELAY")
    )]
    pub delay: String,

    /// Cloudflare API token, prompted for when not given
    #[arg(
        short = 'k',
        long,
        value_name = "API_TOKEN",
        hide_env_values = true,
        env = concat!(env_prefix!(), "TOKEN")
    )]
    pub token: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long, action, default_value_t = false)]
    pub verbose: bool,

    /// Resolve records and look up addresses, but do not change anything
    #[arg(long, action, default_value_t = false, env = concat!(env_prefix!(), "DRY_RUN"))]
    pub dry_run: bool,

    /// Cloudflare API base URL
    #[arg(long, hide = true, default_value = DEFAULT_API_BASE, env = concat!(env_prefix!(), "API_BASE"))]
    pub api_base: String,

    /// Echo service returning this host's IPv4 address
    #[arg(long, default_value = DEFAULT_IPV4_URL, env = concat!(env_prefix!(), "IPV4_URL"))]
    pub ipv4_url: String,

    /// Echo service returning this host's IPv6 address
    #[arg(long, default_value = DEFAULT_IPV6_URL, env = concat!(env_prefix!(), "IPV6_URL"))]
    pub ipv6_url: String,

    /// Timeout for every HTTP request, in seconds
    #[arg(long, value_name = "SECONDS", env = concat!(env_prefix!(), "HTTP_TIMEOUT"))]
    pub http_timeout: Option<u64>,

    /// Records to update: `example.com` (A and/or AAAA) or `TYPE:example.com`
    #[arg(value_name = "DOMAIN")]
    pub domains: Vec<String>,
}

impl Cli {
    /// Command line domains followed by those from the environment
    pub fn all_domains(&self, env_domains: Option<&str>) -> Vec<String> {
        self.domains
            .iter()
            .cloned()
            .chain(
                env_domains
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string),
            )
            .collect()
    }

    pub fn raw_config(&self, credential: Credential, env_domains: Option<&str>) -> RawJobConfig {
        RawJobConfig::new(credential, self.all_domains(env_domains))
            .with_delay(self.delay.clone())
            .with_dry_run(self.dry_run)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let mut config = ProviderConfig {
            api_base: self.api_base.clone(),
            ..ProviderConfig::default()
        };
        if let Some(timeout) = self.http_timeout {
            config.http_timeout_secs = timeout;
        }
        config
    }

    pub fn ip_source_config(&self) -> IpSourceConfig {
        let mut config = IpSourceConfig {
            ipv4_url: self.ipv4_url.clone(),
            ipv6_url: self.ipv6_url.clone(),
            ..IpSourceConfig::default()
        };
        if let Some(timeout) = self.http_timeout {
            config.http_timeout_secs = timeout;
        }
        config
    }
}
