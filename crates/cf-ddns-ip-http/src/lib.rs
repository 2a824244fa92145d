// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the DDNS updater.
//
// ## Architecture
//
// Fetches the current address from plain-text echo services (by default
// api.ipify.org for IPv4 and api6.ipify.org for IPv6). Each family has its own
// client bound to an unspecified local address of that family, so a
// dual-stack host cannot answer an IPv4 question over IPv6 or the other way
// round.
//
// Every call is a fresh request; the job decides how often to ask.

use cf_ddns_core::{Error, IpFamily, IpSource, IpSourceConfig, Result};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// HTTP-based IP source
#[derive(Debug)]
pub struct HttpIpSource {
    /// Echo service reachable over IPv4
    ipv4_url: String,

    /// Echo service reachable over IPv6
    ipv6_url: String,

    /// Client bound to 0.0.0.0
    v4_client: reqwest::Client,

    /// Client bound to ::
    v6_client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    pub fn new(config: &IpSourceConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        Ok(Self {
            ipv4_url: config.ipv4_url.clone(),
            ipv6_url: config.ipv6_url.clone(),
            v4_client: build_client(IpAddr::V4(Ipv4Addr::UNSPECIFIED), timeout)?,
            v6_client: build_client(IpAddr::V6(Ipv6Addr::UNSPECIFIED), timeout)?,
        })
    }

    fn endpoint(&self, family: IpFamily) -> (&reqwest::Client, &str) {
        match family {
            IpFamily::V4 => (&self.v4_client, &self.ipv4_url),
            IpFamily::V6 => (&self.v6_client, &self.ipv6_url),
        }
    }
}

fn build_client(local_address: IpAddr, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .local_address(local_address)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::ip_lookup(format!("Failed to build HTTP client: {}", e)))
}

/// Parse an echo service body as an address of the requested family
fn parse_address(body: &str, family: IpFamily) -> Result<IpAddr> {
    let text = body.trim();

    let ip: IpAddr = text
        .parse()
        .map_err(|_| Error::ip_lookup(format!("Invalid IP address: {}", text)))?;

    match (family, ip) {
        (IpFamily::V4, IpAddr::V4(_)) | (IpFamily::V6, IpAddr::V6(_)) => Ok(ip),
        _ => Err(Error::ip_lookup(format!("Expected {}, got: {}", family, ip))),
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self, family: IpFamily) -> Result<IpAddr> {
        let (client, url) = self.endpoint(family);
        tracing::debug!("Fetching current {} address from {}", family, url);

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ip_lookup(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_lookup(format!(
                "HTTP error from {}: {}",
                url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_lookup(format!("Failed to read response: {}", e)))?;

        parse_address(&body, family)
    }
}
