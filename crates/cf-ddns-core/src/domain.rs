//! Domain model: record types, user domain specs and managed records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// DNS record types this updater manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[serde(rename = "A")]
    A,
    /// AAAA record (IPv6)
    #[serde(rename = "AAAA")]
    Aaaa,
}

impl RecordType {
    /// Accepted record types, in the order an open spec resolves them
    pub const ACCEPTED: [RecordType; 2] = [RecordType::A, RecordType::Aaaa];

    /// Wire name used by the provider API
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Address family whose current IP goes into this record
    pub fn family(&self) -> IpFamily {
        match self {
            RecordType::A => IpFamily::V4,
            RecordType::Aaaa => IpFamily::V6,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::UnknownRecordType(other.to_string())),
        }
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Which record types a [`DomainSpec`] asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSelector {
    /// `example.com`: whichever of A/AAAA exist
    Any,
    /// `AAAA:example.com`
    Only(RecordType),
    /// `MX:example.com`: rejected when resolving
    Unsupported(String),
}

/// A user supplied request: `example.com` or `TYPE:example.com`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainSpec {
    /// Fully qualified domain name
    pub domain: String,
    /// Requested record types
    pub selector: RecordSelector,
}

impl DomainSpec {
    /// Parse a raw spec, splitting on the first `:`
    ///
    /// The type token is not validated here; an unsupported token is kept so
    /// that resolution can report it.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((token, domain)) => {
                let selector = match token.parse::<RecordType>() {
                    Ok(record_type) => RecordSelector::Only(record_type),
                    Err(_) => RecordSelector::Unsupported(token.to_string()),
                };
                Self {
                    domain: domain.to_string(),
                    selector,
                }
            }
            None => Self {
                domain: raw.to_string(),
                selector: RecordSelector::Any,
            },
        }
    }
}

impl fmt::Display for DomainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            RecordSelector::Any => f.write_str(&self.domain),
            RecordSelector::Only(record_type) => write!(f, "{record_type}:{}", self.domain),
            RecordSelector::Unsupported(token) => write!(f, "{token}:{}", self.domain),
        }
    }
}

/// A record as listed by the provider, before filtering by type
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    /// Record id
    pub id: String,
    /// Id of the owning zone, empty if the listing omitted it
    #[serde(default)]
    pub zone_id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type as reported by the provider (`A`, `MX`, `TXT`, ...)
    #[serde(rename = "type")]
    pub record_type: String,
}

/// A concrete provider record under this job's control
///
/// Created once during resolution and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedRecord {
    /// Fully qualified domain name
    pub domain: String,
    /// A or AAAA
    pub record_type: RecordType,
    /// Provider id of the owning zone
    pub zone_id: String,
    /// Provider id of the record
    pub record_id: String,
}

impl fmt::Display for ManagedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.record_type, self.domain)
    }
}
