// # cf-ddns-core
//
// Core library for the Cloudflare dynamic DNS updater.
//
// ## Architecture Overview
//
// - **DnsProvider**: Trait for listing and patching records via a provider API
// - **IpSource**: Trait for discovering the host's current public address
// - **resolver**: Maps user domain specs onto concrete provider records
// - **ReconciliationJob**: Validates, resolves, then patches every record on
//   a fixed interval
// - **duration**: Parses human readable intervals such as `"1h 30m"`
//
// ## Design Principles
//
// 1. **Library-First**: The daemon is a thin front-end over this crate
// 2. **Seams as traits**: The job never touches HTTP directly, so it can be
//    driven by test doubles
// 3. **All-or-nothing setup**: Configuration and resolution problems stop the
//    job before the first update; only later update failures are tolerated

pub mod config;
pub mod domain;
pub mod duration;
pub mod error;
pub mod job;
pub mod resolver;
pub mod traits;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource};
pub use job::{JobEvent, JobState, ReconciliationJob, log_events};
pub use config::{Credential, IpSourceConfig, JobConfig, ProviderConfig, RawJobConfig};
pub use domain::{DomainSpec, IpFamily, ManagedRecord, RawRecord, RecordSelector, RecordType};
pub use duration::{format_duration, parse_duration};
pub use error::{Error, Result};
