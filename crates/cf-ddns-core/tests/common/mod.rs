//! Test doubles and common utilities for job contract tests
//!
//! The doubles record every call so tests can assert on exactly what the job
//! asked the outside world to do.

#![allow(dead_code)]

use cf_ddns_core::error::{Error, Result};
use cf_ddns_core::{
    Credential, DnsProvider, IpFamily, IpSource, JobEvent, RawJobConfig, RawRecord,
    ReconciliationJob,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// One recorded PATCH request
#[derive(Debug, Clone)]
pub struct PatchCall {
    pub zone_id: String,
    pub record_id: String,
    pub content: String,
    pub at: Instant,
}

#[derive(Default)]
struct ProviderState {
    zones: Vec<(String, Vec<RawRecord>)>,
    token_rejection: Option<String>,
    failing_patches: HashSet<usize>,
    patches: Vec<PatchCall>,
    verify_calls: usize,
    list_zone_calls: usize,
    list_record_calls: usize,
}

/// A mock DnsProvider backed by an in-memory account
///
/// Clones share state, so a test can keep one handle and give the job another.
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to a zone, creating the zone on first use
    pub fn with_record(self, zone_id: &str, name: &str, record_type: &str, id: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let record = RawRecord {
                id: id.to_string(),
                zone_id: zone_id.to_string(),
                name: name.to_string(),
                record_type: record_type.to_string(),
            };
            match state.zones.iter_mut().find(|(id, _)| id == zone_id) {
                Some((_, records)) => records.push(record),
                None => state.zones.push((zone_id.to_string(), vec![record])),
            }
        }
        self
    }

    /// Make token verification fail with the given provider message
    pub fn rejecting_token(self, message: &str) -> Self {
        self.state.lock().unwrap().token_rejection = Some(message.to_string());
        self
    }

    /// Make the n-th PATCH call (1-based, counted across passes) fail with a 500
    pub fn failing_patch(self, call: usize) -> Self {
        self.state.lock().unwrap().failing_patches.insert(call);
        self
    }

    pub fn patches(&self) -> Vec<PatchCall> {
        self.state.lock().unwrap().patches.clone()
    }

    pub fn patched_record_ids(&self) -> Vec<String> {
        self.patches().into_iter().map(|p| p.record_id).collect()
    }

    pub fn verify_calls(&self) -> usize {
        self.state.lock().unwrap().verify_calls
    }

    pub fn list_zone_calls(&self) -> usize {
        self.state.lock().unwrap().list_zone_calls
    }

    pub fn list_record_calls(&self) -> usize {
        self.state.lock().unwrap().list_record_calls
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn verify_credential(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.verify_calls += 1;
        match &state.token_rejection {
            Some(message) => Err(Error::CredentialInvalid(message.clone())),
            None => Ok(()),
        }
    }

    async fn list_zones(&self) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.list_zone_calls += 1;
        Ok(state.zones.iter().map(|(id, _)| id.clone()).collect())
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<RawRecord>> {
        let mut state = self.state.lock().unwrap();
        state.list_record_calls += 1;
        Ok(state
            .zones
            .iter()
            .find(|(id, _)| id == zone_id)
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }

    async fn patch_record_content(&self, zone_id: &str, record_id: &str, content: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.patches.push(PatchCall {
            zone_id: zone_id.to_string(),
            record_id: record_id.to_string(),
            content: content.to_string(),
            at: Instant::now(),
        });

        if state.failing_patches.contains(&state.patches.len()) {
            return Err(Error::transport("500 Internal Server Error"));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[derive(Default)]
struct IpState {
    v4_calls: usize,
    v6_calls: usize,
    failing: bool,
}

/// An IpSource returning fixed addresses and counting lookups per family
#[derive(Clone, Default)]
pub struct CountingIpSource {
    state: Arc<Mutex<IpState>>,
}

pub const CURRENT_V4: [u8; 4] = [203, 0, 113, 7];
pub const CURRENT_V6: &str = "2001:db8::7";

impl CountingIpSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let source = Self::default();
        source.state.lock().unwrap().failing = true;
        source
    }

    pub fn calls(&self, family: IpFamily) -> usize {
        let state = self.state.lock().unwrap();
        match family {
            IpFamily::V4 => state.v4_calls,
            IpFamily::V6 => state.v6_calls,
        }
    }
}

#[async_trait::async_trait]
impl IpSource for CountingIpSource {
    async fn current(&self, family: IpFamily) -> Result<IpAddr> {
        let mut state = self.state.lock().unwrap();
        match family {
            IpFamily::V4 => state.v4_calls += 1,
            IpFamily::V6 => state.v6_calls += 1,
        }

        if state.failing {
            return Err(Error::ip_lookup("HTTP error: 503 Service Unavailable"));
        }

        Ok(match family {
            IpFamily::V4 => IpAddr::from(CURRENT_V4),
            IpFamily::V6 => CURRENT_V6.parse().unwrap(),
        })
    }
}

/// The account most tests run against
///
/// - zone1: a.com A, a.com AAAA
/// - zone2: b.com A, b.com TXT
pub fn standard_provider() -> MockDnsProvider {
    MockDnsProvider::new()
        .with_record("zone1", "a.com", "A", "a4")
        .with_record("zone1", "a.com", "AAAA", "a6")
        .with_record("zone2", "b.com", "A", "b4")
        .with_record("zone2", "b.com", "TXT", "btxt")
}

/// Helper to create a minimal valid RawJobConfig for testing
pub fn raw_config(domains: &[&str]) -> RawJobConfig {
    RawJobConfig::new(
        Credential::new("test-token"),
        domains.iter().map(|d| d.to_string()).collect(),
    )
    .with_delay("1m")
}

/// A job running on its own task
pub struct RunningJob {
    pub handle: JoinHandle<(ReconciliationJob, Result<()>)>,
    pub events: mpsc::Receiver<JobEvent>,
    pub shutdown: oneshot::Sender<()>,
}

/// Build a job from the doubles and start it on a separate task
pub fn spawn_job(
    provider: &MockDnsProvider,
    ip_source: &CountingIpSource,
    raw: RawJobConfig,
) -> RunningJob {
    let (mut job, events) =
        ReconciliationJob::new(Box::new(provider.clone()), Box::new(ip_source.clone()), raw);
    let (shutdown, shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let result = job.launch_with_shutdown(shutdown_rx).await;
        (job, result)
    });

    RunningJob {
        handle,
        events,
        shutdown,
    }
}

/// Run a job to completion without ever signalling shutdown
///
/// Only useful for jobs expected to fail before or during the first pass.
pub async fn run_to_failure(
    provider: &MockDnsProvider,
    ip_source: &CountingIpSource,
    raw: RawJobConfig,
) -> (ReconciliationJob, Result<()>) {
    let RunningJob {
        handle, shutdown, ..
    } = spawn_job(provider, ip_source, raw);

    // A job that unexpectedly keeps running would loop forever; under the
    // paused test clock this gives up after one virtual day.
    let outcome = tokio::time::timeout(Duration::from_secs(86_400), handle)
        .await
        .expect("job stops on its own")
        .expect("job task completes");
    drop(shutdown);
    outcome
}

/// Collect events until the given pass has finished, returning all of them
pub async fn events_through_tick(events: &mut mpsc::Receiver<JobEvent>, tick: u64) -> Vec<JobEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        let done = matches!(
            event,
            JobEvent::TickSucceeded { tick: t, .. } | JobEvent::TickFailed { tick: t, .. } if t == tick
        );
        seen.push(event);
        if done {
            break;
        }
    }
    seen
}
