//! Reconciliation job
//!
//! The job owns the updater's whole lifecycle:
//!
//! ```text
//! Created ─► Validating ─► Resolving ─► Running ─► Terminated
//!               │             │           │
//!               ▼             ▼           ▼
//!            exit 64       exit 65     exit 70 (first pass only)
//! ```
//!
//! - **Validating**: domains present, delay parses to at least one second,
//!   credential accepted by the provider. All problems are reported together.
//! - **Resolving**: one pass over the provider account mapping domain specs
//!   to concrete records (see [`crate::resolver`]).
//! - **Running**: an update pass right away, then one pass per delay until the
//!   shutdown future completes. Only the first pass is fatal on failure.
//!
//! ## Update pass
//!
//! 1. Look up the current address once per family the managed records need
//! 2. PATCH every managed record in resolution order
//! 3. Stop at the first failure; the next pass starts from the top

use std::future::Future;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::{JobConfig, RawJobConfig};
use crate::domain::{DomainSpec, IpFamily, ManagedRecord, RawRecord, RecordSelector};
use crate::duration::{format_duration, parse_duration};
use crate::error::{Error, Result};
use crate::resolver;
use crate::traits::{DnsProvider, IpSource};

/// Capacity of the event channel handed out by [`ReconciliationJob::new`]
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Lifecycle state of a [`ReconciliationJob`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Holding raw, unvalidated configuration
    Created,
    /// Checking configuration and credential
    Validating,
    /// Mapping domain specs to provider records
    Resolving,
    /// Update loop
    Running,
    /// Finished, successfully or not
    Terminated,
}

/// Events emitted by the job for external monitoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// The job moved to a new lifecycle state
    StateChanged(JobState),

    /// An update pass completed
    TickSucceeded {
        /// 1-based pass number
        tick: u64,
        /// Number of records patched (0 in dry-run mode)
        updated: usize,
    },

    /// An update pass failed
    TickFailed {
        /// 1-based pass number
        tick: u64,
        error: String,
    },
}

/// Current addresses for one update pass
#[derive(Debug, Default, Clone, Copy)]
struct Addresses {
    v4: Option<IpAddr>,
    v6: Option<IpAddr>,
}

impl Addresses {
    fn get(&self, family: IpFamily) -> Option<IpAddr> {
        match family {
            IpFamily::V4 => self.v4,
            IpFamily::V6 => self.v6,
        }
    }

    fn set(&mut self, family: IpFamily, ip: IpAddr) {
        match family {
            IpFamily::V4 => self.v4 = Some(ip),
            IpFamily::V6 => self.v6 = Some(ip),
        }
    }
}

/// The dynamic DNS reconciliation job
///
/// ## Lifecycle
///
/// 1. Create with [`ReconciliationJob::new()`]
/// 2. Start with [`ReconciliationJob::launch_until()`]
/// 3. The job runs until the shutdown future completes or a fatal error occurs
///
/// The managed record set is written once while resolving and only read
/// afterwards; nothing else shares it, so no locking is involved.
pub struct ReconciliationJob {
    /// DNS provider for listing and patching records
    provider: Box<dyn DnsProvider>,

    /// Public address lookup
    ip_source: Box<dyn IpSource>,

    /// Configuration as given
    raw: RawJobConfig,

    /// Records under management, filled while resolving
    records: Vec<ManagedRecord>,

    state: JobState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<JobEvent>,

    /// Events lost because the receiver was not keeping up
    dropped_events: AtomicU64,
}

impl ReconciliationJob {
    /// Create a new job
    ///
    /// # Returns
    ///
    /// A tuple of (job, event_receiver) where event_receiver yields job events.
    /// The receiver may be dropped if nobody is interested.
    pub fn new(
        provider: Box<dyn DnsProvider>,
        ip_source: Box<dyn IpSource>,
        raw: RawJobConfig,
    ) -> (Self, mpsc::Receiver<JobEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let job = Self {
            provider,
            ip_source,
            raw,
            records: Vec::new(),
            state: JobState::Created,
            event_tx: tx,
            dropped_events: AtomicU64::new(0),
        };

        (job, rx)
    }

    /// Current lifecycle state
    pub fn state(&self) -> JobState {
        self.state
    }

    /// Records under management, in resolution order
    pub fn records(&self) -> &[ManagedRecord] {
        &self.records
    }

    /// Number of events dropped because the event channel was full
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Run the whole lifecycle until `shutdown` completes
    ///
    /// The shutdown future is only observed between update passes: a pass
    /// that has started always runs to completion.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: stopped by the shutdown future
    /// - `Err(Error)`: fatal error; see [`Error::exit_code`]
    pub async fn launch_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let result = self.launch_internal(shutdown).await;
        self.transition(JobState::Terminated);
        result
    }

    /// Run the whole lifecycle until `shutdown_rx` fires or its sender is dropped
    pub async fn launch_with_shutdown(&mut self, shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        self.launch_until(async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn launch_internal<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.transition(JobState::Validating);
        let config = self.validate().await?;

        self.transition(JobState::Resolving);
        self.records = self.resolve(&config.domain_specs).await?;
        debug!(
            "Using domains: {}",
            self.records
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.transition(JobState::Running);
        self.run_loop(&config, shutdown).await
    }

    /// Validate the raw configuration
    ///
    /// Every check runs, failures are logged as they are found and returned
    /// together as [`Error::Validation`].
    async fn validate(&self) -> Result<JobConfig> {
        let mut problems = Vec::new();

        if self.raw.domains.is_empty() {
            problems.push(Error::usage("Please provide at least one domain."));
        }

        let delay_secs = match parse_duration(&self.raw.delay) {
            Ok(0) => {
                problems.push(Error::InvalidDuration(self.raw.delay.clone()));
                None
            }
            Ok(secs) => Some(secs),
            Err(e) => {
                problems.push(e);
                None
            }
        };

        if self.raw.credential.is_empty() {
            problems.push(Error::CredentialInvalid("no token provided".to_string()));
        } else {
            debug!("Validating bearer token.");
            match self.provider.verify_credential().await {
                Ok(()) => info!("Successfully validated the bearer token."),
                Err(e) => problems.push(e),
            }
        }

        for problem in &problems {
            error!("{}", problem);
        }

        match delay_secs {
            Some(delay_secs) if problems.is_empty() => Ok(JobConfig {
                delay_secs,
                domain_specs: self.raw.domains.iter().map(|d| DomainSpec::parse(d)).collect(),
                dry_run: self.raw.dry_run,
            }),
            _ => Err(Error::Validation(problems)),
        }
    }

    /// Resolve domain specs against the provider account
    async fn resolve(&self, specs: &[DomainSpec]) -> Result<Vec<ManagedRecord>> {
        debug!("Parsing domains.");

        // Reject unsupported types before listing the whole account
        if let Some(token) = specs.iter().find_map(|spec| match &spec.selector {
            RecordSelector::Unsupported(token) => Some(token.clone()),
            _ => None,
        }) {
            let err = Error::UnknownRecordType(token);
            error!("{}", err);
            return Err(err);
        }

        let records = self.fetch_all_records().await.inspect_err(|e| {
            error!("Failed to list records from {}: {}", self.provider.provider_name(), e);
        })?;

        resolver::resolve(specs, records).inspect_err(|e| error!("{}", e))
    }

    async fn fetch_all_records(&self) -> Result<Vec<RawRecord>> {
        let mut records = Vec::new();

        for zone_id in self.provider.list_zones().await? {
            let zone_records = self.provider.list_records(&zone_id).await?;
            debug!("Zone {} has {} record(s)", zone_id, zone_records.len());
            records.extend(zone_records);
        }

        Ok(records)
    }

    async fn run_loop<F>(&self, config: &JobConfig, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let delay = config.delay();
        let every = format_duration(config.delay_secs);
        info!("Starting app. Records will be updated every {}.", every);

        let mut tick: u64 = 1;
        match self.update_records(config.dry_run).await {
            Ok(updated) => self.emit_event(JobEvent::TickSucceeded { tick, updated }),
            Err(e) => {
                let err = Error::FirstTick(Box::new(e));
                error!("{}, aborting.", err);
                self.emit_event(JobEvent::TickFailed {
                    tick,
                    error: err.to_string(),
                });
                return Err(err);
            }
        }

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }

            tick += 1;
            match self.update_records(config.dry_run).await {
                Ok(updated) => self.emit_event(JobEvent::TickSucceeded { tick, updated }),
                Err(e) => {
                    let err = Error::Tick(Box::new(e));
                    error!("{}. Retrying in {}.", err, every);
                    self.emit_event(JobEvent::TickFailed {
                        tick,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    /// Perform one update pass
    ///
    /// # Returns
    ///
    /// The number of records patched
    async fn update_records(&self, dry_run: bool) -> Result<usize> {
        info!("Starting record update.");

        let addresses = self.current_addresses().await?;
        let mut updated = 0;

        for record in &self.records {
            let family = record.record_type.family();
            let ip = addresses
                .get(family)
                .ok_or_else(|| Error::ip_lookup(format!("no {} address for {}", family, record)))?;
            let content = ip.to_string();

            if dry_run {
                info!(
                    "[DRY-RUN] Would set {} (zone {}, record {}) to {}",
                    record, record.zone_id, record.record_id, content
                );
                continue;
            }

            debug!("Updating record for {}.", record);
            self.provider
                .patch_record_content(&record.zone_id, &record.record_id, &content)
                .await
                .inspect_err(|e| error!("Failed to update {} -> {}: {}", record, content, e))?;
            updated += 1;
        }

        info!("{}", pass_summary(dry_run, self.records.len(), updated));
        Ok(updated)
    }

    /// Look up the current address once per family the records need
    async fn current_addresses(&self) -> Result<Addresses> {
        let mut addresses = Addresses::default();

        for record in &self.records {
            let family = record.record_type.family();
            if addresses.get(family).is_some() {
                continue;
            }

            let ip = self.ip_source.current(family).await?;
            debug!("Current {} address: {}", family, ip);
            addresses.set(family, ip);
        }

        Ok(addresses)
    }

    fn transition(&mut self, state: JobState) {
        debug!("Job state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.emit_event(JobEvent::StateChanged(state));
    }

    /// Emit a job event
    fn emit_event(&self, event: JobEvent) {
        // A dropped receiver just means nobody is listening
        if let Err(mpsc::error::TrySendError::Full(event)) = self.event_tx.try_send(event) {
            let dropped = self.dropped_events.fetch_add(1, Ordering::Relaxed);
            if dropped == 0 {
                warn!("Event channel full, dropping events until it is read.");
            } else {
                debug!("Event channel full, dropped {:?}", event);
            }
        }
    }
}

/// Log line closing a successful update pass
fn pass_summary(dry_run: bool, records: usize, updated: usize) -> String {
    if dry_run {
        format!("Dry run finished, {} record(s) left unchanged.", records)
    } else {
        format!("Successfully updated {} record(s).", updated)
    }
}

/// Drain a job's event channel, logging each event at debug level
///
/// Spawn this when the events are not otherwise consumed, so the channel
/// never fills up.
pub async fn log_events(mut events: mpsc::Receiver<JobEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            JobEvent::StateChanged(state) => debug!("Job event: state {:?}", state),
            JobEvent::TickSucceeded { tick, updated } => {
                debug!("Job event: pass {} succeeded, {} record(s) patched", tick, updated)
            }
            JobEvent::TickFailed { tick, error } => {
                debug!("Job event: pass {} failed: {}", tick, error)
            }
        }
    }
}
