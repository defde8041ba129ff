use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use squall_config::CollectionCatalog;
use squall_domain::{ConnectionStatus, DeviceTarget, Payload, PayloadBody, SshCredentials};
use squall_driver::{DriverRegistry, VendorDriver};
use squall_parser::{ParseTrace, ParseTraceStore, ParserChain, TemplateResolver};
use squall_ssh::{SshClient, SshClientConfig, SshError};
use squall_store::DeviceStateStore;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::schedule::PollSchedule;

/// Poll engine configuration for one device.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub target: DeviceTarget,
    pub credentials: SshCredentials,
    /// Explicit collection selection; `None` polls everything the catalog
    /// offers for this vendor.
    pub collections: Option<Vec<String>>,
    pub collections_dir: PathBuf,
    /// Template search directories, highest priority first. The community
    /// directory is appended from the environment by the resolver.
    pub template_dirs: Vec<PathBuf>,
    pub legacy_mode: bool,
    /// Coarse scheduler tick.
    pub tick_interval: Duration,
    /// How long `stop()` waits for the worker to wind down.
    pub stop_grace: Duration,
}

impl EngineConfig {
    pub fn new(target: DeviceTarget, credentials: SshCredentials) -> Self {
        Self {
            target,
            credentials,
            collections: None,
            collections_dir: PathBuf::from("collections"),
            template_dirs: Vec::new(),
            legacy_mode: true,
            tick_interval: Duration::from_secs(5),
            stop_grace: Duration::from_secs(5),
        }
    }
}

/// Handle to a running engine worker.
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    join: Option<tokio::task::JoinHandle<()>>,
    traces: Arc<Mutex<ParseTraceStore>>,
    stop_grace: Duration,
}

impl EngineHandle {
    /// Signal the worker to stop and wait up to the grace period. The
    /// worker notices at its next sleep boundary (≤ 500 ms).
    pub async fn stop(mut self) -> Result<(), EngineError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            tokio::time::timeout(self.stop_grace, join)
                .await
                .map_err(|_| EngineError::StopTimeout)?
                .ok();
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Recent parse traces for diagnostics.
    pub fn trace_store(&self) -> Arc<Mutex<ParseTraceStore>> {
        self.traces.clone()
    }
}

/// One device's poll engine. `start()` spawns the blocking worker that owns
/// the SSH session for its whole lifetime.
pub struct PollEngine {
    config: EngineConfig,
    store: Arc<DeviceStateStore>,
    registry: Arc<DriverRegistry>,
}

impl PollEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<DeviceStateStore>,
        registry: Arc<DriverRegistry>,
    ) -> Self {
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn start(self) -> EngineHandle {
        let running = Arc::new(AtomicBool::new(true));
        let traces = Arc::new(Mutex::new(ParseTraceStore::default()));
        let stop_grace = self.config.stop_grace;

        let worker_running = running.clone();
        let worker_traces = traces.clone();
        // The ssh2 session is synchronous and single-owner; the whole
        // worker runs as one blocking task.
        let join = tokio::task::spawn_blocking(move || {
            Worker::new(self.config, self.store, self.registry, worker_running, worker_traces)
                .run();
        });

        EngineHandle {
            running,
            join: Some(join),
            traces,
            stop_grace,
        }
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

struct Worker {
    config: EngineConfig,
    store: Arc<DeviceStateStore>,
    driver: Arc<dyn VendorDriver>,
    catalog: CollectionCatalog,
    chain: ParserChain,
    client: SshClient,
    schedule: PollSchedule,
    collections: Vec<String>,
    running: Arc<AtomicBool>,
    traces: Arc<Mutex<ParseTraceStore>>,
}

impl Worker {
    fn new(
        config: EngineConfig,
        store: Arc<DeviceStateStore>,
        registry: Arc<DriverRegistry>,
        running: Arc<AtomicBool>,
        traces: Arc<Mutex<ParseTraceStore>>,
    ) -> Self {
        let driver = registry.driver_for(&config.target.vendor);
        let catalog = CollectionCatalog::open(&config.collections_dir);
        let resolver = TemplateResolver::new(config.template_dirs.clone());
        let chain = ParserChain::new(resolver);

        let caps = chain.capabilities();
        info!(
            textfsm = caps.textfsm,
            ttp = caps.ttp,
            community = caps.community_templates.as_deref().unwrap_or("none"),
            "parser chain ready"
        );

        // Requested collections intersected with YAML availability; missing
        // requests are logged once, not fatal.
        let available = catalog.list_collections(&config.target.vendor);
        let collections = match &config.collections {
            Some(requested) => {
                let missing: Vec<&String> =
                    requested.iter().filter(|c| !available.contains(c)).collect();
                if !missing.is_empty() {
                    warn!(
                        vendor = %config.target.vendor,
                        ?missing,
                        "requested collections not available"
                    );
                }
                requested
                    .iter()
                    .filter(|c| available.contains(c))
                    .cloned()
                    .collect()
            }
            None => available,
        };

        if collections.is_empty() {
            warn!(
                vendor = %config.target.vendor,
                dir = %config.collections_dir.display(),
                "no collections found for vendor"
            );
        }
        info!(vendor = %config.target.vendor, ?collections, "poll engine starting");

        let mut ssh = SshClientConfig::new(config.target.hostname.clone(), config.target.port);
        ssh.legacy_mode = config.legacy_mode;
        let client = SshClient::new(ssh);

        Self {
            config,
            store,
            driver,
            catalog,
            chain,
            client,
            schedule: PollSchedule::new(),
            collections,
            running,
            traces,
        }
    }

    fn run(mut self) {
        if let Err(e) = self.connect() {
            let msg = e.to_string();
            warn!(error = %msg, "poll engine fatal error");
            self.store
                .set_connection_status(ConnectionStatus::Error(msg));
            self.store
                .set_connection_status(ConnectionStatus::Disconnected);
            return;
        }
        self.store.set_connection_status(ConnectionStatus::Connected);

        let mut cycle: u64 = 0;
        while self.running.load(Ordering::SeqCst) {
            cycle += 1;
            if let Err(e) = self.poll_cycle(cycle) {
                let msg = e.to_string();
                warn!(error = %msg, "transport lost, ending engine");
                self.store
                    .set_connection_status(ConnectionStatus::Error(msg));
                break;
            }
            self.store.cycle_complete();
            self.sleep_tick();
        }

        self.client.disconnect();
        self.store
            .set_connection_status(ConnectionStatus::Disconnected);
    }

    /// Sleep one tick in small increments so stop() stays responsive.
    fn sleep_tick(&self) {
        let step = Duration::from_millis(500);
        let mut remaining = self.config.tick_interval;
        while !remaining.is_zero() && self.running.load(Ordering::SeqCst) {
            let slice = remaining.min(step);
            std::thread::sleep(slice);
            remaining -= slice;
        }
    }

    // ── Connection ────────────────────────────────────────────────────────────

    fn connect(&mut self) -> Result<(), SshError> {
        self.client.connect(&self.config.credentials)?;

        let prompt = self
            .client
            .find_prompt(5, Duration::from_secs(5))?;
        self.client.set_expect_prompt(prompt.clone());
        info!(prompt = %prompt, "prompt detected");

        self.store
            .set_detected_identity(self.client.hostname(), prompt);

        // Pagination: the driver knows its platform's command; an empty
        // string means shotgun.
        let pager_cmd = self.driver.pagination_command();
        if !pager_cmd.is_empty() {
            debug!(command = pager_cmd, "disabling pagination");
            self.client.execute(pager_cmd)?;
            // Some platforms redraw the prompt after the terminal change.
            let prompt = self.client.find_prompt(2, Duration::from_secs(3))?;
            self.client.set_expect_prompt(prompt);
        } else {
            self.client.disable_pagination_shotgun()?;
        }

        Ok(())
    }

    // ── Poll cycle ────────────────────────────────────────────────────────────

    /// Run one scheduler pass. Returns `Err` only for transport loss;
    /// parser and post-process failures are isolated per collection.
    fn poll_cycle(&mut self, cycle: u64) -> Result<(), SshError> {
        let now = Instant::now();
        let vendor = self.config.target.vendor.clone();
        let first_cycle = cycle == 1;

        for collection in self.collections.clone() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            let Some(spec) = self.catalog.spec(&collection, &vendor) else {
                continue;
            };
            let interval = spec
                .interval
                .unwrap_or_else(|| squall_config::default_interval(&collection));
            if !self.schedule.is_due(&collection, interval, now, first_cycle) {
                continue;
            }

            let mut trace = ParseTrace::new(&collection, vendor.as_str());

            debug!(collection = %collection, command = %spec.command, "polling");
            let raw = self.client.execute(&spec.command)?;
            trace.raw_received(&raw, &spec.command);

            if raw.trim().is_empty() {
                warn!(collection = %collection, "empty command output");
                trace.delivered("none", "", vec![], 0, Some("empty command output".into()));
                self.finish_trace(trace);
                self.store.record_error(&collection, "empty command output");
                continue;
            }

            let schema = self.catalog.schema(&collection);
            let (rows, provenance) = self.chain.parse(&raw, &spec, schema.as_ref(), &mut trace);

            if rows.is_empty() || provenance.parsed_by == "none" {
                let error = provenance
                    .error
                    .unwrap_or_else(|| "no rows".to_string());
                warn!(collection = %collection, error = %error, "parse failed");
                trace.delivered("none", &provenance.template, vec![], 0, Some(error.clone()));
                self.finish_trace(trace);
                self.store.record_error(&collection, &error);
                continue;
            }

            let row_count = rows.len();
            let body = self.driver.shape_output(&collection, rows);
            let body = self
                .driver
                .post_process(&collection, body, self.store.as_ref());

            let final_fields = payload_fields(&body);
            trace.post_processed(
                &format!("{}.post_process", self.driver.vendor()),
                final_fields.clone(),
            );
            trace.delivered(
                &provenance.parsed_by,
                &provenance.template,
                final_fields,
                row_count,
                None,
            );
            self.finish_trace(trace);

            self.store
                .update(&collection, Payload::new(body, provenance));
            self.schedule.mark_polled(&collection, now);
        }

        Ok(())
    }

    fn finish_trace(&self, trace: ParseTrace) {
        let record = trace.emit();
        if let Ok(mut traces) = self.traces.lock() {
            traces.store(record);
        }
    }
}

fn payload_fields(body: &PayloadBody) -> Vec<String> {
    match body {
        PayloadBody::Flat(row) => row.keys().cloned().collect(),
        PayloadBody::Table { key, .. } => vec![key.clone()],
    }
}
