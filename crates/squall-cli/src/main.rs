mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use cli::Cli;
use squall_bridge::{BridgeEvent, TelemetryBridge};
use squall_config::CollectionCatalog;
use squall_domain::{DeviceInfo, DeviceTarget, SshCredentials, VendorTag};
use squall_driver::DriverRegistry;
use squall_engine::{run_preflight, EngineConfig, PollEngine};
use squall_parser::TemplateResolver;
use squall_store::DeviceStateStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let vendor = VendorTag::new(&cli.vendor);
    let catalog = CollectionCatalog::open(&cli.collections_dir);
    let registry = Arc::new(DriverRegistry::with_builtins());
    let resolver = TemplateResolver::new(template_dirs(&cli));

    // ── Preflight ─────────────────────────────────────────────────────────────
    let report = run_preflight(&vendor, &catalog, &resolver, &registry);
    for warning in &report.warnings {
        warn!("preflight: {}", warning);
    }
    for error in &report.errors {
        tracing::error!("preflight: {}", error);
    }
    if cli.preflight_only {
        if report.ok {
            info!("preflight passed");
            return Ok(());
        }
        std::process::exit(1);
    }
    if !report.ok {
        warn!("preflight reported errors — template parsers may fall back to regex");
    }

    // ── Credentials ───────────────────────────────────────────────────────────
    let credentials = build_credentials(&cli)?;

    // ── Wire up store, bridge, engine ─────────────────────────────────────────
    let target = DeviceTarget {
        hostname: cli.host.clone(),
        port: cli.port,
        display_name: cli.name.clone().unwrap_or_else(|| cli.host.clone()),
        vendor: vendor.clone(),
        tags: Vec::new(),
    };

    let store = Arc::new(DeviceStateStore::new(DeviceInfo {
        hostname: target.hostname.clone(),
        ip: target.hostname.clone(),
        port: target.port,
        vendor: vendor.to_string(),
        username: cli.user.clone(),
        display_name: target.display_name.clone(),
        tags: Vec::new(),
        detected_hostname: None,
        prompt: None,
    }));

    let bridge = TelemetryBridge::new(store.clone());
    let mut events = bridge.subscribe();

    let mut config = EngineConfig::new(target, credentials);
    config.collections = (!cli.collections.is_empty()).then(|| cli.collections.clone());
    config.collections_dir = cli.collections_dir.clone();
    config.template_dirs = template_dirs(&cli);
    config.legacy_mode = cli.legacy_mode();

    let handle = PollEngine::new(config, store, registry).start();
    info!("telemetry started for {} — Ctrl-C to stop", cli.host);

    // Surface bridge events on the console until interrupted. A real
    // dashboard would consume the same subscription.
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, stopping");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) => log_event(&event),
                    Err(_) => break,
                }
            }
        }
    }

    handle.stop().await?;
    Ok(())
}

fn template_dirs(cli: &Cli) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(custom) = &cli.templates {
        dirs.push(custom.clone());
    }
    // Bundled local overrides ship next to the catalog.
    dirs.push(PathBuf::from("templates/textfsm"));
    dirs.push(PathBuf::from("templates/ttp"));
    dirs
}

fn build_credentials(cli: &Cli) -> Result<SshCredentials> {
    if let Some(key) = &cli.key {
        if !key.exists() {
            bail!("key file not found: {}", key.display());
        }
        return Ok(SshCredentials::key_file(
            &cli.user,
            key.display().to_string(),
        ));
    }

    let password = match &cli.password {
        Some(password) => password.clone(),
        None => rpassword::prompt_password(format!("Password for {}@{}: ", cli.user, cli.host))?,
    };
    Ok(SshCredentials::password(&cli.user, password))
}

fn log_event(event: &BridgeEvent) {
    match event {
        BridgeEvent::StateChanged { collection, json } => {
            info!(collection = %collection, bytes = json.len(), "stateChanged");
        }
        BridgeEvent::CycleComplete => info!("cycleComplete"),
        BridgeEvent::DeviceInfoChanged { json } => {
            let hostname = serde_json::from_str::<serde_json::Value>(json)
                .ok()
                .and_then(|v| {
                    v.get("detected_hostname")
                        .and_then(|h| h.as_str())
                        .map(str::to_string)
                });
            info!(detected_hostname = hostname.as_deref().unwrap_or("-"), "deviceInfoChanged");
        }
        BridgeEvent::ConnectionStatus { status } => info!(status = %status, "connectionStatus"),
    }
}
