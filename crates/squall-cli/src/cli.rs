use std::path::PathBuf;

use clap::Parser;

/// Real-time SSH telemetry for network devices.
#[derive(Debug, Parser)]
#[command(name = "squall", version)]
pub struct Cli {
    /// Device hostname or IP.
    #[arg(long)]
    pub host: String,

    /// SSH port.
    #[arg(long, default_value_t = 22)]
    pub port: u16,

    /// Device vendor/platform tag.
    #[arg(long, value_parser = ["cisco_ios", "cisco_ios_xe", "cisco_nxos", "arista_eos", "juniper_junos"])]
    pub vendor: String,

    /// SSH username.
    #[arg(long)]
    pub user: String,

    /// SSH password (prompted if neither this nor --key is given).
    #[arg(long)]
    pub password: Option<String>,

    /// Path to an SSH private key.
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Display name for the device.
    #[arg(long)]
    pub name: Option<String>,

    /// Custom template override directory (highest resolution priority).
    #[arg(long)]
    pub templates: Option<PathBuf>,

    /// Collection catalog directory.
    #[arg(long, default_value = "collections")]
    pub collections_dir: PathBuf,

    /// Poll only these collections (repeatable). Default: everything the
    /// catalog offers for the vendor.
    #[arg(long = "collection")]
    pub collections: Vec<String>,

    /// Enable legacy cipher/KEX support for old equipment.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    pub legacy: bool,

    /// Disable legacy cipher support.
    #[arg(long = "no-legacy", conflicts_with = "legacy")]
    pub no_legacy: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,

    /// Run preflight checks and exit (no connection).
    #[arg(long)]
    pub preflight_only: bool,
}

impl Cli {
    pub fn legacy_mode(&self) -> bool {
        !self.no_legacy && self.legacy
    }
}
