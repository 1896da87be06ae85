//! usbip-list
//!
//! Lists USB devices exported by USB/IP peers, or attached to this machine.

use anyhow::{Context, Result, bail};
use clap::Parser;
use client::config::ClientConfig;
use client::names::Catalog;
use client::{gadget, local, report};
use common::setup_logging;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "usbip-list")]
#[command(author, version, about = "List exportable or local USB devices")]
#[command(long_about = "
Lists the USB devices a USB/IP peer exports, the USB devices attached to
this machine, or the gadgets this machine exports through usbip-vudc.

EXAMPLES:
    # List devices exported by a peer
    usbip-list --remote 192.168.1.20

    # Query several peers at once, parsable output
    usbip-list -p -r pi-a -r pi-b

    # List local devices
    usbip-list --local

    # List gadgets bound to usbip-vudc
    usbip-list --device

CONFIGURATION:
    The client looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usbip-list/client.toml
    3. /etc/usbip-list/client.toml
    4. Built-in defaults
")]
struct Args {
    /// List the exportable USB devices on HOST (repeatable)
    #[arg(short, long, value_name = "HOST", conflicts_with_all = ["local", "device"])]
    remote: Vec<String>,

    /// List the local USB devices
    #[arg(short, long, conflicts_with = "device")]
    local: bool,

    /// List the local USB gadgets bound to usbip-vudc
    #[arg(short, long)]
    device: bool,

    /// Parsable list format
    #[arg(short, long)]
    parsable: bool,

    /// USB/IP port of the remote hosts (overrides config)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ClientConfig::default();
        let path = ClientConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        ClientConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        ClientConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.client.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;
    debug!("usbip-list v{}", env!("CARGO_PKG_VERSION"));

    if args.remote.is_empty() && !args.local && !args.device {
        bail!("Nothing to list: pass --remote <HOST>, --local or --device");
    }

    let catalog = Catalog::load_or_empty(config.usb_ids_path().as_deref());

    if args.local || args.device {
        let devices = if args.local {
            tokio::task::spawn_blocking(local::list_local_devices)
                .await
                .context("Local enumeration task failed")??
        } else {
            tokio::task::spawn_blocking(gadget::list_gadget_devices)
                .await
                .context("Gadget enumeration task failed")??
        };
        let mut stdout = io::stdout().lock();
        report::write_local_listing(&mut stdout, &devices, &catalog, args.parsable)?;
        stdout.flush()?;
        return Ok(());
    }

    let port = args.port.unwrap_or(config.discovery.port);
    list_remote_hosts(args.remote, port, &config, &catalog, args.parsable).await
}

/// Query every host on the blocking pool, then print in argument order
async fn list_remote_hosts(
    hosts: Vec<String>,
    port: u16,
    config: &ClientConfig,
    catalog: &Catalog,
    parsable: bool,
) -> Result<()> {
    let settings = config.transport_settings();
    let limits = config.session_limits();
    let total = hosts.len();

    let tasks: Vec<_> = hosts
        .into_iter()
        .map(|host| {
            tokio::task::spawn_blocking(move || {
                let result = client::list_exported_devices(&host, port, &settings, &limits);
                (host, result)
            })
        })
        .collect();

    let mut failures = 0;
    for task in tasks {
        let (host, result) = task.await.context("Listing task failed")?;
        match result {
            Ok(devices) => {
                info!("{}: {} exportable devices", host, devices.len());
                let mut stdout = io::stdout().lock();
                report::write_remote_listing(&mut stdout, &host, &devices, catalog, parsable)?;
                stdout.flush()?;
            }
            Err(e) => {
                error!("{:#}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} remote listings failed", failures, total);
    }
    Ok(())
}
