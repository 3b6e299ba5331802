//! `pinbridge` gateway entry point.
//!
//! ```text
//! main()
//!  └─ AppConfig::load()          -- devices, discovery and transport settings
//!  └─ DiscoveryRegistry          -- shared by every discovered device
//!  └─ DeviceDirectory::build()   -- initializes devices, skips failures
//!  └─ Dispatcher                 -- per-device serialized command batches
//!  └─ pinbridge_network::serve() -- HTTP front-end until Ctrl-C
//! ```

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use pinbridge_core::constants::DEFAULT_HTTP_PORT;
use pinbridge_discovery::{DiscoveryRegistry, DiscoverySource, UdpDiscovery};
use pinbridge_hardware::{
    DeviceContext, DeviceDirectory, Dispatcher, NoopRecorder, UsageRecorder, UsageStatistics,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Network gateway for PIN terminals, card multiplexers and magstripe readers.
#[derive(Parser, Debug)]
#[command(name = "pinbridge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Device configuration file
    #[arg(short, long, default_value = "config/devices.toml")]
    config: PathBuf,

    /// HTTP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    /// Directory relative layout paths are resolved against
    #[arg(long, default_value = "layouts")]
    layout_dir: PathBuf,

    /// Count successful commands per device
    #[arg(long)]
    enable_statistics: bool,

    /// Log at info level
    #[arg(short, long)]
    verbose: bool,

    /// Log at debug level
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    /// Default log filter; `RUST_LOG` overrides it.
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level())),
        )
        .init();

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    info!("pinbridge {} starting", pinbridge_core::VERSION);

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    let discovery = config.discovery.client_config()?;
    let context = DeviceContext {
        magic: discovery.magic.clone(),
        registry: DiscoveryRegistry::shared(DiscoverySource::Udp(UdpDiscovery::new(discovery))),
        transport: config.transport,
        layout_dir: args.layout_dir.clone(),
    };

    let directory = DeviceDirectory::build(&config.devices, &context)
        .await
        .context("no device available, refusing to serve")?;
    if directory.len() < config.devices.len() {
        warn!(
            "{} of {} configured devices unavailable",
            config.devices.len() - directory.len(),
            config.devices.len()
        );
    }

    let statistics = args.enable_statistics.then(|| Arc::new(UsageStatistics::new()));
    let usage: Arc<dyn UsageRecorder> = match &statistics {
        Some(stats) => stats.clone(),
        None => Arc::new(NoopRecorder),
    };
    let dispatcher = Dispatcher::new(Arc::new(directory), usage);

    let listener = pinbridge_network::bind(args.port)
        .await
        .with_context(|| format!("binding port {}", args.port))?;
    pinbridge_network::serve(listener, dispatcher, pinbridge_network::shutdown_signal()).await?;

    if let Some(stats) = statistics {
        for count in stats.snapshot() {
            info!(key = %count.key, command = %count.command, count = count.count, "Usage");
        }
    }

    info!("pinbridge stopped");
    Ok(())
}
