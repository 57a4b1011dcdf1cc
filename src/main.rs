//! KeyMan key service.
//!
//! Serves the key routes on `--bind` and keeps the store mirrored in
//! `--key-file`. With a `[gate]` section in the config file, the same access
//! gate the gatekeeper uses runs in front of every route.

use clap::Parser;
use std::path::PathBuf;

use keyman::config::{ensure_valid, load_or_default, KeyManConfig};
use keyman::lifecycle::{startup, Shutdown};
use keyman::observability::{logging, metrics};
use keyman::KeyServer;

#[derive(Parser)]
#[command(name = "keyman")]
#[command(about = "Key-value service with a JSON snapshot file", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Snapshot file holding the keys.
    #[arg(long)]
    key_file: Option<PathBuf>,

    /// Listen address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: KeyManConfig = load_or_default(cli.config.as_deref())?;
    if let Some(key_file) = cli.key_file {
        config.store.key_file = key_file;
    }
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    ensure_valid(&config)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "keyman starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let (store, snapshot) = startup::open_store(&config.store)?;
    tracing::info!(
        key_file = %snapshot.path().display(),
        keys = store.len(),
        "Key store loaded"
    );

    let gate = match &config.gate {
        Some(gate) => Some(startup::build_gate(gate, &config.trusted_ranges, &shutdown).await?),
        None => None,
    };

    let listener = startup::bind(&config.listener.bind_address).await?;
    let server = KeyServer::new(config, store, Some(snapshot), gate);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
