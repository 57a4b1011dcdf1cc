//! Gatekeeper: lets only the locked client through to the key service.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use keyman::config::{ensure_valid, load_or_default, GatekeeperConfig, TlsConfig};
use keyman::lifecycle::{startup, Shutdown};
use keyman::observability::{logging, metrics};
use keyman::proxy::{GatekeeperServer, Upstream};

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "IP-locked reverse proxy in front of the key service", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service that authorized requests are forwarded to.
    #[arg(long)]
    forward: Option<String>,

    /// The only client IP allowed through.
    #[arg(long)]
    lock: Option<String>,

    /// Listen address.
    #[arg(long)]
    bind: Option<String>,

    /// Serve plain HTTP instead of TLS.
    #[arg(long)]
    debug: bool,

    /// TLS certificate (PEM).
    #[arg(long)]
    cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[arg(long)]
    key: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut GatekeeperConfig) {
        if let Some(forward) = self.forward {
            config.upstream.url = forward;
        }
        if let Some(lock) = self.lock {
            config.gate.locked_ip = lock;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }

        if self.debug {
            config.listener.tls = None;
            return;
        }
        let tls = config.listener.tls.get_or_insert_with(TlsConfig::default);
        if let Some(cert) = self.cert {
            tls.cert_path = cert;
        }
        if let Some(key) = self.key {
            tls.key_path = key;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config: GatekeeperConfig = load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    ensure_valid(&config)?;

    logging::init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        upstream = %config.upstream.url,
        locked_ip = %config.gate.locked_ip,
        tls = config.listener.tls.is_some(),
        "gatekeeper starting"
    );

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

    let gate = startup::build_gate(&config.gate, &config.trusted_ranges, &shutdown).await?;
    let upstream = Upstream::new(
        &config.upstream.url,
        Duration::from_secs(config.timeouts.connect_secs),
    )?;

    let listener = startup::bind(&config.listener.bind_address).await?;
    let server = GatekeeperServer::new(config, upstream, gate);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
