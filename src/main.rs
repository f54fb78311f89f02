//! Virtual host reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌────────────────────────────────────────────────────┐
//!                         │                   VHOST PROXY                      │
//!                         │                                                    │
//!     Client Request      │  ┌─────────┐    ┌────────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│  routing   │───▶│  security  │   │
//!                         │  │ server  │    │ dispatcher │    │   policy   │   │
//!                         │  └─────────┘    └─────┬──────┘    └─────┬──────┘   │
//!                         │                       │ no vhost        │          │
//!                         │                       ▼                 ▼          │
//!                         │               ┌──────────────┐   ┌────────────┐    │
//!                         │               │ default /    │   │   proxy    │    │
//!                         │               │ host listing │   │  rewrite   │    │
//!                         │               └──────────────┘   └─────┬──────┘    │
//!                         │                                        ▼           │
//!     Client Response     │                                 ┌────────────┐     │
//!     ◀───────────────────┼─────────────────────────────────│ forwarder  │◀────┼──── Origin
//!                         │                                 └────────────┘     │
//!                         │  config (watch/reload) · observability · lifecycle │
//!                         └────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use vhost_proxy::config::{load_config, watcher::ConfigWatcher, ProxyConfig};
use vhost_proxy::http::response::{PRODUCT_NAME, PRODUCT_VERSION};
use vhost_proxy::lifecycle::{shutdown::wait_for_signal, Shutdown};
use vhost_proxy::observability::{logging, metrics};
use vhost_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "vhost-proxy")]
#[command(about = "Host-based HTTP reverse proxy", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Validate the configuration, print the vhost table and exit.
    #[arg(long)]
    check: bool,

    /// Reload the vhost table when the configuration file changes.
    #[arg(short, long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    if cli.check {
        print_vhosts(&config);
        return Ok(());
    }

    logging::init(&config.observability)?;
    tracing::info!("{PRODUCT_NAME} v{PRODUCT_VERSION} starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (updates_tx, updates_rx) = tokio::sync::mpsc::unbounded_channel();
    let _watcher = if cli.watch {
        let (watcher, mut file_updates) = ConfigWatcher::new(&cli.config);
        let guard = watcher.run()?;
        tokio::spawn(async move {
            while let Some(config) = file_updates.recv().await {
                if updates_tx.send(config).is_err() {
                    break;
                }
            }
        });
        Some(guard)
    } else {
        drop(updates_tx);
        None
    };

    let shutdown = Shutdown::new();
    let stopped = shutdown.subscribe();
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, updates_rx, stopped).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn print_vhosts(config: &ProxyConfig) {
    println!("{PRODUCT_NAME} v{PRODUCT_VERSION}: configuration OK");
    println!("listen {}", config.listener.bind_address);
    for (name, vhost) in &config.vhosts {
        let target = vhost.host.as_deref().unwrap_or("<request host>");
        let port = vhost
            .effective_port()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        let protocol = vhost.protocol.map(|p| p.as_str()).unwrap_or("<request scheme>");
        println!(
            "  {name:<30} -> {protocol}://{target}{port}  access={:?} timeout={}ms",
            vhost.access,
            vhost.effective_timeout_ms()
        );
    }
}
