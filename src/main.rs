use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ai_relay::config::loader;
use ai_relay::http::{tls::load_tls_config, HttpServer, Services};
use ai_relay::lifecycle::{wait_for_signal, Shutdown};
use ai_relay::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ai-relay")]
#[command(about = "Authenticated relay to the inference API", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = loader::load(cli.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ai-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        relay_path = %config.relay.path,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let services = Services::from_config(&config)?;
    let tls = config.listener.tls.clone();
    let bind_address: SocketAddr = config.listener.bind_address.parse()?;
    let server = HttpServer::new(config, services);

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    match tls {
        Some(tls) => {
            let rustls = load_tls_config(&tls).await?;
            server.run_tls(bind_address, rustls, receiver).await?;
        }
        None => {
            let listener = TcpListener::bind(bind_address).await?;
            server.run(listener, receiver).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
