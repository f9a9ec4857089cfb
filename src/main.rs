use clap::Parser;

use socket_proxy::config::Args;
use socket_proxy::lifecycle::{signals, startup, Shutdown};
use socket_proxy::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Args::parse().resolve()?;

    logging::init_logging(&config.observability);

    tracing::info!("socket-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        tls_cert = ?config.tls.cert_path,
        tls_key = ?config.tls.key_path,
        port = config.listener.port,
        socket = ?config.backend.socket_path,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    if let Err(e) = startup::run(config, &shutdown).await {
        tracing::error!(error = %e, "Gateway stopped with error");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
