//! Data Sink Binary Entry Point
//!
//! Local stand-in for the remote collector. Accepts `POST /` with a plain-text
//! body, logs it and answers `200 OK`.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use data_collector::logging::init_logging;
use data_collector::server::{AppState, serve};
use tokio_util::sync::CancellationToken;

/// Data Sink - reference receiver for the data collector
#[derive(Parser, Debug)]
#[command(name = "data-sink", version, about, long_about = None)]
struct Cli {
    /// Bind address, IPv4 or IPv6
    #[arg(long, default_value = "0.0.0.0", env = "DATA_SINK_BIND")]
    bind: IpAddr,

    /// Listen port
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    port: u16,
}

impl Cli {
    fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None)?;

    let cli = Cli::parse();
    let listener = tokio::net::TcpListener::bind(cli.addr()).await?;

    let state = AppState::new();
    let token = CancellationToken::new();

    let shutdown = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            return;
        }
        tracing::info!("Received Ctrl+C signal");
        shutdown.cancel();
    });

    serve(listener, state.clone(), token).await?;

    tracing::info!(received = state.received().await, "Shutdown complete");
    Ok(())
}
