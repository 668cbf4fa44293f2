//! Data Collector Binary Entry Point
//!
//! Runs the producer and the distributor until SIGINT or SIGTERM.
//! Core functionality is provided by the `data_collector` library crate.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use data_collector::{
    AppConfig, BucketWriter, Distributor, HttpTransmitter, Producer, Spool, TaskError, Worker,
    config::parse_duration, logging::init_logging,
};
use tokio_util::sync::CancellationToken;

/// Data Collector - spools samples to disk and ships them to a collector
#[derive(Parser, Debug)]
#[command(name = "data-collector", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long, env = "DATA_COLLECTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Spool directory (overrides config file)
    #[arg(long = "tmp-persist-dir", env = "DATA_COLLECTOR_SPOOL_DIR")]
    spool_dir: Option<PathBuf>,

    /// Collector host (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_HOST")]
    host: Option<String>,

    /// Collector port (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_PORT")]
    port: Option<u16>,

    /// Collector request path (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_PATH")]
    path: Option<String>,

    /// Distribution interval in seconds (overrides config file)
    #[arg(long = "dist-interval", env = "DATA_COLLECTOR_DIST_INTERVAL")]
    dist_interval: Option<u64>,

    /// Minimum producer interval, e.g. "500ms" (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_MIN_INTERVAL", value_parser = parse_duration)]
    min_interval: Option<Duration>,

    /// Maximum producer interval, e.g. "15s" (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_MAX_INTERVAL", value_parser = parse_duration)]
    max_interval: Option<Duration>,

    /// Request timeout, e.g. "10s" (overrides config file)
    #[arg(long, env = "DATA_COLLECTOR_TIMEOUT", value_parser = parse_duration)]
    timeout: Option<Duration>,

    /// Directory for daily rotated log files (console only when omitted)
    #[arg(long, env = "DATA_COLLECTOR_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    /// Apply CLI/env overrides (CLI > ENV > config file).
    fn apply(self, config: &mut AppConfig) {
        if let Some(dir) = self.spool_dir {
            config.spool.dir = dir;
        }
        if let Some(host) = self.host {
            config.collector.host = host;
        }
        if let Some(port) = self.port {
            config.collector.port = port;
        }
        if let Some(path) = self.path {
            config.collector.path = path;
        }
        if let Some(secs) = self.dist_interval {
            config.distributor.interval = Duration::from_secs(secs);
        }
        if let Some(min) = self.min_interval {
            config.producer.min_interval = min;
        }
        if let Some(max) = self.max_interval {
            config.producer.max_interval = max;
        }
        if let Some(timeout) = self.timeout {
            config.collector.timeout = Some(timeout);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_deref())?;

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading configuration");
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    tracing::info!(
        spool = %config.spool.dir.display(),
        collector = %config.collector.url(),
        distribution_interval = ?config.distributor.interval,
        min_interval = ?config.producer.min_interval,
        max_interval = ?config.producer.max_interval,
        "Starting data collector"
    );

    let spool = Spool::open(&config.spool.dir)?;
    let transmitter = HttpTransmitter::new(&config.collector)?;

    let token = CancellationToken::new();

    let distributor = Distributor::new(spool.clone(), transmitter, config.distributor_schedule()?);
    let distributor = Worker::spawn(distributor, token.clone())?;

    let producer = Producer::new(BucketWriter::new(spool), config.producer_schedule()?);
    let producer = match Worker::spawn(producer, token.clone()) {
        Ok(worker) => worker,
        Err(e) => {
            token.cancel();
            let joined = tokio::task::spawn_blocking(move || distributor.join()).await;
            log_abandoned_join("distributor", joined);
            return Err(e.into());
        }
    };

    tracing::info!("Press Ctrl+C to shutdown");
    shutdown_signal().await;
    token.cancel();

    let (written, distributions) = tokio::task::spawn_blocking(move || {
        let written = producer.join().map(Producer::finish);
        let distributions = distributor.join().map(|d| d.cycle_count());
        (written, distributions)
    })
    .await?;

    tracing::info!("Total amount of written values is {}", written?);
    tracing::info!("Total amount of successful distributions is {}", distributions?);
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Log the outcome of joining a worker that is being torn down after a
/// startup failure.
fn log_abandoned_join<T>(
    name: &str,
    joined: Result<Result<T, TaskError>, tokio::task::JoinError>,
) -> bool {
    match joined {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::warn!(task = name, error = %e, "Worker did not stop cleanly");
            false
        }
        Err(e) => {
            tracing::warn!(task = name, error = %e, "Failed to join worker");
            false
        }
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }
}
