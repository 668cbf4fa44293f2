//! Data Collector - File-Spooled Telemetry Library
//!
//! A producer samples values on a jittered timer and appends them to
//! per-minute data files; a distributor periodically ships every finished file
//! to a remote collector over HTTP and deletes it once the collector accepted
//! it. The two loops share nothing but the spool directory, where zero-byte
//! lock markers tell the distributor which file is still being written.
//!
//! # Architecture
//!
//! - **Spool**: Bucketed file store and the lock-marker protocol
//! - **Scheduler**: Periodic task trait, timer loop, worker threads
//! - **Producer**: Sample source and record writer
//! - **Distributor**: Scan, transmit, delete
//! - **Transmitter**: HTTP delivery of one payload
//! - **Server**: Reference receiver for local use and tests
//! - **Logging**: Console and daily rotating file output
//!
//! # Example
//!
//! ```rust,no_run
//! use data_collector::{
//!     BucketWriter, Distributor, HttpTransmitter, Producer, Schedule, Spool,
//!     TransmitterConfig, Worker,
//! };
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spool = Spool::open("/var/spool/data-collector")?;
//! let token = CancellationToken::new();
//!
//! let producer = Producer::new(
//!     BucketWriter::new(spool.clone()),
//!     Schedule::jittered(Duration::from_millis(500), Duration::from_secs(15))?,
//! );
//! let distributor = Distributor::new(
//!     spool,
//!     HttpTransmitter::new(&TransmitterConfig::new("collector.local", 8080))?,
//!     Schedule::interval(Duration::from_secs(60))?,
//! );
//!
//! let producer = Worker::spawn(producer, token.clone())?;
//! let distributor = Worker::spawn(distributor, token.clone())?;
//!
//! token.cancel();
//! println!("written: {}", producer.join()?.finish());
//! println!("cycles: {}", distributor.join()?.cycle_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod distributor;
pub mod logging;
pub mod producer;
pub mod scheduler;
pub mod server;
pub mod spool;
pub mod transmitter;

pub use config::{AppConfig, ConfigError};
pub use distributor::{CycleReport, DEFAULT_DISTRIBUTION_INTERVAL, Distributor};
pub use producer::{DEFAULT_MAX_INTERVAL, DEFAULT_MIN_INTERVAL, Producer, RandomDigits, SampleSource};
pub use scheduler::{Counter, PeriodicTask, Schedule, TaskError, Worker};
pub use spool::{BucketKey, BucketState, BucketWriter, Spool, SpoolError};
pub use transmitter::{HttpTransmitter, Transmit, TransmitError, TransmitterConfig};
