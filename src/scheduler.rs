//! Scheduler Layer
//!
//! Periodic execution for the producer and the distributor. Each task runs
//! on its own OS thread with a dedicated single-threaded Tokio runtime, so a
//! tick that blocks on the filesystem only ever stalls its own loop.
//!
//! # Architecture
//!
//! - [`PeriodicTask`]: Core trait for anything driven by a timer
//! - [`Schedule`]: Fixed or jittered interval between ticks
//! - [`Worker`]: Owns the thread a task runs on; joining hands the task back
//! - [`Counter`]: Shared monotonic counter for observability
//!
//! # Example
//!
//! ```rust,no_run
//! use data_collector::{BucketWriter, Producer, Schedule, Spool, Worker};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let spool = Spool::open("/tmp/spool")?;
//! let schedule = Schedule::jittered(Duration::from_millis(500), Duration::from_secs(15))?;
//! let producer = Producer::new(BucketWriter::new(spool), schedule);
//!
//! let token = CancellationToken::new();
//! let worker = Worker::spawn(producer, token.clone())?;
//! token.cancel();
//! let producer = worker.join()?;
//! println!("wrote {} values", producer.write_count());
//! # Ok(())
//! # }
//! ```

mod counter;
mod runner;
mod traits;

pub use counter::Counter;
pub use runner::{Worker, run_periodic};
pub use traits::{PeriodicTask, Schedule, TaskError};
