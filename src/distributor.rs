//! Distributor loop.
//!
//! Every cycle lists the distributable files in the spool, transmits each
//! one and deletes it only after the collector accepted it. A file whose
//! delivery or deletion fails simply stays in the spool for the next cycle,
//! which gives at-least-once delivery without any retry bookkeeping.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::scheduler::{Counter, PeriodicTask, Schedule, TaskError};
use crate::spool::{Spool, SpoolError};
use crate::transmitter::Transmit;

/// Default distribution interval (60 seconds).
pub const DEFAULT_DISTRIBUTION_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one distribution cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Files selected for the cycle.
    pub attempted: usize,
    /// Files the collector accepted.
    pub transmitted: usize,
    /// Accepted files that were also deleted.
    pub removed: usize,
}

impl CycleReport {
    /// Every selected file was transmitted and removed. True for empty cycles.
    pub fn is_complete(&self) -> bool {
        self.removed == self.attempted
    }

    /// Files left in the spool.
    pub fn failed(&self) -> usize {
        self.attempted - self.removed
    }
}

/// Periodic shipper of finished buckets.
pub struct Distributor<T> {
    spool: Spool,
    transmitter: T,
    schedule: Schedule,
    cycles: Counter,
}

impl<T: Transmit> Distributor<T> {
    /// Create a distributor draining `spool` through `transmitter`.
    pub fn new(spool: Spool, transmitter: T, schedule: Schedule) -> Self {
        Self {
            spool,
            transmitter,
            schedule,
            cycles: Counter::new(),
        }
    }

    /// Number of fully successful cycles so far.
    pub fn cycle_count(&self) -> u64 {
        self.cycles.get()
    }

    /// Handle on the cycle counter that stays readable while the loop runs.
    pub fn counter(&self) -> Counter {
        self.cycles.clone()
    }

    /// Run one distribution cycle.
    ///
    /// Per-file failures are logged and reflected in the report. The cycle
    /// counter is incremented only when the report is complete.
    ///
    /// # Errors
    /// Returns `SpoolError` if the spool directory cannot be listed; nothing
    /// is sent and the counter is left alone.
    pub async fn distribute(&self) -> Result<CycleReport, SpoolError> {
        let files = self.spool.list_distributable()?;
        let mut report = CycleReport {
            attempted: files.len(),
            ..CycleReport::default()
        };
        tracing::debug!(files = files.len(), "Starting distribution cycle");

        for path in &files {
            if !self.deliver(path).await {
                continue;
            }
            report.transmitted += 1;

            match fs::remove_file(path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "File distributed and removed");
                    report.removed += 1;
                }
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Failed to remove distributed file");
                }
            }
        }

        if report.is_complete() {
            self.cycles.increment();
        }
        Ok(report)
    }

    async fn deliver(&self, path: &Path) -> bool {
        let payload = match fs::read(path) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read file");
                return false;
            }
        };

        let delivered = self.transmitter.transmit(payload).await;
        if !delivered {
            tracing::warn!(path = %path.display(), "Transmission failed, keeping file");
        }
        delivered
    }
}

impl<T> std::fmt::Debug for Distributor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distributor")
            .field("spool", &self.spool)
            .field("schedule", &self.schedule)
            .field("cycles", &self.cycles.get())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<T: Transmit> PeriodicTask for Distributor<T> {
    fn name(&self) -> &str {
        "distributor"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    fn fire_on_start(&self) -> bool {
        true
    }

    async fn tick(&mut self) -> Result<(), TaskError> {
        let report = self.distribute().await?;
        if !report.is_complete() {
            return Err(TaskError::Incomplete {
                failed: report.failed(),
                total: report.attempted,
            });
        }
        Ok(())
    }
}
