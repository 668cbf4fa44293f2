//! Core scheduler traits and types.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::spool::{BucketKey, SpoolError};

/// Errors that can occur while scheduling or running a task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Schedule parameters are unusable.
    #[error("invalid schedule: {0}")]
    Schedule(String),

    /// Spool operation failed.
    #[error("spool error: {0}")]
    Spool(#[from] SpoolError),

    /// The bucket for this tick could not be opened; the sample was dropped.
    #[error("bucket {0} is not writable")]
    BucketUnavailable(BucketKey),

    /// Some files of a distribution cycle were left on disk.
    #[error("{failed} of {total} files were not distributed")]
    Incomplete {
        /// Files not transmitted or not removed.
        failed: usize,
        /// Files selected for the cycle.
        total: usize,
    },

    /// Thread or runtime for the task could not be created.
    #[error("failed to start task '{name}': {source}")]
    Spawn {
        /// Task name.
        name: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The task thread panicked.
    #[error("task '{0}' panicked")]
    Panicked(String),
}

/// Delay between two ticks of a periodic task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval between ticks.
    Interval(Duration),

    /// Interval drawn uniformly from `[min, max]`, redrawn before every tick.
    Jittered {
        /// Shortest delay.
        min: Duration,
        /// Longest delay.
        max: Duration,
    },
}

impl Schedule {
    /// Create a fixed interval schedule.
    ///
    /// # Errors
    /// Returns `TaskError::Schedule` if the interval is zero.
    pub fn interval(interval: Duration) -> Result<Self, TaskError> {
        if interval.is_zero() {
            return Err(TaskError::Schedule("interval must be positive".to_string()));
        }
        Ok(Self::Interval(interval))
    }

    /// Create a jittered schedule.
    ///
    /// # Errors
    /// Returns `TaskError::Schedule` if `min` is zero or exceeds `max`.
    pub fn jittered(min: Duration, max: Duration) -> Result<Self, TaskError> {
        if min.is_zero() {
            return Err(TaskError::Schedule(
                "minimum interval must be positive".to_string(),
            ));
        }
        if min > max {
            return Err(TaskError::Schedule(format!(
                "minimum interval {min:?} exceeds maximum {max:?}"
            )));
        }
        Ok(Self::Jittered { min, max })
    }

    /// Delay until the next tick.
    pub fn next_delay(&self) -> Duration {
        match self {
            Self::Interval(d) => *d,
            Self::Jittered { min, max } => rand::rng().random_range(*min..=*max),
        }
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval(d) => write!(f, "every {:?}", d),
            Self::Jittered { min, max } => write!(f, "every {:?}..{:?}", min, max),
        }
    }
}

/// Anything driven by a timer.
///
/// `tick` runs to completion once started; cancellation is only observed
/// between ticks. An `Err` is logged by the runner and the loop carries on
/// with the next tick.
#[async_trait::async_trait]
pub trait PeriodicTask: Send + 'static {
    /// Name used for the thread and in log lines.
    fn name(&self) -> &str;

    /// Delay between ticks.
    fn schedule(&self) -> &Schedule;

    /// Whether the first tick fires right away instead of after one delay.
    fn fire_on_start(&self) -> bool {
        false
    }

    /// Perform one unit of work.
    async fn tick(&mut self) -> Result<(), TaskError>;
}
