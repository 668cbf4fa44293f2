//! Timer loop and the thread that hosts it.

use std::thread::JoinHandle;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::scheduler::{PeriodicTask, TaskError};

/// Drive `task` until `token` is cancelled, then hand it back.
///
/// The next deadline is armed before each tick runs, so a tick that takes
/// longer than the interval is followed immediately by the next one instead
/// of pushing the cadence back. Ticks never overlap.
pub async fn run_periodic<T: PeriodicTask>(mut task: T, token: CancellationToken) -> T {
    let name = task.name().to_string();
    tracing::info!(task = %name, schedule = %task.schedule(), "Task started");

    let mut deadline = if task.fire_on_start() {
        Instant::now()
    } else {
        Instant::now() + task.schedule().next_delay()
    };

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            () = tokio::time::sleep_until(deadline) => {}
        }

        deadline = Instant::now() + task.schedule().next_delay();

        let start = std::time::Instant::now();
        tracing::debug!(task = %name, "Running tick");
        match task.tick().await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis();
                tracing::debug!(task = %name, duration_ms, "Tick succeeded");
            }
            Err(e) => tracing::error!(task = %name, error = %e, "Tick failed"),
        }
    }

    tracing::info!(task = %name, "Task stopped");
    task
}

/// A periodic task running on a dedicated OS thread.
#[derive(Debug)]
pub struct Worker<T> {
    name: String,
    handle: JoinHandle<T>,
}

impl<T: PeriodicTask> Worker<T> {
    /// Start `task` on a new thread named after it.
    ///
    /// The thread owns a current-thread Tokio runtime and runs
    /// [`run_periodic`] on it until `token` is cancelled.
    pub fn spawn(task: T, token: CancellationToken) -> Result<Self, TaskError> {
        let name = task.name().to_string();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| TaskError::Spawn {
                name: name.clone(),
                source,
            })?;

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || runtime.block_on(run_periodic(task, token)))
            .map_err(|source| TaskError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self { name, handle })
    }
}

impl<T> Worker<T> {
    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Block until the thread exits and return the task.
    ///
    /// Cancel the token first, otherwise this waits forever.
    pub fn join(self) -> Result<T, TaskError> {
        let Self { name, handle } = self;
        handle.join().map_err(|_| TaskError::Panicked(name))
    }
}
