//! Background task registry with graceful shutdown.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How long a cancelled task may take to wind down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Tracks named service tasks and cancels them as a group.
pub struct TaskManager {
    tasks: HashMap<&'static str, JoinHandle<Result<()>>>,
    global_token: CancellationToken,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            global_token: CancellationToken::new(),
        }
    }

    /// Spawns a task under `name`, handing it a child cancellation token.
    pub async fn spawn<F, Fut>(&mut self, name: &'static str, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.global_token.child_token();

        let handle = tokio::spawn(async move {
            info!("Starting task: {name}");
            match task_fn(token).await {
                Ok(()) => {
                    info!("Task '{name}' completed");
                    Ok(())
                }
                Err(e) => {
                    error!("Task '{name}' failed: {e}");
                    Err(e)
                }
            }
        });

        self.tasks.insert(name, handle);
        Ok(())
    }

    /// Cancels everything and waits for each task within the grace
    /// period. Returns the first error encountered, if any.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        info!("Stopping all {} tasks", self.tasks.len());
        self.global_token.cancel();

        let mut first_error = None;
        for (name, handle) in self.tasks.drain() {
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    warn!("Task '{name}' failed during shutdown: {e}");
                    first_error.get_or_insert(e);
                }
                Ok(Err(e)) => {
                    let error = anyhow::anyhow!("task '{name}' panicked: {e}");
                    error!("{error}");
                    first_error.get_or_insert(error);
                }
                Err(_) => {
                    let error = anyhow::anyhow!("task '{name}' exceeded the shutdown grace period");
                    error!("{error}");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error).context("one or more tasks failed during shutdown"),
            None => {
                info!("All tasks stopped");
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub fn is_running(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
