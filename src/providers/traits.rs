use anyhow::Result;
use async_trait::async_trait;

use crate::task_manager::TaskManager;

/// Provider that creates a component asynchronously.
///
/// Keeps blocking hardware setup out of constructors and lets tests
/// inject doubles at the seam.
#[async_trait]
pub trait AsyncProvider<T> {
    async fn provide(&self) -> Result<T>;
}

/// A service that can be started through the [`TaskManager`].
///
/// Services carry a startup priority and a criticality flag; a critical
/// service failing to start aborts the daemon, a non-critical one only
/// logs.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()>;

    /// Service name for logging and task registration.
    fn name(&self) -> &'static str;

    /// Startup priority; higher numbers start first.
    fn priority(&self) -> i32 {
        0
    }

    fn is_critical(&self) -> bool {
        false
    }
}
