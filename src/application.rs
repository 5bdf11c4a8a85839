//! Application entry point and builder.

use anyhow::Result;

use crate::{coordinator::SystemCoordinator, settings::SettingsManager};

/// Orchestrates the daemon lifecycle from initialization to shutdown.
///
/// # Example
///
/// ```no_run
/// use ovend::application::Application;
/// use ovend::settings::SettingsManager;
///
/// # async fn example() -> anyhow::Result<()> {
/// let settings = SettingsManager::load(None)?;
/// Application::builder()
///     .with_settings(settings)
///     .build()?
///     .run()
///     .await
/// # }
/// ```
pub struct Application {
    pub coordinator: SystemCoordinator,
    settings: SettingsManager,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Initialize, start services, run the main loop.
    pub async fn run(&mut self) -> Result<()> {
        self.coordinator.initialize(self.settings.clone()).await?;
        self.coordinator.start_all_services().await?;
        self.coordinator.run_main_loop().await
    }
}

/// Fluent construction for [`Application`].
pub struct ApplicationBuilder {
    settings: Option<SettingsManager>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { settings: None }
    }

    pub fn with_settings(mut self, settings: SettingsManager) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn build(self) -> Result<Application> {
        let settings = self
            .settings
            .ok_or_else(|| anyhow::anyhow!("settings manager is required"))?;

        Ok(Application {
            coordinator: SystemCoordinator::new(),
            settings,
        })
    }
}
