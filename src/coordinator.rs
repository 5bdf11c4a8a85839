//! System coordinator: service lifecycle and dependency injection.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    app_context::ControlContext,
    event::{Event, EventBus},
    providers::{
        DBusServiceProvider, PressureServiceProvider, RecordingServiceProvider, ServiceProvider,
        ThermalServiceProvider,
    },
    settings::SettingsManager,
    task_manager::TaskManager,
};

/// Manages the complete lifecycle of all services.
///
/// Critical services must start; non-critical ones degrade to a warning
/// (a missing session bus leaves the daemon running headless).
pub struct SystemCoordinator {
    task_manager: TaskManager,
    event_bus: EventBus,
    context: Option<Arc<ControlContext>>,
    service_providers: Vec<Box<dyn ServiceProvider>>,
}

impl Default for SystemCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCoordinator {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            event_bus: EventBus::new(),
            context: None,
            service_providers: Vec::new(),
        }
    }

    /// Detects the board, selects the GPIO backend and registers all
    /// service providers. Runs once.
    pub async fn initialize(&mut self, settings: SettingsManager) -> Result<()> {
        info!("Initializing SystemCoordinator...");

        let context = ControlContext::initialize(settings, self.event_bus.clone());
        info!(
            "Control context ready: board={}, backend={}, simulation={}",
            context.board.model,
            context.backend.name(),
            context.simulation_mode()
        );

        self.register_service_providers(context.clone()).await;
        self.context = Some(context);

        info!("SystemCoordinator initialization completed");
        Ok(())
    }

    async fn register_service_providers(&mut self, context: Arc<ControlContext>) {
        let mut providers: Vec<Box<dyn ServiceProvider>> = vec![
            Box::new(RecordingServiceProvider::new(
                context.clone(),
                self.event_bus.clone(),
            )),
            Box::new(ThermalServiceProvider::new(
                context.clone(),
                self.event_bus.clone(),
            )),
            Box::new(PressureServiceProvider::new(
                context.clone(),
                self.event_bus.clone(),
            )),
        ];

        match DBusServiceProvider::new(context, self.event_bus.clone()).await {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => {
                log::warn!("No D-Bus session bus ({e}), running headless");
            }
        }

        providers.sort_by_key(|p| std::cmp::Reverse(p.priority()));
        self.service_providers = providers;

        info!(
            "Registered {} service providers in priority order",
            self.service_providers.len()
        );
    }

    /// Starts all registered services in priority order.
    pub async fn start_all_services(&mut self) -> Result<()> {
        info!(
            "Starting {} services in priority order...",
            self.service_providers.len()
        );

        for provider in &self.service_providers {
            match provider.start(&mut self.task_manager).await {
                Ok(()) => {
                    info!(
                        "Service '{}' started (priority: {}, critical: {})",
                        provider.name(),
                        provider.priority(),
                        provider.is_critical()
                    );
                }
                Err(e) if provider.is_critical() => {
                    return Err(e).with_context(|| {
                        format!("critical service '{}' failed to start", provider.name())
                    });
                }
                Err(e) => {
                    log::warn!(
                        "Non-critical service '{}' failed to start: {e}",
                        provider.name()
                    );
                }
            }
        }

        info!("All critical services started");
        Ok(())
    }

    /// Main loop: waits for ctrl-c or a shutdown event.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        let mut event_rx = self.event_bus.subscribe();
        info!("Starting main event loop");

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => {
                            info!("Received Ctrl+C, initiating graceful shutdown...");
                            self.shutdown().await;
                            break;
                        }
                        Err(e) => {
                            bail!("failed to listen for shutdown signal: {e}");
                        }
                    }
                }

                event = event_rx.recv() => {
                    match event {
                        Ok(Event::SystemShutdown) => {
                            info!("Shutdown requested, stopping services...");
                            self.shutdown().await;
                            break;
                        }
                        Ok(Event::Diagnostic(message)) => {
                            log::warn!("Diagnostic: {message}");
                        }
                        Ok(_) => {
                            // Periodic samples; the D-Bus service is their consumer.
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            bail!("event bus channel closed unexpectedly");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            log::warn!("Event bus lagged by {n} messages");
                        }
                    }
                }
            }
        }

        info!("Main event loop terminated");
        Ok(())
    }

    /// Stops all tasks and releases owned hardware resources.
    async fn shutdown(&mut self) {
        if let Err(e) = self.task_manager.shutdown_all().await {
            log::error!("Error during task shutdown: {e}");
        }
        if let Some(context) = &self.context {
            context.release_resources();
        }
        info!("Shutdown complete");
    }

    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
