//! # ovend
//!
//! A Linux daemon controlling a small-appliance (oven) on single-board
//! computers: heater bank, fan and steam valve actuation, temperature
//! and pressure sensing, and continuous CSV data recording.
//!
//! ## Features
//!
//! - **Board Detection**: Raspberry Pi, Orange Pi and generic ARM SBCs,
//!   with a simulation-only profile for anything else
//! - **Cascading GPIO Backends**: CLI tool, vendor library, character
//!   device, raw sysfs, simulated no-op; first working strategy wins
//! - **Availability First**: permission failures retry elevated once,
//!   sensor paths fall back to seeded simulation, actuator state stays
//!   consistent with commanded intent
//! - **Continuous Recording**: re-armable sampling loop appending one
//!   CSV row per tick to a per-session log file
//! - **D-Bus Interface**: UI commands in, samples and diagnostics out
//!
//! ## Architecture
//!
//! The daemon uses a provider-based dependency injection system with:
//! - [`SystemCoordinator`](coordinator::SystemCoordinator) - Main lifecycle manager
//! - [`EventBus`](event::EventBus) - Inter-service communication
//! - [`ControlContext`](app_context::ControlContext) - Shared runtime state
//! - Service providers for modular functionality
//!
//! ## Example
//!
//! ```no_run
//! use ovend::{application::Application, settings::SettingsManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = SettingsManager::load(None)?;
//!     Application::builder()
//!         .with_settings(settings)
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod actuators;
pub mod app_context;
pub mod application;
pub mod board;
pub mod cli;
pub mod coordinator;
pub mod event;
pub mod executor;
pub mod gpio;
pub mod interface;
pub mod providers;
pub mod recorder;
pub mod sensing;
pub mod settings;
pub mod state;
pub mod task_manager;
pub mod thermal;
