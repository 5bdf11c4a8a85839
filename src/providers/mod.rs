//! Service providers wiring the control context into running services.
//!
//! Each provider packages one long-running loop (recording, thermal,
//! pressure, D-Bus) behind the [`ServiceProvider`] seam so the
//! coordinator can start them by priority and degrade gracefully when
//! a non-critical one fails.

pub mod dbus;
pub mod pressure;
pub mod recording;
pub mod thermal_loop;
pub mod traits;

pub use dbus::DBusServiceProvider;
pub use pressure::PressureServiceProvider;
pub use recording::RecordingServiceProvider;
pub use thermal_loop::ThermalServiceProvider;
pub use traits::{AsyncProvider, ServiceProvider};
