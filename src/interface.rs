//! D-Bus interface: the UI boundary.
//!
//! Inbound commands (target temperature, actuator setters, recording
//! configuration, start/stop, timer mirror) arrive as method calls;
//! outbound notifications (samples, readings, actuator changes,
//! diagnostics) leave as signals.

use std::path::PathBuf;
use std::sync::Arc;

use event_listener::Event as StopNotify;
use log::info;
use serde::{Deserialize, Serialize};
use zbus::{interface, object_server::SignalEmitter};

use crate::app_context::ControlContext;
use crate::event::{Event, EventBus};

/// Board identity surfaced to the UI.
#[derive(Debug, Clone, Serialize, Deserialize, zvariant::Type)]
pub struct BoardIdentity {
    pub kind: String,
    pub model: String,
    pub backend: String,
}

pub struct DBusInterface {
    pub context: Arc<ControlContext>,
    pub event_bus: EventBus,
    pub stop_notify: Arc<StopNotify>,
    pub version: String,
}

#[interface(name = "io.github.ovend1")]
impl DBusInterface {
    #[zbus(signal)]
    async fn stopped(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;

    /// Live temperature reading (°C).
    #[zbus(signal)]
    async fn temperature(emitter: &SignalEmitter<'_>, celsius: f64) -> zbus::Result<()>;

    /// Live pressure reading (V).
    #[zbus(signal)]
    async fn pressure(emitter: &SignalEmitter<'_>, volts: f64) -> zbus::Result<()>;

    /// An actuator changed; role is one of fan/heaters/valve/steam.
    #[zbus(signal)]
    async fn actuator_changed(
        emitter: &SignalEmitter<'_>,
        role: &str,
        value: u8,
    ) -> zbus::Result<()>;

    /// Full log-record payload as JSON, one per recording tick.
    #[zbus(signal)]
    async fn sample_recorded(emitter: &SignalEmitter<'_>, json: &str) -> zbus::Result<()>;

    /// Degraded-path condition surfaced for observability.
    #[zbus(signal)]
    async fn diagnostic(emitter: &SignalEmitter<'_>, message: &str) -> zbus::Result<()>;

    /// Requests daemon shutdown.
    async fn stop(
        &self,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        emitter.stopped().await?;
        self.stop_notify.notify(1);
        Ok(())
    }

    async fn set_target_temperature(&self, celsius: f64) {
        info!("Setting target temperature to {celsius}°C");
        self.context.system.write().await.target_temp_c = celsius as f32;
    }

    async fn set_fan(&self, percent: u8) {
        self.context.actuators.set_fan(percent).await;
    }

    async fn set_heaters(&self, on: bool) {
        self.context.actuators.set_heaters(on).await;
    }

    async fn set_valve(&self, open: bool) {
        self.context.actuators.set_valve(open).await;
    }

    async fn set_steam_level(&self, percent: u8) {
        self.context.actuators.set_steam_level(percent).await;
    }

    /// Re-arms the recording loop; one second is the floor.
    async fn set_recording_interval(&self, secs: u64) -> u64 {
        let secs = secs.max(1);
        self.context.recording.write().await.interval_secs = secs;
        self.event_bus
            .publish_lossy(Event::RecordingIntervalChanged(secs));
        secs
    }

    /// Validates and persists a custom log storage directory. Invalid
    /// paths are rejected without side effects; a valid one takes
    /// effect at the next session.
    async fn set_storage_dir(&self, dir: String) -> zbus::fdo::Result<()> {
        self.context
            .settings
            .set_storage_dir(PathBuf::from(dir))
            .await
            .map_err(|e| zbus::fdo::Error::InvalidArgs(e.to_string()))
    }

    async fn start_system(&self) {
        info!("Starting oven system");
        self.context.start_system().await;
    }

    /// Turns off all actuators; monitoring and recording continue so
    /// cool-down is still tracked.
    async fn stop_system(&self) {
        info!("Stopping oven system");
        self.context.stop_system().await;
    }

    /// Mirrors the UI-owned countdown timer; stored and logged only.
    async fn set_timer_state(&self, enabled: bool, running: bool, remaining: u32, total: u32) {
        let mut timer = self.context.timer.write().await;
        timer.enabled = enabled;
        timer.running = running;
        timer.remaining_secs = remaining;
        timer.total_secs = total;
    }

    async fn board_info(&self) -> BoardIdentity {
        BoardIdentity {
            kind: self.context.board.kind.to_string(),
            model: self.context.board.model.clone(),
            backend: self.context.backend.name().to_string(),
        }
    }

    #[zbus(property)]
    async fn version(&self) -> String {
        self.version.clone()
    }

    #[zbus(property)]
    async fn board_kind(&self) -> String {
        self.context.board.kind.to_string()
    }

    #[zbus(property)]
    async fn board_model(&self) -> String {
        self.context.board.model.clone()
    }

    #[zbus(property)]
    async fn backend_name(&self) -> String {
        self.context.backend.name().to_string()
    }

    #[zbus(property)]
    async fn simulation_mode(&self) -> bool {
        self.context.simulation_mode()
    }
}
