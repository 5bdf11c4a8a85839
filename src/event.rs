//! Event-driven communication between services and the UI boundary.

use anyhow::Result;
use tokio::sync::broadcast;

use crate::recorder::LogRecord;
use crate::state::ActuatorRole;

/// Application events published through the [`EventBus`].
///
/// The actuator controller and the periodic services are producers; the
/// D-Bus boundary is the only UI-facing consumer.
#[derive(Debug, Clone)]
pub enum Event {
    /// An actuator setter ran; value is the commanded percent (fan,
    /// steam) or 0/1 (heaters, valve).
    ActuatorChanged { role: ActuatorRole, value: u8 },
    /// Latest temperature from the thermal loop (°C).
    TemperatureUpdated(f32),
    /// Latest pressure sample (V).
    PressureUpdated(f32),
    /// A row was appended to the session log.
    SampleRecorded(LogRecord),
    /// The recording interval changed; the loop re-arms its timer.
    RecordingIntervalChanged(u64),
    /// A degraded-path condition worth surfacing to observers.
    Diagnostic(String),
    SystemShutdown,
}

/// Publish-subscribe bus for typed notifications.
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns an error if there are no active subscribers.
    pub fn publish(&self, event: Event) -> Result<()> {
        self.sender.send(event)?;
        Ok(())
    }

    /// Best-effort publish for producers that must not fail when the UI
    /// boundary is absent.
    pub fn publish_lossy(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
