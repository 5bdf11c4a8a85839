//! Actuator control: heater bank, fan and steam valve.
//!
//! Setters are idempotent and never raise. Each write goes through the
//! active backend handle with one direct sysfs retry on failure; state
//! is updated optimistically either way so the UI and the recording
//! loop stay consistent with commanded intent.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::RwLock;

use crate::board::PinMap;
use crate::event::{Event, EventBus};
use crate::gpio::{GpioBackend, sysfs};
use crate::state::{ActuatorRole, ActuatorState};

pub struct Actuators {
    backend: Arc<dyn GpioBackend>,
    pins: PinMap,
    gpio_root: PathBuf,
    state: RwLock<ActuatorState>,
    event_bus: EventBus,
}

impl Actuators {
    pub fn new(
        backend: Arc<dyn GpioBackend>,
        pins: PinMap,
        gpio_root: PathBuf,
        event_bus: EventBus,
    ) -> Self {
        Self {
            backend,
            pins,
            gpio_root,
            state: RwLock::new(ActuatorState::default()),
            event_bus,
        }
    }

    /// Sets fan speed as a percentage (0-100).
    ///
    /// The proportional input collapses to on/off at the pin; the PWM
    /// value is computed for the log line only.
    pub async fn set_fan(&self, percent: u8) {
        let percent = percent.min(100);
        let pwm = (u16::from(percent) * 255 / 100) as u8;
        info!("Setting fan speed to {percent}% (PWM: {pwm})");

        self.drive(ActuatorRole::Fan, self.pins.fan, pwm > 0);

        self.state.write().await.fan_speed_percent = percent;
        self.notify(ActuatorRole::Fan, percent);
    }

    /// Turns the whole heater bank on or off; every heater pin is
    /// driven identically.
    pub async fn set_heaters(&self, on: bool) {
        info!("Setting heating elements to {}", if on { "ON" } else { "OFF" });

        for pin in self.pins.heaters {
            self.drive(ActuatorRole::Heaters, pin, on);
        }

        self.state.write().await.heaters_on = on;
        self.notify(ActuatorRole::Heaters, u8::from(on));
    }

    /// Opens or closes the steam solenoid valve.
    pub async fn set_valve(&self, open: bool) {
        info!("Setting solenoid valve to {}", if open { "OPEN" } else { "CLOSED" });

        self.drive(ActuatorRole::Valve, self.pins.valve, open);

        self.state.write().await.valve_open = open;
        self.notify(ActuatorRole::Valve, u8::from(open));
    }

    /// Stores the requested steam intensity; no dedicated pin exists,
    /// the valve remains the only steam actuator.
    pub async fn set_steam_level(&self, percent: u8) {
        let percent = percent.min(100);
        self.state.write().await.steam_level_percent = percent;
        self.notify(ActuatorRole::Steam, percent);
    }

    /// Stop-system path: everything off. Monitoring and recording are
    /// untouched so cooling can still be tracked.
    pub async fn shut_off(&self) {
        self.set_heaters(false).await;
        self.set_fan(0).await;
        self.set_valve(false).await;
    }

    pub async fn state(&self) -> ActuatorState {
        *self.state.read().await
    }

    /// Releases every output pin back to the OS.
    pub fn release_all(&self) {
        self.backend.release(self.pins.fan);
        for pin in self.pins.heaters {
            self.backend.release(pin);
        }
        self.backend.release(self.pins.valve);
    }

    /// One backend write, one direct low-level retry, never an error.
    fn drive(&self, role: ActuatorRole, pin: u8, high: bool) {
        if self.backend.write(pin, high) {
            return;
        }
        if sysfs::direct_write(&self.gpio_root, pin, high) {
            warn!("{role} pin {pin}: backend write failed, direct sysfs write succeeded");
            return;
        }
        warn!("{role} pin {pin}: write failed on every path, state updated optimistically");
        self.event_bus.publish_lossy(Event::Diagnostic(format!(
            "{role} pin {pin} did not accept the write"
        )));
    }

    fn notify(&self, role: ActuatorRole, value: u8) {
        self.event_bus
            .publish_lossy(Event::ActuatorChanged { role, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::{BackendKind, SimulatedBackend};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tokio::time::{Duration, timeout};

    struct RefusingBackend;

    impl GpioBackend for RefusingBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Simulated
        }
        fn write(&self, _pin: u8, _high: bool) -> bool {
            false
        }
        fn read(&self, _pin: u8) -> i32 {
            -1
        }
        fn release(&self, _pin: u8) {}
    }

    fn pins() -> PinMap {
        PinMap {
            fan: 17,
            heaters: [22, 23, 24],
            valve: 18,
            temp_probe: 4,
            pressure: 0,
        }
    }

    fn simulated_actuators() -> (Actuators, Arc<SimulatedBackend>, EventBus) {
        let backend = Arc::new(SimulatedBackend::new());
        let bus = EventBus::new();
        let root = TempDir::new().unwrap();
        let actuators = Actuators::new(backend.clone(), pins(), root.path().into(), bus.clone());
        (actuators, backend, bus)
    }

    #[tokio::test]
    async fn set_fan_updates_state_and_fires_one_notification() {
        let (actuators, backend, bus) = simulated_actuators();
        let mut rx = bus.subscribe();

        actuators.set_fan(50).await;

        assert_eq!(actuators.state().await.fan_speed_percent, 50);
        assert_eq!(backend.last_written(17), Some(true));

        match rx.recv().await.unwrap() {
            Event::ActuatorChanged { role, value } => {
                assert_eq!(role, ActuatorRole::Fan);
                assert_eq!(value, 50);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        // Exactly once: nothing else is pending.
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn zero_fan_percent_drives_pin_low() {
        let (actuators, backend, _bus) = simulated_actuators();
        actuators.set_fan(100).await;
        actuators.set_fan(0).await;
        assert_eq!(backend.last_written(17), Some(false));
    }

    #[tokio::test]
    async fn fan_percent_is_clamped() {
        let (actuators, _backend, _bus) = simulated_actuators();
        actuators.set_fan(250).await;
        assert_eq!(actuators.state().await.fan_speed_percent, 100);
    }

    #[tokio::test]
    async fn heaters_drive_every_pin_in_the_bank() {
        let (actuators, backend, _bus) = simulated_actuators();

        actuators.set_heaters(true).await;
        for pin in [22, 23, 24] {
            assert_eq!(backend.last_written(pin), Some(true));
        }
        assert!(actuators.state().await.heaters_on);

        actuators.set_heaters(false).await;
        for pin in [22, 23, 24] {
            assert_eq!(backend.last_written(pin), Some(false));
        }
    }

    #[tokio::test]
    async fn failed_writes_still_update_state_optimistically() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let root = TempDir::new().unwrap();
        let actuators = Actuators::new(Arc::new(RefusingBackend), pins(), root.path().into(), bus);

        actuators.set_valve(true).await;

        assert!(actuators.state().await.valve_open);

        // A diagnostic precedes the change notification.
        assert!(matches!(rx.recv().await.unwrap(), Event::Diagnostic(_)));
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::ActuatorChanged {
                role: ActuatorRole::Valve,
                value: 1
            }
        ));
    }

    #[tokio::test]
    async fn failed_backend_write_retries_direct_sysfs() {
        let bus = EventBus::new();
        let root = TempDir::new().unwrap();
        let dir = root.path().join("gpio18");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("value"), "0").unwrap();

        let actuators = Actuators::new(Arc::new(RefusingBackend), pins(), root.path().into(), bus);
        actuators.set_valve(true).await;

        assert_eq!(std::fs::read_to_string(dir.join("value")).unwrap(), "1");
    }

    #[tokio::test]
    async fn steam_level_is_stored_without_pin_activity() {
        let (actuators, backend, _bus) = simulated_actuators();
        actuators.set_steam_level(75).await;

        assert_eq!(actuators.state().await.steam_level_percent, 75);
        assert_eq!(backend.last_written(18), None);
    }

    #[tokio::test]
    async fn shut_off_turns_everything_off() {
        let (actuators, _backend, _bus) = simulated_actuators();
        actuators.set_fan(80).await;
        actuators.set_heaters(true).await;
        actuators.set_valve(true).await;

        actuators.shut_off().await;

        let state = actuators.state().await;
        assert_eq!(state.fan_speed_percent, 0);
        assert!(!state.heaters_on);
        assert!(!state.valve_open);
    }
}
