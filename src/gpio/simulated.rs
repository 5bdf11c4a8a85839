//! Simulated no-op GPIO strategy.

use std::collections::HashMap;
use std::sync::Mutex;

use log::info;

use crate::gpio::{BackendKind, GpioBackend};

/// Stand-in backend for hosts without any working pin access.
///
/// Writes log the intent and always succeed; reads return the -1
/// sentinel so sensor chains fall through to their simulated paths.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    written: Mutex<HashMap<u8, bool>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level written to a pin, if any.
    pub fn last_written(&self, pin: u8) -> Option<bool> {
        self.written.lock().ok()?.get(&pin).copied()
    }
}

impl GpioBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    fn write(&self, pin: u8, high: bool) -> bool {
        info!("Simulating GPIO {pin} write: {}", u8::from(high));
        if let Ok(mut written) = self.written.lock() {
            written.insert(pin, high);
        }
        true
    }

    fn read(&self, pin: u8) -> i32 {
        info!("Simulating GPIO {pin} read");
        -1
    }

    fn release(&self, pin: u8) {
        info!("Simulating GPIO {pin} release");
    }
}
