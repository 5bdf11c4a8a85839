//! Vendor library strategy for the Raspberry Pi family (rppal).

use std::collections::HashMap;
use std::sync::Mutex;

use log::warn;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};

use crate::gpio::{BackendKind, GpioBackend};

enum OwnedPin {
    Output(OutputPin),
    Input(InputPin),
}

/// Backend holding rppal pin handles, keyed by BCM number.
pub struct RppalBackend {
    gpio: Gpio,
    pins: Mutex<HashMap<u8, OwnedPin>>,
}

impl RppalBackend {
    /// Loads the library and claims every output pin low.
    ///
    /// Returns `None` off Raspberry Pi hardware or when the memory-mapped
    /// peripheral cannot be opened (permission or missing device).
    pub fn probe(outputs: &[u8]) -> Option<Self> {
        let gpio = Gpio::new().ok()?;
        let mut pins = HashMap::new();
        for &pin in outputs {
            let handle = gpio.get(pin).ok()?.into_output_low();
            pins.insert(pin, OwnedPin::Output(handle));
        }
        Some(Self {
            gpio,
            pins: Mutex::new(pins),
        })
    }
}

impl GpioBackend for RppalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::VendorLib
    }

    fn write(&self, pin: u8, high: bool) -> bool {
        let mut pins = match self.pins.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };

        if let Some(OwnedPin::Output(handle)) = pins.get_mut(&pin) {
            handle.write(if high { Level::High } else { Level::Low });
            return true;
        }

        match self.gpio.get(pin) {
            Ok(unclaimed) => {
                let mut handle = unclaimed.into_output();
                handle.write(if high { Level::High } else { Level::Low });
                pins.insert(pin, OwnedPin::Output(handle));
                true
            }
            Err(e) => {
                warn!("rppal could not claim pin {pin}: {e}");
                false
            }
        }
    }

    fn read(&self, pin: u8) -> i32 {
        let mut pins = match self.pins.lock() {
            Ok(guard) => guard,
            Err(_) => return -1,
        };

        if let Some(OwnedPin::Input(handle)) = pins.get(&pin) {
            return match handle.read() {
                Level::High => 1,
                Level::Low => 0,
            };
        }

        match self.gpio.get(pin) {
            Ok(unclaimed) => {
                let handle = unclaimed.into_input();
                let level = handle.read();
                pins.insert(pin, OwnedPin::Input(handle));
                match level {
                    Level::High => 1,
                    Level::Low => 0,
                }
            }
            Err(e) => {
                warn!("rppal could not read pin {pin}: {e}");
                -1
            }
        }
    }

    fn release(&self, pin: u8) {
        // Dropping the handle resets the pin and returns it to the OS.
        if let Ok(mut pins) = self.pins.lock() {
            pins.remove(&pin);
        }
    }
}
