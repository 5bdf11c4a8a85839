//! Generic character-device strategy (gpio-cdev, `/dev/gpiochip0`).

use std::collections::HashMap;
use std::sync::Mutex;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use log::warn;

use crate::gpio::{BackendKind, GpioBackend};

const CHIP_PATH: &str = "/dev/gpiochip0";
const CONSUMER: &str = "ovend";

/// Backend holding requested line handles, keyed by line offset.
pub struct CharDevBackend {
    chip: Mutex<Chip>,
    lines: Mutex<HashMap<u8, LineHandle>>,
}

impl CharDevBackend {
    /// Opens the first GPIO chip and requests every output line low.
    pub fn probe(outputs: &[u8]) -> Option<Self> {
        let mut chip = Chip::new(CHIP_PATH).ok()?;
        let mut lines = HashMap::new();
        for &pin in outputs {
            let handle = chip
                .get_line(u32::from(pin))
                .ok()?
                .request(LineRequestFlags::OUTPUT, 0, CONSUMER)
                .ok()?;
            lines.insert(pin, handle);
        }
        Some(Self {
            chip: Mutex::new(chip),
            lines: Mutex::new(lines),
        })
    }

    fn request_input(&self, pin: u8) -> Option<LineHandle> {
        let mut chip = self.chip.lock().ok()?;
        chip.get_line(u32::from(pin))
            .ok()?
            .request(LineRequestFlags::INPUT, 0, CONSUMER)
            .ok()
    }
}

impl GpioBackend for CharDevBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CharDev
    }

    fn write(&self, pin: u8, high: bool) -> bool {
        let mut lines = match self.lines.lock() {
            Ok(guard) => guard,
            Err(_) => return false,
        };

        if let Some(handle) = lines.get(&pin) {
            return handle.set_value(u8::from(high)).is_ok();
        }

        let requested = {
            let mut chip = match self.chip.lock() {
                Ok(guard) => guard,
                Err(_) => return false,
            };
            chip.get_line(u32::from(pin))
                .and_then(|line| line.request(LineRequestFlags::OUTPUT, 0, CONSUMER))
        };
        match requested {
            Ok(handle) => {
                let ok = handle.set_value(u8::from(high)).is_ok();
                lines.insert(pin, handle);
                ok
            }
            Err(e) => {
                warn!("gpio-cdev could not claim line {pin}: {e}");
                false
            }
        }
    }

    fn read(&self, pin: u8) -> i32 {
        if let Ok(lines) = self.lines.lock() {
            if let Some(handle) = lines.get(&pin) {
                return handle.get_value().map(i32::from).unwrap_or(-1);
            }
        }

        match self.request_input(pin) {
            Some(handle) => {
                let value = handle.get_value().map(i32::from).unwrap_or(-1);
                if let Ok(mut lines) = self.lines.lock() {
                    lines.insert(pin, handle);
                }
                value
            }
            None => -1,
        }
    }

    fn release(&self, pin: u8) {
        // Dropping the handle releases the line back to the kernel.
        if let Ok(mut lines) = self.lines.lock() {
            lines.remove(&pin);
        }
    }
}
