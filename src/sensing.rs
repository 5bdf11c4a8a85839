//! Multi-path sensor acquisition with cascading fallback.
//!
//! Temperature comes from a DS18B20 one-wire probe when one is mounted,
//! otherwise from seeded simulation. Pressure is approximated from a
//! binary GPIO level unless an ADC utility is discoverable. Every path
//! is attempted top-to-bottom on every call; nothing caches the last
//! successful path, so a device mounted mid-session is picked up on the
//! next sample.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use rand::Rng;

use crate::board::PinMap;
use crate::executor::{PrivilegedExecutor, discoverable};
use crate::gpio::GpioBackend;
use crate::thermal::ROOM_TEMP_C;

/// Nominal pressure sensor range (V).
pub const PRESSURE_MAX_V: f32 = 3.0;

// Placeholder binary-to-voltage mapping; these constants carry no
// calibration meaning outside this codebase.
const LOW_BASELINE_V: f32 = 0.2;
const HIGH_BASELINE_V: f32 = 2.8;
const BASELINE_JITTER_V: f32 = 0.05;

/// 12-bit ADC against a 3.3 V reference, the layout the `gpio` utility
/// reports on boards that have a converter wired up.
const ADC_MAX_COUNT: f32 = 4095.0;
const ADC_REFERENCE_V: f32 = 3.3;

/// Multi-path reader for the temperature probe and pressure input.
pub struct SensorReader {
    backend: Arc<dyn GpioBackend>,
    executor: Arc<dyn PrivilegedExecutor>,
    pins: PinMap,
    w1_root: PathBuf,
    gpio_root: PathBuf,
}

impl SensorReader {
    pub fn new(
        backend: Arc<dyn GpioBackend>,
        executor: Arc<dyn PrivilegedExecutor>,
        pins: PinMap,
        w1_root: PathBuf,
        gpio_root: PathBuf,
    ) -> Self {
        Self {
            backend,
            executor,
            pins,
            w1_root,
            gpio_root,
        }
    }

    /// Whether a one-wire probe currently answers.
    pub fn probe_available(&self) -> bool {
        self.read_probe_millidegrees().is_some()
    }

    /// Temperature in °C: probe reading, or room temperature with a
    /// small jitter when no probe answers.
    pub fn read_temperature(&self) -> f32 {
        match self.read_probe_millidegrees() {
            Some(milli) => milli as f32 / 1000.0,
            None => {
                debug!("temperature probe not found, using simulated value");
                ROOM_TEMP_C + rand::rng().random_range(-1.0..1.0)
            }
        }
    }

    /// Pressure in volts, within the nominal [0, 3] V range.
    pub fn read_pressure(&self) -> f32 {
        if let Some(volts) = self.read_adc_volts() {
            return volts.clamp(0.0, PRESSURE_MAX_V);
        }

        if let Some(level) = self.read_binary_level() {
            return Self::infer_voltage(level);
        }

        warn!("every pressure path failed, returning randomized value");
        rand::rng().random_range(0.0..PRESSURE_MAX_V)
    }

    /// Scans for the first DS18B20 device directory (prefix `28-`).
    fn read_probe_millidegrees(&self) -> Option<i64> {
        let entries = fs::read_dir(&self.w1_root).ok()?;
        for entry in entries.flatten() {
            if !entry.file_name().to_string_lossy().starts_with("28-") {
                continue;
            }
            let raw = fs::read_to_string(entry.path().join("temperature")).ok()?;
            return raw.trim().parse().ok();
        }
        None
    }

    /// Scaled reading from a discoverable ADC utility.
    fn read_adc_volts(&self) -> Option<f32> {
        if !discoverable(self.executor.as_ref(), "gpio") {
            return None;
        }
        let out = self
            .executor
            .run(
                "gpio",
                &["-g".into(), "aread".into(), self.pins.pressure.to_string()],
            )
            .ok()
            .filter(|out| out.status_ok)?;
        let raw: i32 = out.trimmed().parse().ok()?;
        if raw < 0 {
            return None;
        }
        Some(raw as f32 / ADC_MAX_COUNT * ADC_REFERENCE_V)
    }

    /// Binary 0/1 acquisition chain: backend read, CLI probe, direct
    /// value-file read.
    fn read_binary_level(&self) -> Option<bool> {
        match self.backend.read(self.pins.pressure) {
            0 => return Some(false),
            1 => return Some(true),
            _ => {}
        }

        let args = ["-g".into(), "read".into(), self.pins.pressure.to_string()];
        if let Ok(out) = self.executor.run("gpio", &args) {
            if out.status_ok {
                match out.trimmed() {
                    "0" => return Some(false),
                    "1" => return Some(true),
                    _ => {}
                }
            }
        }

        let path = self.gpio_root.join(format!("gpio{}/value", self.pins.pressure));
        if let Ok(raw) = fs::read_to_string(path) {
            match raw.trim() {
                "0" => return Some(false),
                "1" => return Some(true),
                _ => {}
            }
        }

        None
    }

    /// Maps a binary level onto the baseline voltages with jitter.
    fn infer_voltage(high: bool) -> f32 {
        let baseline = if high { HIGH_BASELINE_V } else { LOW_BASELINE_V };
        let jittered = baseline + rand::rng().random_range(-BASELINE_JITTER_V..BASELINE_JITTER_V);
        jittered.clamp(0.0, PRESSURE_MAX_V)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecOutput, MockPrivilegedExecutor};
    use crate::gpio::{BackendKind, SimulatedBackend};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use tempfile::TempDir;

    struct FixedLevelBackend(i32);

    impl GpioBackend for FixedLevelBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Simulated
        }
        fn write(&self, _pin: u8, _high: bool) -> bool {
            true
        }
        fn read(&self, _pin: u8) -> i32 {
            self.0
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

    fn no_tooling() -> Arc<MockPrivilegedExecutor> {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|_, _| {
            Ok(ExecOutput {
                status_ok: false,
                stdout: String::new(),
            })
        });
        Arc::new(mock)
    }

    fn reader_with(
        backend: Arc<dyn GpioBackend>,
        executor: Arc<MockPrivilegedExecutor>,
        w1: &Path,
        gpio: &Path,
    ) -> SensorReader {
        SensorReader::new(backend, executor, pins(), w1.to_path_buf(), gpio.to_path_buf())
    }

    #[test]
    fn temperature_reads_millidegrees_from_probe() {
        let w1 = TempDir::new().unwrap();
        let dev = w1.path().join("28-0316a279c0ff");
        fs::create_dir(&dev).unwrap();
        fs::write(dev.join("temperature"), "152375\n").unwrap();

        let gpio = TempDir::new().unwrap();
        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );

        assert!(reader.probe_available());
        assert_eq!(reader.read_temperature(), 152.375);
    }

    #[test]
    fn temperature_without_probe_simulates_room() {
        let w1 = TempDir::new().unwrap();
        let gpio = TempDir::new().unwrap();
        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );

        assert!(!reader.probe_available());
        for _ in 0..100 {
            let temp = reader.read_temperature();
            assert!((24.0..=26.0).contains(&temp), "simulated temp {temp}");
        }
    }

    #[test]
    fn non_ds18b20_directories_are_ignored() {
        let w1 = TempDir::new().unwrap();
        fs::create_dir(w1.path().join("w1_bus_master1")).unwrap();

        let gpio = TempDir::new().unwrap();
        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );
        assert!(!reader.probe_available());
    }

    #[test]
    fn pressure_prefers_adc_utility_scaling() {
        let w1 = TempDir::new().unwrap();
        let gpio = TempDir::new().unwrap();

        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| {
            let stdout = match (program, args.first().map(String::as_str)) {
                ("which", _) => "/usr/bin/gpio\n".to_string(),
                ("gpio", Some("-g")) if args.iter().any(|a| a == "aread") => "2048\n".to_string(),
                _ => {
                    return Ok(ExecOutput {
                        status_ok: false,
                        stdout: String::new(),
                    });
                }
            };
            Ok(ExecOutput {
                status_ok: true,
                stdout,
            })
        });

        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            Arc::new(mock),
            w1.path(),
            gpio.path(),
        );

        let volts = reader.read_pressure();
        let expected = 2048.0 / 4095.0 * 3.3;
        assert!((volts - expected).abs() < 1e-4, "adc reading {volts}");
    }

    #[test]
    fn pressure_infers_voltage_from_backend_level() {
        let w1 = TempDir::new().unwrap();
        let gpio = TempDir::new().unwrap();

        let high = reader_with(
            Arc::new(FixedLevelBackend(1)),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );
        for _ in 0..50 {
            let volts = high.read_pressure();
            assert!((2.75..=2.85).contains(&volts), "high level mapped to {volts}");
        }

        let low = reader_with(
            Arc::new(FixedLevelBackend(0)),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );
        for _ in 0..50 {
            let volts = low.read_pressure();
            assert!((0.15..=0.25).contains(&volts), "low level mapped to {volts}");
        }
    }

    #[test]
    fn pressure_falls_back_to_direct_file_read() {
        let w1 = TempDir::new().unwrap();
        let gpio = TempDir::new().unwrap();
        let dir = gpio.path().join("gpio0");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("value"), "1\n").unwrap();

        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );

        let volts = reader.read_pressure();
        assert!((2.75..=2.85).contains(&volts), "file level mapped to {volts}");
    }

    #[test]
    fn pressure_with_every_path_failing_is_uniform_over_range() {
        let w1 = TempDir::new().unwrap();
        let gpio = TempDir::new().unwrap();
        let reader = reader_with(
            Arc::new(SimulatedBackend::new()),
            no_tooling(),
            w1.path(),
            gpio.path(),
        );

        let samples: Vec<f32> = (0..1000).map(|_| reader.read_pressure()).collect();

        assert!(samples.iter().all(|v| (0.0..=3.0).contains(v)));
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        assert!((1.2..=1.8).contains(&mean), "mean {mean} not near 1.5");
        assert!(samples.iter().any(|&v| v < 0.5));
        assert!(samples.iter().any(|&v| v > 2.5));
    }
}
