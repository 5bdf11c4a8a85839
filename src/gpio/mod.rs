//! GPIO backend abstraction and cascading strategy selection.
//!
//! Every board profile gets an ordered chain of control strategies:
//! privileged CLI tool, vendor library, generic character-device
//! library, raw sysfs export protocol, simulated no-op. Constructors
//! are evaluated lazily and the first one that succeeds wins; the
//! simulated backend is the guaranteed final element, so selection
//! never fails. The choice is made once and is fixed for the process
//! lifetime.

pub mod chardev;
pub mod cli_tool;
pub mod rppal_backend;
pub mod simulated;
pub mod sysfs;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::board::{BoardKind, BoardProfile};
use crate::executor::PrivilegedExecutor;

pub use chardev::CharDevBackend;
pub use cli_tool::CliToolBackend;
pub use rppal_backend::RppalBackend;
pub use simulated::SimulatedBackend;
pub use sysfs::SysfsBackend;

/// Concrete mechanism behind the active backend handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// WiringPi-style `gpio` command-line utility.
    CliTool,
    /// Vendor GPIO library (rppal, Raspberry Pi family).
    VendorLib,
    /// Generic character-device library (gpio-cdev).
    CharDev,
    /// Raw `/sys/class/gpio` export protocol.
    Sysfs,
    /// No-op stand-in; logs intent, reads return a sentinel.
    Simulated,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CliTool => "gpio-cli",
            Self::VendorLib => "rppal",
            Self::CharDev => "gpio-cdev",
            Self::Sysfs => "sysfs",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform handle over a pin-control strategy.
///
/// Calls are synchronous and local; they never block beyond OS-level
/// I/O. A handle that starts failing degrades to `false`/sentinel
/// returns, it is never re-negotiated into a different backend.
pub trait GpioBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Drives a pin; returns whether the hardware acknowledged the write.
    fn write(&self, pin: u8, high: bool) -> bool;

    /// Reads a pin level; -1 when the value could not be acquired.
    fn read(&self, pin: u8) -> i32;

    /// Relinquishes any OS resource held for the pin.
    fn release(&self, pin: u8);

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Selects the control strategy for the detected board.
///
/// `gpio_root` is the sysfs GPIO directory (injectable for tests); the
/// executor backs every strategy that shells out.
pub fn select_backend(
    profile: &BoardProfile,
    executor: Arc<dyn PrivilegedExecutor>,
    gpio_root: &Path,
) -> Arc<dyn GpioBackend> {
    let outputs = output_pins(profile);

    type Ctor = (&'static str, Box<dyn Fn() -> Option<Arc<dyn GpioBackend>>>);
    let mut chain: Vec<Ctor> = Vec::new();

    if profile.kind != BoardKind::Unknown {
        let exec = executor.clone();
        let outs = outputs.clone();
        chain.push((
            "gpio-cli",
            Box::new(move || {
                CliToolBackend::probe(exec.clone(), &outs)
                    .map(|b| Arc::new(b) as Arc<dyn GpioBackend>)
            }),
        ));

        if profile.kind == BoardKind::RaspberryPi {
            let outs = outputs.clone();
            chain.push((
                "rppal",
                Box::new(move || {
                    RppalBackend::probe(&outs).map(|b| Arc::new(b) as Arc<dyn GpioBackend>)
                }),
            ));
        }

        let outs = outputs.clone();
        chain.push((
            "gpio-cdev",
            Box::new(move || {
                CharDevBackend::probe(&outs).map(|b| Arc::new(b) as Arc<dyn GpioBackend>)
            }),
        ));

        let exec = executor.clone();
        let outs = outputs.clone();
        let root = gpio_root.to_path_buf();
        chain.push((
            "sysfs",
            Box::new(move || {
                SysfsBackend::probe(root.clone(), exec.clone(), &outs)
                    .map(|b| Arc::new(b) as Arc<dyn GpioBackend>)
            }),
        ));
    }

    for (label, ctor) in &chain {
        if let Some(backend) = ctor() {
            info!("Selected GPIO backend: {}", backend.name());
            return backend;
        }
        warn!("GPIO strategy '{label}' unavailable, falling through");
    }

    info!("No hardware GPIO strategy available, using simulated backend");
    Arc::new(SimulatedBackend::new())
}

/// All pins driven as outputs for this profile.
fn output_pins(profile: &BoardProfile) -> Vec<u8> {
    let pins = &profile.pins;
    let mut out = vec![pins.fan];
    out.extend_from_slice(&pins.heaters);
    out.push(pins.valve);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::classify;
    use crate::executor::{ExecOutput, MockPrivilegedExecutor};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn ok(stdout: &str) -> anyhow::Result<ExecOutput> {
        Ok(ExecOutput {
            status_ok: true,
            stdout: stdout.to_string(),
        })
    }

    fn failed() -> anyhow::Result<ExecOutput> {
        Ok(ExecOutput {
            status_ok: false,
            stdout: String::new(),
        })
    }

    #[test]
    fn unknown_profile_terminates_in_simulated_backend() {
        let root = TempDir::new().unwrap();
        let profile = classify(root.path(), "x86_64");
        let executor = Arc::new(MockPrivilegedExecutor::new());

        let backend = select_backend(&profile, executor, root.path());
        assert_eq!(backend.kind(), BackendKind::Simulated);
    }

    #[test]
    fn cli_tool_selected_first_when_utility_is_present() {
        let root = TempDir::new().unwrap();
        let fixture = TempDir::new().unwrap();
        std::fs::create_dir_all(fixture.path().join("sys/firmware/devicetree/base")).unwrap();
        std::fs::write(
            fixture.path().join("sys/firmware/devicetree/base/model"),
            "Raspberry Pi 3 Model B",
        )
        .unwrap();
        let profile = classify(fixture.path(), "arm");

        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| match program {
            "which" => ok("/usr/bin/gpio\n"),
            "gpio" if args.iter().any(|a| a == "mode") => ok(""),
            _ => failed(),
        });

        let backend = select_backend(&profile, Arc::new(mock), root.path());
        assert_eq!(backend.kind(), BackendKind::CliTool);
    }

    #[test]
    fn hardware_profile_with_nothing_available_degrades_to_simulated() {
        let root = TempDir::new().unwrap();
        let fixture = TempDir::new().unwrap();
        std::fs::create_dir_all(fixture.path().join("sys/class/sunxi_info")).unwrap();
        std::fs::write(fixture.path().join("sys/class/sunxi_info/sys_info"), "x").unwrap();
        let profile = classify(fixture.path(), "aarch64");

        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|_, _| failed());
        mock.expect_run_elevated().returning(|_, _| failed());

        // Empty gpio root: sysfs probe finds no export file either.
        let backend = select_backend(&profile, Arc::new(mock), root.path());
        assert_eq!(backend.kind(), BackendKind::Simulated);
    }

    #[test]
    fn output_pins_cover_fan_heaters_and_valve() {
        let fixture = TempDir::new().unwrap();
        let profile = classify(fixture.path(), "aarch64");
        let pins = output_pins(&profile);
        assert_eq!(pins, vec![17, 22, 23, 24, 18]);
    }
}
