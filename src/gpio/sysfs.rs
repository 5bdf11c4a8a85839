//! Raw sysfs export/unexport GPIO strategy.
//!
//! Writes the pin number to the `export` control file, sets `direction`,
//! then reads/writes the per-pin `value` file. Any step that fails with
//! a permission error is retried once through the elevated executor
//! before the operation is reported as failed.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::warn;

use crate::executor::PrivilegedExecutor;
use crate::gpio::{BackendKind, GpioBackend};

/// Delay for the kernel to materialize the per-pin directory after export.
const EXPORT_SETTLE: Duration = Duration::from_millis(100);

pub struct SysfsBackend {
    root: PathBuf,
    executor: Arc<dyn PrivilegedExecutor>,
    exported: Mutex<HashSet<u8>>,
}

impl SysfsBackend {
    /// Exports and configures every output pin; `None` if the protocol
    /// is not present at `root` or any pin cannot be prepared.
    pub fn probe(
        root: PathBuf,
        executor: Arc<dyn PrivilegedExecutor>,
        outputs: &[u8],
    ) -> Option<Self> {
        if !root.join("export").exists() {
            return None;
        }

        let backend = Self {
            root,
            executor,
            exported: Mutex::new(HashSet::new()),
        };
        for &pin in outputs {
            if !backend.prepare(pin, "out") {
                warn!("sysfs could not prepare gpio{pin} as output");
                return None;
            }
        }
        Some(backend)
    }

    fn pin_dir(&self, pin: u8) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }

    /// Exports the pin (if not already visible) and sets its direction.
    fn prepare(&self, pin: u8, direction: &str) -> bool {
        if !self.pin_dir(pin).exists() {
            let export = self.root.join("export");
            if !self.write_control(&export, &pin.to_string()) {
                return false;
            }
            thread::sleep(EXPORT_SETTLE);
            if !self.pin_dir(pin).exists() {
                return false;
            }
        }

        let ok = self.write_control(&self.pin_dir(pin).join("direction"), direction);
        if ok {
            if let Ok(mut exported) = self.exported.lock() {
                exported.insert(pin);
            }
        }
        ok
    }

    /// Writes a control file, escalating once on failure.
    fn write_control(&self, path: &std::path::Path, contents: &str) -> bool {
        if fs::write(path, contents).is_ok() {
            return true;
        }
        let cmd = format!("echo {} > {}", contents, path.display());
        self.executor
            .run_elevated("sh", &["-c".to_string(), cmd])
            .map(|out| out.status_ok)
            .unwrap_or(false)
    }

    fn read_value_file(&self, pin: u8) -> Option<i32> {
        let path = self.pin_dir(pin).join("value");
        if let Ok(raw) = fs::read_to_string(&path) {
            return raw.trim().parse().ok();
        }
        self.executor
            .run_elevated("cat", &[path.display().to_string()])
            .ok()
            .filter(|out| out.status_ok)
            .and_then(|out| out.trimmed().parse().ok())
    }
}

impl GpioBackend for SysfsBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sysfs
    }

    fn write(&self, pin: u8, high: bool) -> bool {
        let already_prepared = self
            .exported
            .lock()
            .map(|exported| exported.contains(&pin))
            .unwrap_or(false);
        if !already_prepared && !self.prepare(pin, "out") {
            return false;
        }
        self.write_control(
            &self.pin_dir(pin).join("value"),
            if high { "1" } else { "0" },
        )
    }

    fn read(&self, pin: u8) -> i32 {
        if !self.pin_dir(pin).exists() && !self.prepare(pin, "in") {
            return -1;
        }
        self.read_value_file(pin).unwrap_or(-1)
    }

    fn release(&self, pin: u8) {
        if let Ok(mut exported) = self.exported.lock() {
            if !exported.remove(&pin) {
                return;
            }
        }
        if !self.write_control(&self.root.join("unexport"), &pin.to_string()) {
            warn!("failed to unexport gpio{pin}");
        }
    }
}

/// One-shot value write bypassing any backend handle.
///
/// Used as the actuator controller's last-resort retry when the active
/// backend reports a failed write.
pub fn direct_write(root: &std::path::Path, pin: u8, high: bool) -> bool {
    fs::write(
        root.join(format!("gpio{pin}/value")),
        if high { "1" } else { "0" },
    )
    .is_ok()
}
