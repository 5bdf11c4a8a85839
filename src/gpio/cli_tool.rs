//! Privileged command-line GPIO strategy (WiringPi-style `gpio` tool).

use std::sync::Arc;

use log::{debug, warn};

use crate::executor::{PrivilegedExecutor, discoverable};
use crate::gpio::{BackendKind, GpioBackend};

const TOOL: &str = "gpio";

/// Backend driving pins through the `gpio` utility.
///
/// The tool runs with BCM numbering (`-g`). Writes and reads that fail
/// are retried once through the elevated executor before being reported
/// as failed.
pub struct CliToolBackend {
    executor: Arc<dyn PrivilegedExecutor>,
}

impl CliToolBackend {
    /// Probes for the utility and prepares every output pin.
    ///
    /// If the tool is missing but `apt-get` is present, one elevated
    /// install attempt is made before giving up.
    pub fn probe(executor: Arc<dyn PrivilegedExecutor>, outputs: &[u8]) -> Option<Self> {
        if !discoverable(executor.as_ref(), TOOL) && !Self::try_install(executor.as_ref()) {
            return None;
        }

        let backend = Self { executor };
        for &pin in outputs {
            if !backend.set_mode(pin, "out") {
                warn!("gpio tool could not set pin {pin} to output");
                return None;
            }
        }
        Some(backend)
    }

    fn try_install(executor: &dyn PrivilegedExecutor) -> bool {
        if !discoverable(executor, "apt-get") {
            return false;
        }
        debug!("gpio tool missing, attempting package install");
        let installed = executor
            .run_elevated(
                "apt-get",
                &["install".into(), "-y".into(), "wiringpi".into()],
            )
            .map(|out| out.status_ok)
            .unwrap_or(false);
        installed && discoverable(executor, TOOL)
    }

    fn set_mode(&self, pin: u8, mode: &str) -> bool {
        self.invoke(&["-g".into(), "mode".into(), pin.to_string(), mode.into()])
            .is_some()
    }

    /// Runs the tool, once unprivileged and once elevated on failure.
    fn invoke(&self, args: &[String]) -> Option<String> {
        match self.executor.run(TOOL, args) {
            Ok(out) if out.status_ok => return Some(out.stdout),
            Ok(_) | Err(_) => {}
        }
        match self.executor.run_elevated(TOOL, args) {
            Ok(out) if out.status_ok => Some(out.stdout),
            Ok(_) | Err(_) => None,
        }
    }

    /// Analog read through the tool's ADC support, where present.
    pub fn analog_read(&self, channel: u8) -> Option<i32> {
        self.invoke(&["-g".into(), "aread".into(), channel.to_string()])
            .and_then(|stdout| stdout.trim().parse().ok())
    }
}

impl GpioBackend for CliToolBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CliTool
    }

    fn write(&self, pin: u8, high: bool) -> bool {
        let value = if high { "1" } else { "0" };
        self.invoke(&["-g".into(), "write".into(), pin.to_string(), value.into()])
            .is_some()
    }

    fn read(&self, pin: u8) -> i32 {
        self.invoke(&["-g".into(), "read".into(), pin.to_string()])
            .and_then(|stdout| stdout.trim().parse().ok())
            .unwrap_or(-1)
    }

    fn release(&self, _pin: u8) {
        // The utility holds no per-pin state.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecOutput, MockPrivilegedExecutor};
    use pretty_assertions::assert_eq;

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

    fn has(args: &[String], wanted: &str) -> bool {
        args.iter().any(|a| a == wanted)
    }

    #[test]
    fn probe_fails_when_tool_and_installer_are_absent() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|_, _| failed());

        assert!(CliToolBackend::probe(Arc::new(mock), &[17]).is_none());
    }

    #[test]
    fn probe_installs_tool_when_apt_is_available() {
        let mut mock = MockPrivilegedExecutor::new();
        let mut which_gpio_calls = 0;
        mock.expect_run().returning(move |program, args| {
            match (program, args.first().map(String::as_str)) {
                ("which", Some("gpio")) => {
                    which_gpio_calls += 1;
                    // Missing before the install, present after.
                    if which_gpio_calls == 1 {
                        failed()
                    } else {
                        ok("/usr/bin/gpio\n")
                    }
                }
                ("which", Some("apt-get")) => ok("/usr/bin/apt-get\n"),
                ("gpio", _) => ok(""),
                _ => failed(),
            }
        });
        mock.expect_run_elevated()
            .returning(|program, _| match program {
                "apt-get" => ok(""),
                _ => failed(),
            });

        assert!(CliToolBackend::probe(Arc::new(mock), &[17, 18]).is_some());
    }

    #[test]
    fn write_retries_elevated_on_permission_failure() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| match program {
            "which" => ok("/usr/bin/gpio\n"),
            "gpio" if has(args, "mode") => ok(""),
            // Unprivileged writes rejected.
            _ => failed(),
        });
        mock.expect_run_elevated()
            .returning(|program, _| match program {
                "gpio" => ok(""),
                _ => failed(),
            });

        let backend = CliToolBackend::probe(Arc::new(mock), &[17]).unwrap();
        assert!(backend.write(17, true));
    }

    #[test]
    fn read_parses_tool_output() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| match program {
            "which" => ok("/usr/bin/gpio\n"),
            "gpio" if has(args, "mode") => ok(""),
            "gpio" if has(args, "read") => ok("1\n"),
            _ => failed(),
        });

        let backend = CliToolBackend::probe(Arc::new(mock), &[17]).unwrap();
        assert_eq!(backend.read(17), 1);
    }

    #[test]
    fn read_returns_sentinel_when_both_attempts_fail() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| match program {
            "which" => ok("/usr/bin/gpio\n"),
            "gpio" if has(args, "mode") => ok(""),
            _ => failed(),
        });
        mock.expect_run_elevated().returning(|_, _| failed());

        let backend = CliToolBackend::probe(Arc::new(mock), &[17]).unwrap();
        assert_eq!(backend.read(17), -1);
    }

    #[test]
    fn analog_read_parses_raw_count() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run().returning(|program, args| match program {
            "which" => ok("/usr/bin/gpio\n"),
            "gpio" if has(args, "mode") => ok(""),
            "gpio" if has(args, "aread") => ok("2048\n"),
            _ => failed(),
        });

        let backend = CliToolBackend::probe(Arc::new(mock), &[17]).unwrap();
        assert_eq!(backend.analog_read(0), Some(2048));
    }
}
