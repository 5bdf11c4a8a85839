//! External process invocation with privilege escalation.
//!
//! Hardware strategies that shell out (the `gpio` utility, sysfs writes
//! that need root) go through the [`PrivilegedExecutor`] seam so tests
//! can simulate permission failures without actual elevated rights.

use std::process::Command;

use anyhow::{Context, Result};
use log::debug;

/// Outcome of an external command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub status_ok: bool,
    pub stdout: String,
}

impl ExecOutput {
    pub fn trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Capability for running external commands, optionally elevated.
///
/// `run` returns `Ok` with `status_ok == false` for a command that ran
/// but exited non-zero; `Err` means the command could not be spawned at
/// all (missing binary, exec failure).
#[cfg_attr(test, mockall::automock)]
pub trait PrivilegedExecutor: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<ExecOutput>;

    /// Retries the command with elevated privilege (`sudo -n`).
    fn run_elevated(&self, program: &str, args: &[String]) -> Result<ExecOutput>;
}

/// Production executor shelling out via `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl SystemExecutor {
    fn exec(program: &str, args: &[String]) -> Result<ExecOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("failed to spawn '{program}'"))?;

        debug!(
            "exec {program} {args:?} -> {}",
            if output.status.success() { "ok" } else { "non-zero" }
        );

        Ok(ExecOutput {
            status_ok: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }
}

impl PrivilegedExecutor for SystemExecutor {
    fn run(&self, program: &str, args: &[String]) -> Result<ExecOutput> {
        Self::exec(program, args)
    }

    fn run_elevated(&self, program: &str, args: &[String]) -> Result<ExecOutput> {
        // -n: never prompt; a password requirement surfaces as failure
        // and the caller falls through to the next strategy.
        let mut sudo_args = vec!["-n".to_string(), program.to_string()];
        sudo_args.extend_from_slice(args);
        Self::exec("sudo", &sudo_args)
    }
}

/// Probes for a binary on PATH.
pub fn discoverable(executor: &dyn PrivilegedExecutor, binary: &str) -> bool {
    executor
        .run("which", &[binary.to_string()])
        .map(|out| out.status_ok)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn system_executor_runs_true() {
        let executor = SystemExecutor;
        let out = executor.run("true", &[]).unwrap();
        assert!(out.status_ok);
    }

    #[test]
    fn system_executor_reports_nonzero_exit() {
        let executor = SystemExecutor;
        let out = executor.run("false", &[]).unwrap();
        assert!(!out.status_ok);
    }

    #[test]
    fn system_executor_captures_stdout() {
        let executor = SystemExecutor;
        let out = executor.run("echo", &["hello".to_string()]).unwrap();
        assert_eq!(out.trimmed(), "hello");
    }

    #[test]
    fn system_executor_missing_binary_is_error() {
        let executor = SystemExecutor;
        assert!(executor.run("definitely-not-a-binary-9f3a", &[]).is_err());
    }

    #[test]
    fn discoverable_true_for_present_binary() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run()
            .withf(|program, args| {
                program == "which" && args.len() == 1 && args[0] == "gpio"
            })
            .returning(|_, _| {
                Ok(ExecOutput {
                    status_ok: true,
                    stdout: "/usr/bin/gpio\n".into(),
                })
            });
        assert!(discoverable(&mock, "gpio"));
    }

    #[test]
    fn discoverable_false_when_probe_fails() {
        let mut mock = MockPrivilegedExecutor::new();
        mock.expect_run()
            .returning(|_, _| anyhow::bail!("no which on this host"));
        assert!(!discoverable(&mock, "gpio"));
    }
}
