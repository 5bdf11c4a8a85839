//! Session log file lifecycle and row formatting.
//!
//! One log file per process session, append-only, never rewritten. A
//! `#`-prefixed header block with session metadata is written exactly
//! once, followed by a column header row and one CSV row per sampling
//! tick. If the preferred storage directory rejects writes the recorder
//! silently retries the fallback chain; when even the system temp
//! location fails, recording is disabled and actuation continues.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Immutable session metadata written into the log header.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub board_kind: String,
    pub board_model: String,
    pub backend: String,
    pub platform: String,
    pub simulated: bool,
}

/// One appended row of the continuous data-recording log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub session_runtime_secs: u64,
    pub cooking_runtime_secs: u64,
    pub temperature_c: f32,
    pub target_temp_c: f32,
    pub pressure_v: f32,
    pub heaters_on: bool,
    pub fan_percent: u8,
    pub steam_percent: u8,
    pub valve_open: bool,
    pub system_active: bool,
    pub timer_status: String,
    pub timer_remaining_secs: u32,
    pub simulated: bool,
    pub platform: String,
    pub board: String,
    pub backend: String,
}

const COLUMNS: &str = "Timestamp,Session Runtime (s),Cooking Runtime (s),\
Temperature (°C),Target (°C),Pressure (V),Heating,Fan (%),Steam (%),Valve,\
System,Timer,Timer Remaining (s),Simulated,Platform,Board,Backend";

impl LogRecord {
    pub fn csv_row(&self) -> String {
        format!(
            "{},{},{},{:.2},{:.2},{:.2},{},{},{},{},{},{},{},{},{},{},{}",
            self.timestamp,
            self.session_runtime_secs,
            self.cooking_runtime_secs,
            self.temperature_c,
            self.target_temp_c,
            self.pressure_v,
            if self.heaters_on { "ON" } else { "OFF" },
            self.fan_percent,
            self.steam_percent,
            if self.valve_open { "OPEN" } else { "CLOSED" },
            if self.system_active { "ACTIVE" } else { "STANDBY" },
            self.timer_status,
            self.timer_remaining_secs,
            if self.simulated { "yes" } else { "no" },
            self.platform,
            self.board,
            self.backend,
        )
    }
}

/// Owns the open log file exclusively for the process lifetime.
pub struct Recorder {
    file: Option<File>,
    path: Option<PathBuf>,
}

impl Recorder {
    /// Tries each candidate directory in order; a recorder with no file
    /// (recording disabled) is the terminal fallback.
    pub fn initialize(candidates: &[PathBuf], session: &SessionInfo) -> Self {
        for dir in candidates {
            match Self::create_in(dir, session) {
                Ok(recorder) => {
                    info!(
                        "Data recording initialized, log file: {}",
                        recorder.path.as_deref().unwrap_or(Path::new("?")).display()
                    );
                    return recorder;
                }
                Err(e) => {
                    warn!("Cannot record under {}: {e}", dir.display());
                }
            }
        }

        warn!("No writable storage location, recording disabled");
        Self {
            file: None,
            path: None,
        }
    }

    fn create_in(dir: &Path, session: &SessionInfo) -> Result<Self> {
        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S");
        let path = dir.join(format!("oven_data_{stamp}.csv"));

        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;

        writeln!(file, "# Session: {}", session.session_id)?;
        writeln!(
            file,
            "# Board: {} ({}), Backend: {}, Platform: {}",
            session.board_model, session.board_kind, session.backend, session.platform
        )?;
        writeln!(
            file,
            "# Simulation mode: {}",
            if session.simulated { "yes" } else { "no" }
        )?;
        writeln!(file, "{COLUMNS}")?;
        file.flush()?;

        Ok(Self {
            file: Some(file),
            path: Some(path),
        })
    }

    pub fn enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends one row; a silent no-op when recording is disabled.
    pub fn append(&mut self, record: &LogRecord) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        writeln!(file, "{}", record.csv_row()).context("failed to append log row")?;
        file.flush().context("failed to flush log row")
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.sync_all();
        }
    }
}
