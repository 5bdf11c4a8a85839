//! Shared control context.
//!
//! Everything the original kept as module-level globals (board info,
//! pin handles, actuator flags, recording interval) lives in one owned
//! [`ControlContext`] constructed at startup and shared by the services
//! and the D-Bus boundary.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::actuators::Actuators;
use crate::board::{self, BoardProfile};
use crate::event::EventBus;
use crate::executor::{PrivilegedExecutor, SystemExecutor};
use crate::gpio::{self, BackendKind, GpioBackend};
use crate::recorder::{LogRecord, SessionInfo};
use crate::sensing::SensorReader;
use crate::settings::SettingsManager;
use crate::state::{RecordingConfig, SystemState, TimerState};

/// Owned runtime state shared across services.
pub struct ControlContext {
    pub board: BoardProfile,
    pub backend: Arc<dyn GpioBackend>,
    pub actuators: Actuators,
    pub sensors: SensorReader,
    pub system: RwLock<SystemState>,
    pub timer: RwLock<TimerState>,
    pub recording: RwLock<RecordingConfig>,
    pub settings: SettingsManager,
    pub session_id: String,
}

impl ControlContext {
    /// Detects the board, selects the backend and assembles the context.
    /// Runs once at startup; the selection is fixed afterwards.
    pub fn initialize(settings: SettingsManager, event_bus: EventBus) -> Arc<Self> {
        let executor: Arc<dyn PrivilegedExecutor> = Arc::new(SystemExecutor);
        let board = board::detect();
        let gpio_root = board::default_gpio_root();
        let backend = gpio::select_backend(&board, executor.clone(), &gpio_root);

        Self::assemble(
            board,
            backend,
            executor,
            gpio_root,
            board::default_w1_root(),
            settings,
            event_bus,
        )
    }

    /// Assembly with every dependency injectable; tests build contexts
    /// over fixture trees and mock executors through this.
    pub fn assemble(
        board: BoardProfile,
        backend: Arc<dyn GpioBackend>,
        executor: Arc<dyn PrivilegedExecutor>,
        gpio_root: PathBuf,
        w1_root: PathBuf,
        settings: SettingsManager,
        event_bus: EventBus,
    ) -> Arc<Self> {
        let actuators = Actuators::new(
            backend.clone(),
            board.pins,
            gpio_root.clone(),
            event_bus.clone(),
        );
        let sensors = SensorReader::new(backend.clone(), executor, board.pins, w1_root, gpio_root);

        Arc::new(Self {
            board,
            backend,
            actuators,
            sensors,
            system: RwLock::new(SystemState::new()),
            timer: RwLock::new(TimerState::default()),
            recording: RwLock::new(RecordingConfig::default()),
            settings,
            session_id: Uuid::new_v4().to_string(),
        })
    }

    /// True when pin writes cannot reach real hardware.
    pub fn simulation_mode(&self) -> bool {
        !self.board.is_hardware() || self.backend.kind() == BackendKind::Simulated
    }

    /// Header metadata for the session log.
    pub fn session_info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id.clone(),
            board_kind: self.board.kind.to_string(),
            board_model: self.board.model.clone(),
            backend: self.backend.name().to_string(),
            platform: env::consts::OS.to_string(),
            simulated: self.simulation_mode() || !self.sensors.probe_available(),
        }
    }

    /// Storage directories in preference order: validated custom dir,
    /// the user's Downloads folder, the system temp location.
    pub async fn storage_candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(dir) = self.settings.validated_storage_dir().await {
            candidates.push(dir);
        }
        if let Some(home) = env::var_os("HOME") {
            candidates.push(Path::new(&home).join("Downloads"));
        }
        candidates.push(env::temp_dir());
        candidates
    }

    pub async fn start_system(&self) {
        self.system.write().await.set_active(true);
    }

    /// Turns off all actuators; monitoring and recording keep running
    /// so the cool-down is still tracked.
    pub async fn stop_system(&self) {
        self.system.write().await.set_active(false);
        self.actuators.shut_off().await;
    }

    /// Builds one log row from the given samples and the state as of
    /// the start of this tick.
    pub async fn snapshot_record(&self, temperature_c: f32, pressure_v: f32) -> LogRecord {
        let actuators = self.actuators.state().await;
        let system = *self.system.read().await;
        let timer = *self.timer.read().await;

        let timer_status = if !timer.enabled {
            "off"
        } else if timer.running {
            "running"
        } else {
            "paused"
        };

        LogRecord {
            timestamp: Utc::now().to_rfc3339(),
            session_runtime_secs: system.session_runtime_secs(),
            cooking_runtime_secs: system.cooking_runtime_secs(),
            temperature_c,
            target_temp_c: system.target_temp_c,
            pressure_v,
            heaters_on: actuators.heaters_on,
            fan_percent: actuators.fan_speed_percent,
            steam_percent: actuators.steam_level_percent,
            valve_open: actuators.valve_open,
            system_active: system.active,
            timer_status: timer_status.to_string(),
            timer_remaining_secs: timer.remaining_secs,
            simulated: self.simulation_mode() || !self.sensors.probe_available(),
            platform: env::consts::OS.to_string(),
            board: self.board.kind.to_string(),
            backend: self.backend.name().to_string(),
        }
    }

    /// Orderly shutdown: unexport pins; the log file closes with the
    /// recording service.
    pub fn release_resources(&self) {
        self.actuators.release_all();
    }
}
