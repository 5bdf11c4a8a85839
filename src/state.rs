//! Runtime state shared between the actuator controller, the recording
//! loop and the UI boundary.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Logical actuator roles addressed by UI commands and change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActuatorRole {
    Fan,
    Heaters,
    Valve,
    Steam,
}

impl ActuatorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Heaters => "heaters",
            Self::Valve => "valve",
            Self::Steam => "steam",
        }
    }
}

impl fmt::Display for ActuatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current actuator settings, mutated only by the actuator controller.
///
/// Updated optimistically: the values reflect commanded intent even when
/// the underlying hardware write reported failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorState {
    pub fan_speed_percent: u8,
    pub heaters_on: bool,
    pub valve_open: bool,
    pub steam_level_percent: u8,
}

/// Whole-system run state.
///
/// `heaters_on` and `active` are deliberately decoupled: heaters can be
/// forced off while the sensing/recording session continues, so cooling
/// is still tracked after shutdown.
#[derive(Debug, Clone, Copy)]
pub struct SystemState {
    pub active: bool,
    pub target_temp_c: f32,
    /// Latest temperature, probe-read or simulator-driven.
    pub current_temp_c: f32,
    pub session_start: Instant,
    /// Set on the false→true `active` transition, cleared on true→false.
    pub active_since: Option<Instant>,
}

impl SystemState {
    pub fn new() -> Self {
        Self {
            active: false,
            target_temp_c: 150.0,
            current_temp_c: 25.0,
            session_start: Instant::now(),
            active_since: None,
        }
    }

    pub fn session_runtime_secs(&self) -> u64 {
        self.session_start.elapsed().as_secs()
    }

    /// Elapsed cooking time; zero while the system is inactive.
    pub fn cooking_runtime_secs(&self) -> u64 {
        self.active_since
            .map(|since| since.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn set_active(&mut self, active: bool) {
        if active && !self.active {
            self.active_since = Some(Instant::now());
        } else if !active && self.active {
            self.active_since = None;
        }
        self.active = active;
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown timer mirror. The UI owns the tick; this layer only stores
/// and logs the values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub enabled: bool,
    pub running: bool,
    pub remaining_secs: u32,
    pub total_secs: u32,
}

/// Recording loop configuration.
#[derive(Debug, Clone, Copy)]
pub struct RecordingConfig {
    pub interval_secs: u64,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self { interval_secs: 5 }
    }
}
