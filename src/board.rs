//! Board detection and pin mapping.
//!
//! Classifies the host into one of a closed set of board profiles and
//! yields the static pin map for that profile. Detection runs once at
//! process start; an unrecognized host is a valid terminal state
//! (simulation-only), never an error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

/// Device-tree model marker checked for the Raspberry Pi family.
const DEVICETREE_MODEL: &str = "sys/firmware/devicetree/base/model";

/// Vendor-specific system info path present on Allwinner (Orange Pi) boards.
const SUNXI_INFO: &str = "sys/class/sunxi_info/sys_info";

const CPUINFO: &str = "proc/cpuinfo";

/// Supported board families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoardKind {
    RaspberryPi,
    OrangePi,
    GenericArm,
    /// No recognizable hardware markers; all I/O is simulated.
    Unknown,
}

impl BoardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RaspberryPi => "raspberry-pi",
            Self::OrangePi => "orange-pi",
            Self::GenericArm => "generic-arm",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BoardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from logical device roles to board-native pin identifiers.
///
/// One map per board family; looked up, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    /// Fan control output.
    pub fan: u8,
    /// Heater bank outputs, all driven identically.
    pub heaters: [u8; 3],
    /// Steam solenoid valve output.
    pub valve: u8,
    /// DS18B20 one-wire data pin.
    pub temp_probe: u8,
    /// Binary pressure input (ADC channel where one exists).
    pub pressure: u8,
}

/// BCM numbering used by the Raspberry Pi and as the generic fallback.
const RPI_PINS: PinMap = PinMap {
    fan: 17,
    heaters: [22, 23, 24],
    valve: 18,
    temp_probe: 4,
    pressure: 0,
};

/// Orange Pi Zero 3 mapping (H618 SoC, PC-bank offsets).
const ORANGEPI_PINS: PinMap = PinMap {
    fan: 7,
    heaters: [8, 9, 10],
    valve: 6,
    temp_probe: 3,
    pressure: 0,
};

/// Detected host board, immutable after detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    pub kind: BoardKind,
    pub model: String,
    pub pins: PinMap,
}

impl BoardProfile {
    /// True for any profile that can drive real pins.
    pub fn is_hardware(&self) -> bool {
        self.kind != BoardKind::Unknown
    }
}

/// Classifies the host, probing the real filesystem root.
pub fn detect() -> BoardProfile {
    let profile = classify(Path::new("/"), std::env::consts::ARCH);
    info!(
        "Detected board: {} ({}), pins fan={} heaters={:?} valve={}",
        profile.model, profile.kind, profile.pins.fan, profile.pins.heaters, profile.pins.valve
    );
    profile
}

/// Pure classification over an arbitrary filesystem root and CPU arch.
///
/// Probe order: device-tree model marker, then the sunxi info path
/// (disambiguated by CPU identifier), then a generic ARM fallback,
/// then unknown.
pub fn classify(root: &Path, arch: &str) -> BoardProfile {
    if let Ok(model) = fs::read_to_string(root.join(DEVICETREE_MODEL)) {
        if model.to_lowercase().contains("raspberry pi") {
            return BoardProfile {
                kind: BoardKind::RaspberryPi,
                model: model.trim_end_matches('\0').trim().to_string(),
                pins: RPI_PINS,
            };
        }
    }

    if root.join(SUNXI_INFO).exists() {
        let model = match fs::read_to_string(root.join(CPUINFO)) {
            Ok(cpuinfo) if cpuinfo.contains("H618") => "Orange Pi Zero 3",
            Ok(_) => "Orange Pi (Generic)",
            Err(_) => "Orange Pi (Unknown Model)",
        };
        return BoardProfile {
            kind: BoardKind::OrangePi,
            model: model.to_string(),
            pins: ORANGEPI_PINS,
        };
    }

    if arch == "arm" || arch == "aarch64" {
        return BoardProfile {
            kind: BoardKind::GenericArm,
            model: "Generic ARM SBC".to_string(),
            pins: RPI_PINS,
        };
    }

    BoardProfile {
        kind: BoardKind::Unknown,
        model: "unknown".to_string(),
        // Pin values are irrelevant in simulation; keep the generic table.
        pins: RPI_PINS,
    }
}

/// Standard one-wire device directory on a real root.
pub fn default_w1_root() -> PathBuf {
    PathBuf::from("/sys/bus/w1/devices")
}

/// Standard sysfs GPIO directory on a real root.
pub fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}
