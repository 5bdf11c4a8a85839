//! Persisted daemon settings.
//!
//! A small YAML key-value document holding the operator's choices that
//! must survive restarts, currently the custom log storage directory.
//! Read once at startup; the stored directory is used only if it still
//! exists and passes a write-access probe.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const PROBE_FILE: &str = ".ovend_write_probe";

/// On-disk settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Operator-selected directory for session log files.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

/// Loads, validates and persists [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsManager {
    /// Wraps already-parsed settings; used by tests and by `load`.
    pub fn new(settings: Settings, path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
        }
    }

    /// Loads settings from `path` or the standard locations.
    ///
    /// A missing document is not an error; defaults apply until the
    /// first save.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => locate_settings(),
        };

        let settings = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings at {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("failed to parse settings at {}", path.display()))?
        } else {
            info!("No settings document at {}, using defaults", path.display());
            Settings::default()
        };

        Ok(Self::new(settings, path))
    }

    pub async fn clone_settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Stored storage directory, only if it still passes validation.
    pub async fn validated_storage_dir(&self) -> Option<PathBuf> {
        let dir = self.settings.read().await.storage_dir.clone()?;
        if validate_storage_dir(&dir) {
            Some(dir)
        } else {
            warn!(
                "Stored storage directory {} no longer usable, ignoring",
                dir.display()
            );
            None
        }
    }

    /// Validates and persists a new storage directory.
    ///
    /// Invalid paths are rejected without side effects.
    pub async fn set_storage_dir(&self, dir: PathBuf) -> Result<()> {
        if !validate_storage_dir(&dir) {
            anyhow::bail!(
                "storage directory {} does not exist or is not writable",
                dir.display()
            );
        }

        self.settings.write().await.storage_dir = Some(dir);
        self.save().await
    }

    /// Writes the current settings document to disk.
    pub async fn save(&self) -> Result<()> {
        let settings = self.settings.read().await.clone();
        let raw = serde_yaml::to_string(&settings).context("failed to serialize settings")?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write settings at {}", self.path.display()))
    }
}

/// Existence plus a real write-access probe.
fn validate_storage_dir(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let probe = dir.join(PROBE_FILE);
    match fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

fn locate_settings() -> PathBuf {
    if let Ok(env_path) = env::var("OVEND_SETTINGS") {
        return PathBuf::from(env_path);
    }

    if let Some(cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        return cfg_dir.join("ovend/settings.yml");
    }

    PathBuf::from("/etc/ovend/settings.yml")
}
