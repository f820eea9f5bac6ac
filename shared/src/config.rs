// Persisted settings: JSON config file and the settings store trait.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;
use crate::identity::StableKey;

/// Monitors the user wants blacked out. `None` means "every non-primary
/// display"; `Some` of an empty set means "none".
pub type Selection = Option<BTreeSet<StableKey>>;

/// Application configuration stored in JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Persisted as `null` when absent and `[]` when explicitly empty, so
    /// both states survive a round trip.
    #[serde(default)]
    pub selected_monitors: Selection,
    /// Overlay opacity in percent. Out-of-range numbers in the file are
    /// clamped instead of failing the whole document.
    #[serde(default = "default_opacity", deserialize_with = "clamped_percent")]
    pub opacity: u8,
    #[serde(default)]
    pub click_through: bool,
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_opacity() -> u8 {
    100
}

fn clamped_percent<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            selected_monitors: None,
            opacity: default_opacity(),
            click_through: false,
            debug_logging: false,
        }
    }
}

pub fn config_dir() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("Blackout")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Read the config at `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn save_config(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(config)?;
    fs::write(path, data)?;
    Ok(())
}

/// Key/value persistence consumed by the blackout service.
pub trait SettingsStore {
    fn load_selection(&self) -> Selection;
    fn save_selection(&mut self, selection: &Selection);
    fn load_opacity(&self) -> i32;
    fn save_opacity(&mut self, percent: i32);
    fn load_click_through(&self) -> bool;
    fn save_click_through(&mut self, enabled: bool);
}

/// [`SettingsStore`] backed by a JSON file. Every save rewrites the file.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    config: AppConfig,
}

impl JsonSettingsStore {
    /// Open the store at `path`. An unreadable or corrupt file is logged
    /// and replaced by the defaults on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = load_config(&path).unwrap_or_else(|e| {
            warn!("ignoring unreadable settings at {}: {e}", path.display());
            AppConfig::default()
        });
        Self { path, config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn persist(&self) {
        if let Err(e) = save_config(&self.path, &self.config) {
            warn!("failed to save settings to {}: {e}", self.path.display());
        }
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load_selection(&self) -> Selection {
        self.config.selected_monitors.clone()
    }

    fn save_selection(&mut self, selection: &Selection) {
        self.config.selected_monitors = selection.clone();
        self.persist();
    }

    fn load_opacity(&self) -> i32 {
        i32::from(self.config.opacity)
    }

    fn save_opacity(&mut self, percent: i32) {
        self.config.opacity = percent.clamp(0, 100) as u8;
        self.persist();
    }

    fn load_click_through(&self) -> bool {
        self.config.click_through
    }

    fn save_click_through(&mut self, enabled: bool) {
        self.config.click_through = enabled;
        self.persist();
    }
}
