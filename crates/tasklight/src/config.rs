use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tasklight_core::{Code, HotkeySpec, Modifier};

/// Size and title of one of the launcher's windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The global hotkey that toggles the input window
    pub hotkey: HotkeySpec,
    /// Hide the input window when it loses focus
    pub hide_on_blur: bool,
    /// Show the input window as soon as the app starts
    pub show_on_startup: bool,
    pub main_window: WindowConfig,
    pub settings_window: WindowConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hotkey: HotkeySpec::new([Modifier::Ctrl], Code::Space),
            hide_on_blur: true,
            show_on_startup: true,
            main_window: WindowConfig {
                title: "Tasklight".into(),
                width: 600.0,
                height: 100.0,
            },
            settings_window: WindowConfig {
                title: "Tasklight Settings".into(),
                width: 400.0,
                height: 550.0,
            },
        }
    }
}

impl Config {
    pub fn from_ron(s: &str) -> Result<Self> {
        Ok(ron::from_str(s)?)
    }

    /// Load the config file, falling back to defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        Self::from_ron(&text).with_context(|| format!("Invalid config file: {path:?}"))
    }

    /// `~/Library/Application Support/tasklight/config.ron` on macOS.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasklight")
            .join("config.ron")
    }
}
