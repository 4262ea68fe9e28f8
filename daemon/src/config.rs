use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Expanded against `$HOME` at startup.
pub const DEFAULT_SCRIPT_PATH: &str = "~/Scripts/clipboard_ytdlp.sh";
pub const DEFAULT_LIVENESS_POLL_SECS: u64 = 2;
pub const MAX_LIVENESS_POLL_SECS: u64 = 3600;
pub const DEFAULT_TOOLTIP: &str = "YouTube Clipboard Watcher";
pub const DEFAULT_ICON_NAME: &str = "im-youtube";

/// Root configuration structure. Deserialized from `$XDG_CONFIG_HOME/clipwatch/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub tray: TrayConfig,
}

/// The script to supervise.
#[derive(Debug, Deserialize)]
pub struct ScriptConfig {
    /// Path to the executable. A leading `~/` is expanded at startup.
    #[serde(default = "default_script_path")]
    pub path: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SCRIPT_PATH.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MonitorConfig {
    /// How often to check whether the script exited on its own, in seconds.
    /// 0 disables the check. Clamped to [`MAX_LIVENESS_POLL_SECS`].
    #[serde(default = "default_liveness_poll_secs")]
    pub liveness_poll_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            liveness_poll_secs: DEFAULT_LIVENESS_POLL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Returns the liveness polling period, or `None` when polling is disabled.
    pub fn liveness_period(&self) -> Option<Duration> {
        match self.liveness_poll_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs.min(MAX_LIVENESS_POLL_SECS))),
        }
    }
}

/// Presentation hints passed through to the tray front-end.
#[derive(Debug, Deserialize, Clone)]
pub struct TrayConfig {
    #[serde(default = "default_tooltip")]
    pub tooltip: String,
    /// Freedesktop icon theme name.
    #[serde(default = "default_icon_name")]
    pub icon_name: String,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            tooltip: DEFAULT_TOOLTIP.to_string(),
            icon_name: DEFAULT_ICON_NAME.to_string(),
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn default_script_path() -> String {
    DEFAULT_SCRIPT_PATH.to_string()
}

fn default_liveness_poll_secs() -> u64 {
    DEFAULT_LIVENESS_POLL_SECS
}

fn default_tooltip() -> String {
    DEFAULT_TOOLTIP.to_string()
}

fn default_icon_name() -> String {
    DEFAULT_ICON_NAME.to_string()
}
