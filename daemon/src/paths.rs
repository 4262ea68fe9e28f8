/// Canonical file paths for clipwatch data files.
///
///   - config.toml  `$XDG_CONFIG_HOME/clipwatch/` (default `~/.config/clipwatch/`).
///     Read once by the daemon at startup.
///   - status.toml  `$XDG_STATE_HOME/clipwatch/` (default `~/.local/state/clipwatch/`).
///     Written by the daemon, read by a tray front-end.
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "clipwatch";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";

/// Returns the full path to the config file.
pub fn config_file_path() -> Result<PathBuf> {
    let dir = xdg_dir(env_path("XDG_CONFIG_HOME"), env_path("HOME"), ".config")?;
    Ok(dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Returns the full path to the status file.
pub fn status_file_path() -> Result<PathBuf> {
    let dir = xdg_dir(env_path("XDG_STATE_HOME"), env_path("HOME"), ".local/state")?;
    Ok(dir.join(APP_DIR_NAME).join(STATUS_FILE_NAME))
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).map(PathBuf::from)
}

/// Picks the XDG base directory: the variable if it holds an absolute path,
/// otherwise `$HOME/<fallback>`.
fn xdg_dir(xdg: Option<PathBuf>, home: Option<PathBuf>, fallback: &str) -> Result<PathBuf> {
    if let Some(dir) = xdg.filter(|d| d.is_absolute()) {
        return Ok(dir);
    }
    match home {
        Some(home) => Ok(home.join(Path::new(fallback))),
        None => bail!("Neither XDG base directory nor HOME is set"),
    }
}
