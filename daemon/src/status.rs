use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::config::TrayConfig;
use crate::surface::{StatusSurface, ToggleAction};

/// Supervisor state as seen by a tray front-end.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    /// Validating the script; no label has been set yet.
    Starting,
    /// The script is running; the toggle offers "Pause Monitoring".
    Running,
    /// The script is stopped; the toggle offers "Resume Monitoring".
    Paused,
    /// Startup failed. The daemon is about to exit non-zero.
    Error,
    /// The daemon has shut down.
    Exited,
}

/// Runtime status written by the daemon to `$XDG_STATE_HOME/clipwatch/status.toml`.
/// A tray front-end reads this file (read-only) to render its icon and menu.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupervisorStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Pid of the daemon itself; send SIGUSR1 here to toggle.
    pub pid: u32,
    pub state: SupervisorState,
    /// Text of the toggle menu entry, absent before startup and after exit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,
    pub tooltip: String,
    pub icon_name: String,
    /// Most recent error, fatal or not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RFC 3339 timestamp of the last write.
    pub updated_at: String,
}

impl SupervisorStatus {
    /// Constructs the initial status on daemon startup.
    pub fn new(tray: &TrayConfig) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            pid: std::process::id(),
            state: SupervisorState::Starting,
            action_label: None,
            tooltip: tray.tooltip.clone(),
            icon_name: tray.icon_name.clone(),
            error: None,
            updated_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking; a status write failure should never
/// take the supervisor down.
pub fn write_status(path: &Path, status: &SupervisorStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            warn!("Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                warn!("Failed to write status file: {e}");
            }
        }
        Err(e) => warn!("Failed to serialize status: {e}"),
    }
}

/// [`StatusSurface`] backed by the status file.
pub struct StatusFile {
    path: PathBuf,
    status: SupervisorStatus,
}

impl StatusFile {
    /// Writes the initial `starting` status immediately.
    pub fn new(path: PathBuf, tray: &TrayConfig) -> Self {
        let status = SupervisorStatus::new(tray);
        write_status(&path, &status);
        Self { path, status }
    }

    #[cfg(test)]
    pub fn status(&self) -> &SupervisorStatus {
        &self.status
    }

    fn flush(&mut self) {
        self.status.updated_at = chrono::Local::now().to_rfc3339();
        write_status(&self.path, &self.status);
    }
}

impl StatusSurface for StatusFile {
    fn set_label(&mut self, action: ToggleAction) {
        self.status.state = match action {
            ToggleAction::Pause => SupervisorState::Running,
            ToggleAction::Resume => SupervisorState::Paused,
        };
        self.status.action_label = Some(action.text().to_string());
        self.status.error = None;
        self.flush();
    }

    fn notify_fatal_error(&mut self, message: &str) {
        error!("{message}");
        // The log may be filtered or redirected; the user still has to see this.
        eprintln!("Error: {message}");
        self.status.state = SupervisorState::Error;
        self.status.action_label = None;
        self.status.error = Some(message.to_string());
        self.flush();
    }

    fn report_error(&mut self, message: &str) {
        self.status.error = Some(message.to_string());
        self.flush();
    }

    fn request_program_exit(&mut self) {
        self.status.state = SupervisorState::Exited;
        self.status.action_label = None;
        self.flush();
    }
}
