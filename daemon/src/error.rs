use std::path::PathBuf;
use thiserror::Error;

/// The configured script cannot be supervised. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Script not found:\n{}", .0.display())]
    MissingTarget(PathBuf),

    #[error("Script is not executable:\n{}", .0.display())]
    NotExecutable(PathBuf),
}

/// The OS refused to spawn the script even though validation passed.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to launch {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The running script could not be terminated or its exit could not be
/// confirmed. The controller keeps the handle when this is returned.
#[derive(Debug, Error)]
pub enum StopError {
    #[cfg(unix)]
    #[error("Failed to signal pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::Error,
    },

    #[cfg(not(unix))]
    #[error("Failed to terminate script: {0}")]
    Terminate(#[source] std::io::Error),

    #[error("Failed to wait for script exit: {0}")]
    Wait(#[source] std::io::Error),
}
