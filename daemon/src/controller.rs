/// Ownership of the supervised script's OS process.
///
/// [`ProcessController`] is the only place that holds the child handle.  Its
/// one hard guarantee: [`ProcessControl::stop`] does not return `Ok` until the
/// child has actually exited and been reaped, so a stop immediately followed
/// by a start can never leave two copies of the script running.
use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{LaunchError, StopError};
use crate::target::ScriptTarget;

/// Run-control operations the coordinator drives.
///
/// Implemented by [`ProcessController`] for real processes; tests substitute
/// a recording fake.
#[allow(async_fn_in_trait)]
pub trait ProcessControl {
    /// True while a child handle is held.
    fn is_running(&self) -> bool;

    /// Spawns the script.  No-op if a handle is already held.
    fn start(&mut self) -> Result<(), LaunchError>;

    /// Terminates the script and waits for it to exit.  No-op without a handle.
    async fn stop(&mut self) -> Result<(), StopError>;

    /// Releases the handle if the child has exited on its own, returning its
    /// exit status.  Never blocks.
    fn reap_exited(&mut self) -> Option<ExitStatus>;
}

pub struct ProcessController {
    target: ScriptTarget,
    child: Option<Child>,
}

impl ProcessController {
    pub fn new(target: ScriptTarget) -> Self {
        Self { target, child: None }
    }

    /// OS pid of the held child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }
}

impl ProcessControl for ProcessController {
    fn is_running(&self) -> bool {
        self.child.is_some()
    }

    fn start(&mut self) -> Result<(), LaunchError> {
        if self.child.is_some() {
            return Ok(());
        }

        let path = self.target.path();
        let child = Command::new(path)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        self.child = Some(child);
        info!(pid = ?self.pid(), script = %self.target.path().display(), "Script started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), StopError> {
        let Some(child) = self.child.as_mut() else {
            return Ok(());
        };

        // The script may have died since we last looked; reap the zombie
        // instead of signalling a pid that no longer belongs to us.
        if let Some(status) = child.try_wait().map_err(StopError::Wait)? {
            debug!(%status, "Script had already exited; releasing handle");
            self.child = None;
            return Ok(());
        }

        let pid = child.id();
        terminate(child)?;
        let status = child.wait().await.map_err(StopError::Wait)?;
        info!(?pid, %status, "Script stopped");
        self.child = None;
        Ok(())
    }

    fn reap_exited(&mut self) -> Option<ExitStatus> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to poll script status: {e}");
                None
            }
        }
    }
}

/// Sends SIGTERM.  A pid that is already gone counts as terminated.
#[cfg(unix)]
#[allow(clippy::cast_possible_wrap)]
fn terminate(child: &mut Child) -> Result<(), StopError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };

    match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(StopError::Signal { pid, source }),
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> Result<(), StopError> {
    child.start_kill().map_err(StopError::Terminate)
}
