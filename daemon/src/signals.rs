/// OS signals are the control input of the daemon: a tray front-end (or a
/// user with `kill`) toggles monitoring with SIGUSR1 and quits with
/// SIGTERM/SIGINT/SIGHUP.
///
/// Handlers are installed by [`SignalSource::install`], which must run before
/// the script is started: until then a SIGUSR1 or SIGTERM would take the
/// default action and kill the daemon, leaving the script behind.
use tokio::sync::mpsc;
use tracing::debug;

use crate::event::SupervisorEvent;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Maps a handled signal to the event it stands for.
#[cfg(unix)]
pub fn event_for(kind: SignalKind) -> Option<SupervisorEvent> {
    if kind == SignalKind::user_defined1() {
        Some(SupervisorEvent::Toggle)
    } else if kind == SignalKind::interrupt()
        || kind == SignalKind::terminate()
        || kind == SignalKind::hangup()
    {
        Some(SupervisorEvent::Quit)
    } else {
        None
    }
}

/// Registered signal streams, ready to be forwarded.
#[cfg(unix)]
pub struct SignalSource {
    usr1: Signal,
    int: Signal,
    term: Signal,
    hup: Signal,
}

#[cfg(unix)]
impl SignalSource {
    /// Registers the handlers immediately.  Must be called inside the runtime.
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            usr1: signal(SignalKind::user_defined1())?,
            int: signal(SignalKind::interrupt())?,
            term: signal(SignalKind::terminate())?,
            hup: signal(SignalKind::hangup())?,
        })
    }

    /// Forwards signals to the event loop until it goes away.
    pub async fn forward(mut self, tx: mpsc::Sender<SupervisorEvent>) {
        loop {
            let kind = tokio::select! {
                _ = self.usr1.recv() => SignalKind::user_defined1(),
                _ = self.int.recv() => SignalKind::interrupt(),
                _ = self.term.recv() => SignalKind::terminate(),
                _ = self.hup.recv() => SignalKind::hangup(),
            };
            let Some(event) = event_for(kind) else {
                continue;
            };
            debug!(?event, "Signal received");
            if tx.send(event).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(not(unix))]
pub struct SignalSource;

#[cfg(not(unix))]
impl SignalSource {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    /// Ctrl+C is the only control input here; it quits.
    pub async fn forward(self, tx: mpsc::Sender<SupervisorEvent>) {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("Ctrl+C received");
            if tx.send(SupervisorEvent::Quit).await.is_err() {
                break;
            }
        }
    }
}
