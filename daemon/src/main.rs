mod config;
mod controller;
mod coordinator;
mod error;
mod event;
mod liveness;
mod paths;
mod signals;
mod status;
mod surface;
mod target;

use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::controller::ProcessController;
use crate::coordinator::{Coordinator, Flow};
use crate::error::ConfigError;
use crate::event::SupervisorEvent;
use crate::surface::StatusSurface;

/// Exit status when the script cannot be supervised.
const EXIT_CONFIG_ERROR: i32 = 1;

// One thread of control: events are handled strictly one after another.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // ── Logging ───────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Signal handlers ───────────────────────────────────────────────────────
    // Installed before anything is spawned so a toggle or quit can't kill us
    // with the default action while the script is already running.
    let signals = match signals::SignalSource::install() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to install signal handlers: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = match paths::config_file_path() {
        Ok(p) => Some(p),
        Err(e) => {
            error!("Cannot locate config file (using defaults): {e}");
            None
        }
    };
    let config = match config_path.as_deref().map(config::load_or_default) {
        Some(Ok(c)) => c,
        Some(Err(e)) => {
            error!("{e:#} (using defaults)");
            config::Config::default()
        }
        None => config::Config::default(),
    };

    // ── Status surface ────────────────────────────────────────────────────────
    let status_path = match paths::status_file_path() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to locate status file: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    let surface = status::StatusFile::new(status_path, &config.tray);

    // ── Event sources ─────────────────────────────────────────────────────────
    // Events that arrive during startup wait in the channel.
    let (event_tx, event_rx) = mpsc::channel::<SupervisorEvent>(32);
    tokio::spawn(signals.forward(event_tx.clone()));
    match config.monitor.liveness_period() {
        Some(period) => {
            tokio::spawn(liveness::run(period, event_tx.clone()));
        }
        None => info!("Liveness polling disabled; script exits go unnoticed until next toggle"),
    }
    drop(event_tx);

    let result = run(&config.script.path, surface, event_rx).await;
    std::process::exit(exit_code(&result));
}

/// Starts the script and handles events until a quit.
///
/// Fails only when the script cannot be supervised at all; the surface has
/// already been told in that case.
async fn run<S: StatusSurface>(
    script_path: &str,
    surface: S,
    mut events: mpsc::Receiver<SupervisorEvent>,
) -> Result<(), ConfigError> {
    let mut coordinator = Coordinator::startup(script_path, surface, ProcessController::new)?;

    info!(
        pid = std::process::id(),
        state = ?coordinator.state(),
        "clipwatch v{} started; send SIGUSR1 to toggle",
        env!("CARGO_PKG_VERSION")
    );

    // ── Event loop ────────────────────────────────────────────────────────────
    loop {
        // All senders gone means nothing can toggle us any more; shut down cleanly.
        let evt = events.recv().await.unwrap_or(SupervisorEvent::Quit);
        if coordinator.handle(evt).await == Flow::Exit {
            break;
        }
    }

    if coordinator.is_running() {
        error!("Exiting while the script is still running");
    }
    Ok(())
}

fn exit_code(result: &Result<(), ConfigError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(_) => EXIT_CONFIG_ERROR,
    }
}
