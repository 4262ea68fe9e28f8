#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// SIGUSR1 received; flip between running and paused.
    Toggle,
    /// SIGINT/SIGTERM/SIGHUP received; stop the script and exit.
    Quit,
    /// Periodic check for a script that exited on its own.
    LivenessTick,
}
