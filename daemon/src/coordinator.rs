/// Lifecycle state machine between user events and the process controller.
///
/// The coordinator is the single owner of [`MonitoringState`] and the only
/// writer of the status surface.  Every label update happens after the
/// controller call it describes has completed, so between events the surface
/// always matches what the controller actually holds.
use tracing::{error, info, warn};

use crate::controller::ProcessControl;
use crate::error::{ConfigError, LaunchError};
use crate::event::SupervisorEvent;
use crate::surface::{StatusSurface, ToggleAction};
use crate::target::ScriptTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitoringState {
    Running,
    Paused,
}

/// What the event loop should do after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Coordinator<C, S> {
    controller: C,
    surface: S,
    state: MonitoringState,
}

impl<C: ProcessControl, S: StatusSurface> Coordinator<C, S> {
    /// Validates the configured script and starts it.
    ///
    /// A missing or non-executable script is reported through
    /// [`StatusSurface::notify_fatal_error`] and returned; the caller must
    /// exit.  No controller is built in that case, so nothing is ever spawned.
    ///
    /// A launch failure after validation is not fatal: the coordinator comes
    /// up paused and the user can retry with a toggle.
    pub fn startup(
        script_path: &str,
        mut surface: S,
        make_controller: impl FnOnce(ScriptTarget) -> C,
    ) -> Result<Self, ConfigError> {
        let target = match ScriptTarget::resolve(script_path) {
            Ok(target) => target,
            Err(e) => {
                surface.notify_fatal_error(&e.to_string());
                return Err(e);
            }
        };
        info!(script = %target.path().display(), "Script validated");

        let mut coordinator = Self {
            controller: make_controller(target),
            surface,
            state: MonitoringState::Paused,
        };

        if let Err(e) = coordinator.launch() {
            let message = format!("Failed to start monitoring: {e}");
            error!("{message}");
            coordinator.surface.set_label(ToggleAction::Resume);
            coordinator.surface.report_error(&message);
        }
        Ok(coordinator)
    }

    pub fn state(&self) -> MonitoringState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[cfg(test)]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Dispatches one event.  Returns [`Flow::Exit`] only after a quit.
    pub async fn handle(&mut self, event: SupervisorEvent) -> Flow {
        match event {
            SupervisorEvent::Toggle => self.toggle().await,
            SupervisorEvent::LivenessTick => self.check_liveness(),
            SupervisorEvent::Quit => {
                self.quit().await;
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    pub async fn toggle(&mut self) {
        match self.state {
            MonitoringState::Running => self.pause().await,
            MonitoringState::Paused => self.resume(),
        }
    }

    /// Stops the script and waits for it to exit.  No-op while paused.
    pub async fn pause(&mut self) {
        if self.state == MonitoringState::Paused {
            return;
        }
        match self.controller.stop().await {
            Ok(()) => {
                self.state = MonitoringState::Paused;
                self.surface.set_label(ToggleAction::Resume);
                info!("Monitoring paused");
            }
            Err(e) => {
                let message = format!("Failed to pause monitoring: {e}");
                error!("{message}");
                self.surface.report_error(&message);
            }
        }
    }

    /// Starts the script.  No-op while running.
    pub fn resume(&mut self) {
        if self.state == MonitoringState::Running {
            return;
        }
        if let Err(e) = self.launch() {
            let message = format!("Failed to resume monitoring: {e}");
            error!("{message}");
            self.surface.report_error(&message);
        }
    }

    /// Stops a running script, then tears the surface down.  Never fails:
    /// if the script cannot be stopped it is left behind.
    pub async fn quit(&mut self) {
        info!("Shutting down");
        if self.state == MonitoringState::Running {
            match self.controller.stop().await {
                Ok(()) => self.state = MonitoringState::Paused,
                Err(e) => warn!("Failed to stop script on quit, it may outlive the daemon: {e}"),
            }
        }
        self.surface.request_program_exit();
    }

    /// Moves to paused if the script exited on its own since the last check.
    /// The script is not restarted.
    pub fn check_liveness(&mut self) {
        if self.state != MonitoringState::Running {
            return;
        }
        if let Some(status) = self.controller.reap_exited() {
            warn!(%status, "Script exited unexpectedly");
            self.state = MonitoringState::Paused;
            self.surface.set_label(ToggleAction::Resume);
            self.surface
                .report_error(&format!("Script exited unexpectedly ({status})"));
        }
    }

    fn launch(&mut self) -> Result<(), LaunchError> {
        self.controller.start()?;
        self.state = MonitoringState::Running;
        self.surface.set_label(ToggleAction::Pause);
        info!("Monitoring started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StopError;
    use std::cell::Cell;
    use std::path::Path;
    use std::process::ExitStatus;

    // ── fakes ─────────────────────────────────────────────────────────────────

    #[derive(Default)]
    struct FakeController {
        running: bool,
        starts: usize,
        stops: usize,
        fail_start: bool,
        fail_stop: bool,
        /// Exit status handed out by the next `reap_exited` while running.
        exited: Option<ExitStatus>,
    }

    impl ProcessControl for FakeController {
        fn is_running(&self) -> bool {
            self.running
        }

        fn start(&mut self) -> Result<(), LaunchError> {
            self.starts += 1;
            if self.fail_start {
                return Err(LaunchError::Spawn {
                    path: "/fake.sh".into(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            self.running = true;
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), StopError> {
            self.stops += 1;
            if self.fail_stop {
                return Err(StopError::Wait(std::io::Error::other("wait failed")));
            }
            self.running = false;
            Ok(())
        }

        fn reap_exited(&mut self) -> Option<ExitStatus> {
            if !self.running {
                return None;
            }
            let status = self.exited.take()?;
            self.running = false;
            Some(status)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Label(ToggleAction),
        Fatal(String),
        Error(String),
        Exit,
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<Call>,
    }

    impl RecordingSurface {
        fn last_label(&self) -> Option<ToggleAction> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Label(a) => Some(*a),
                _ => None,
            })
        }

        fn errors(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Error(m) => Some(m.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl StatusSurface for RecordingSurface {
        fn set_label(&mut self, action: ToggleAction) {
            self.calls.push(Call::Label(action));
        }

        fn notify_fatal_error(&mut self, message: &str) {
            self.calls.push(Call::Fatal(message.to_string()));
        }

        fn report_error(&mut self, message: &str) {
            self.calls.push(Call::Error(message.to_string()));
        }

        fn request_program_exit(&mut self) {
            self.calls.push(Call::Exit);
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn write_script(dir: &Path, mode: u32) -> String {
        let path = dir.join("watch.sh");
        std::fs::write(&path, "#!/bin/sh\nexec sleep 30\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = mode;
        path.to_str().unwrap().to_string()
    }

    fn started_with(
        fake: FakeController,
    ) -> (tempfile::TempDir, Coordinator<FakeController, RecordingSurface>) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), 0o755);
        let c = Coordinator::startup(&path, RecordingSurface::default(), |_| fake).unwrap();
        (dir, c)
    }

    fn started() -> (tempfile::TempDir, Coordinator<FakeController, RecordingSurface>) {
        started_with(FakeController::default())
    }

    fn assert_consistent<C: ProcessControl>(c: &Coordinator<C, RecordingSurface>) {
        assert_eq!(c.is_running(), c.state() == MonitoringState::Running);
        let expected = match c.state() {
            MonitoringState::Running => ToggleAction::Pause,
            MonitoringState::Paused => ToggleAction::Resume,
        };
        assert_eq!(c.surface().last_label(), Some(expected));
    }

    // ── startup ───────────────────────────────────────────────────────────────

    #[test]
    fn startup_starts_script_and_offers_pause() {
        let (_dir, c) = started();
        assert_eq!(c.state(), MonitoringState::Running);
        assert_eq!(c.controller().starts, 1);
        assert_eq!(c.surface().calls, vec![Call::Label(ToggleAction::Pause)]);
        assert_consistent(&c);
    }

    #[test]
    fn startup_missing_script_is_fatal_and_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.sh");
        let built = Cell::new(false);

        let result = Coordinator::startup(
            path.to_str().unwrap(),
            RecordingSurface::default(),
            |_| {
                built.set(true);
                FakeController::default()
            },
        );

        assert!(matches!(result, Err(ConfigError::MissingTarget(_))));
        assert!(!built.get());
    }

    #[cfg(unix)]
    #[test]
    fn startup_non_executable_script_is_fatal_and_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(dir.path(), 0o644);
        let built = Cell::new(false);

        let result = Coordinator::startup(&path, RecordingSurface::default(), |_| {
            built.set(true);
            FakeController::default()
        });

        assert!(matches!(result, Err(ConfigError::NotExecutable(_))));
        assert!(!built.get());
    }

    #[test]
    fn startup_failure_is_reported_to_surface() {
        // The surface is consumed by startup, so observe it through the status
        // file implementation instead of the recorder.
        use crate::config::TrayConfig;
        use crate::status::{StatusFile, SupervisorState, SupervisorStatus};

        let dir = tempfile::tempdir().unwrap();
        let status_path = dir.path().join("status.toml");
        let script = dir.path().join("absent.sh");
        let surface = StatusFile::new(status_path.clone(), &TrayConfig::default());

        let result = Coordinator::startup(script.to_str().unwrap(), surface, |_| {
            FakeController::default()
        });
        assert!(result.is_err());

        let status: SupervisorStatus =
            toml::from_str(&std::fs::read_to_string(&status_path).unwrap()).unwrap();
        assert_eq!(status.state, SupervisorState::Error);
        assert!(status.error.unwrap().starts_with("Script not found:"));
    }

    #[test]
    fn startup_launch_failure_comes_up_paused() {
        let (_dir, c) = started_with(FakeController {
            fail_start: true,
            ..Default::default()
        });

        assert_eq!(c.state(), MonitoringState::Paused);
        assert!(!c.is_running());
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Resume));
        assert_eq!(c.surface().errors().len(), 1);
        assert_consistent(&c);
    }

    // ── toggle ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn toggle_round_trip() {
        let (_dir, mut c) = started();

        c.toggle().await;
        assert_eq!(c.state(), MonitoringState::Paused);
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Resume));
        assert_consistent(&c);

        c.toggle().await;
        assert_eq!(c.state(), MonitoringState::Running);
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Pause));
        assert_consistent(&c);

        assert_eq!(c.controller().starts, 2);
        assert_eq!(c.controller().stops, 1);
    }

    #[tokio::test]
    async fn toggle_stop_failure_keeps_running() {
        let (_dir, mut c) = started_with(FakeController {
            fail_stop: true,
            ..Default::default()
        });

        c.toggle().await;

        assert_eq!(c.state(), MonitoringState::Running);
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Pause));
        assert_eq!(c.surface().errors().len(), 1);
        assert_consistent(&c);
    }

    #[tokio::test]
    async fn toggle_launch_failure_keeps_paused_and_label() {
        let (_dir, mut c) = started();
        c.toggle().await;
        let labels_before = c.surface().calls.len();

        c.controller.fail_start = true;
        c.toggle().await;

        assert_eq!(c.state(), MonitoringState::Paused);
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Resume));
        // Only the error was added; no label change.
        assert_eq!(c.surface().calls.len(), labels_before + 1);
        assert!(c.surface().errors()[0].starts_with("Failed to resume monitoring"));
        assert_consistent(&c);
    }

    // ── idempotence ───────────────────────────────────────────────────────────

    #[test]
    fn resume_while_running_is_noop() {
        let (_dir, mut c) = started();
        let calls = c.surface().calls.len();

        c.resume();

        assert_eq!(c.controller().starts, 1);
        assert_eq!(c.surface().calls.len(), calls);
        assert_eq!(c.state(), MonitoringState::Running);
    }

    #[tokio::test]
    async fn pause_while_paused_is_noop() {
        let (_dir, mut c) = started();
        c.pause().await;
        let calls = c.surface().calls.len();

        c.pause().await;

        assert_eq!(c.controller().stops, 1);
        assert_eq!(c.surface().calls.len(), calls);
        assert_eq!(c.state(), MonitoringState::Paused);
    }

    // ── quit ──────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn quit_while_running_stops_before_exit() {
        let (_dir, mut c) = started();

        let flow = c.handle(SupervisorEvent::Quit).await;

        assert_eq!(flow, Flow::Exit);
        assert_eq!(c.controller().stops, 1);
        assert!(!c.is_running());
        assert_eq!(c.surface().calls.last(), Some(&Call::Exit));
    }

    #[tokio::test]
    async fn quit_while_paused_makes_no_process_calls() {
        let (_dir, mut c) = started();
        c.pause().await;
        let (starts, stops) = (c.controller().starts, c.controller().stops);

        let flow = c.handle(SupervisorEvent::Quit).await;

        assert_eq!(flow, Flow::Exit);
        assert_eq!(c.controller().starts, starts);
        assert_eq!(c.controller().stops, stops);
        assert_eq!(c.surface().calls.last(), Some(&Call::Exit));
    }

    #[tokio::test]
    async fn quit_still_exits_when_stop_fails() {
        let (_dir, mut c) = started_with(FakeController {
            fail_stop: true,
            ..Default::default()
        });

        let flow = c.handle(SupervisorEvent::Quit).await;

        assert_eq!(flow, Flow::Exit);
        assert_eq!(c.surface().calls.last(), Some(&Call::Exit));
    }

    // ── liveness ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn liveness_tick_with_live_script_changes_nothing() {
        let (_dir, mut c) = started();
        let calls = c.surface().calls.len();

        let flow = c.handle(SupervisorEvent::LivenessTick).await;

        assert_eq!(flow, Flow::Continue);
        assert_eq!(c.state(), MonitoringState::Running);
        assert_eq!(c.surface().calls.len(), calls);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn liveness_tick_after_unexpected_exit_pauses() {
        use std::os::unix::process::ExitStatusExt;

        let (_dir, mut c) = started();
        c.controller.exited = Some(ExitStatus::from_raw(1 << 8));

        c.handle(SupervisorEvent::LivenessTick).await;

        assert_eq!(c.state(), MonitoringState::Paused);
        assert_eq!(c.surface().last_label(), Some(ToggleAction::Resume));
        assert!(c.surface().errors()[0].starts_with("Script exited unexpectedly"));
        assert_consistent(&c);
        // Not restarted.
        assert_eq!(c.controller().starts, 1);
    }

    #[tokio::test]
    async fn liveness_tick_while_paused_is_ignored() {
        let (_dir, mut c) = started();
        c.pause().await;
        let calls = c.surface().calls.len();

        c.handle(SupervisorEvent::LivenessTick).await;

        assert_eq!(c.surface().calls.len(), calls);
    }

    // ── with a real script ────────────────────────────────────────────────────

    #[cfg(unix)]
    mod real {
        use super::*;
        use crate::controller::tests::{pid_alive, script};
        use crate::controller::ProcessController;
        use std::time::{Duration, Instant};

        #[tokio::test]
        async fn toggle_and_quit_scenario() {
            let dir = tempfile::tempdir().unwrap();
            let target = script(dir.path(), "noop.sh", "exec sleep 30");
            let path = target.path().to_str().unwrap().to_string();

            let mut c =
                Coordinator::startup(&path, RecordingSurface::default(), ProcessController::new)
                    .unwrap();
            assert!(c.is_running());
            let first = c.controller().pid().unwrap();

            assert_eq!(c.handle(SupervisorEvent::Toggle).await, Flow::Continue);
            assert!(!c.is_running());
            assert_eq!(c.surface().last_label(), Some(ToggleAction::Resume));
            assert!(!pid_alive(first));

            assert_eq!(c.handle(SupervisorEvent::Toggle).await, Flow::Continue);
            assert!(c.is_running());
            let second = c.controller().pid().unwrap();

            assert_eq!(c.handle(SupervisorEvent::Quit).await, Flow::Exit);
            assert!(!c.is_running());
            assert!(!pid_alive(second));
        }

        #[tokio::test]
        async fn script_that_exits_is_noticed_by_liveness_tick() {
            let dir = tempfile::tempdir().unwrap();
            let target = script(dir.path(), "quick.sh", "exit 0");
            let path = target.path().to_str().unwrap().to_string();

            let mut c =
                Coordinator::startup(&path, RecordingSurface::default(), ProcessController::new)
                    .unwrap();

            let deadline = Instant::now() + Duration::from_secs(5);
            while c.state() == MonitoringState::Running {
                assert!(Instant::now() < deadline, "exit never noticed");
                tokio::time::sleep(Duration::from_millis(20)).await;
                c.handle(SupervisorEvent::LivenessTick).await;
            }

            assert!(!c.is_running());
            assert_consistent(&c);
        }
    }
}
