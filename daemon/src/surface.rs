/// The action the toggle control currently offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleAction {
    /// Offered while the script runs.
    Pause,
    /// Offered while the script is paused.
    Resume,
}

impl ToggleAction {
    pub fn text(self) -> &'static str {
        match self {
            ToggleAction::Pause => "Pause Monitoring",
            ToggleAction::Resume => "Resume Monitoring",
        }
    }
}

/// The write-only presentation side the coordinator drives.
///
/// Whatever renders the toggle (a tray menu, a status-file reader, a test
/// recorder) implements this.  The coordinator never reads back.
pub trait StatusSurface {
    /// Updates the toggle control's label.
    fn set_label(&mut self, action: ToggleAction);

    /// Reports a startup failure the daemon cannot recover from.
    fn notify_fatal_error(&mut self, message: &str);

    /// Reports a failed toggle or an unexpected script exit.
    fn report_error(&mut self, message: &str);

    /// Tears the surface down; the daemon exits right after.
    fn request_program_exit(&mut self);
}
