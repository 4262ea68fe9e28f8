/// Resolution and one-time validation of the supervised script.
///
/// The configured path may be home-relative (`~/Scripts/...`).  It is expanded
/// once at startup, checked for existence and execute permission, and then
/// frozen in a [`ScriptTarget`] for the lifetime of the daemon.
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Absolute path of a script that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTarget {
    path: PathBuf,
}

impl ScriptTarget {
    /// Resolves `raw` against `$HOME` and validates the result.
    pub fn resolve(raw: &str) -> Result<Self, ConfigError> {
        Self::validate(expand_home(raw))
    }

    /// Checks that `path` is an existing regular file the current user may
    /// execute.
    pub fn validate(path: PathBuf) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingTarget(path));
        }
        if !is_executable(&path) {
            return Err(ConfigError::NotExecutable(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Expands a leading `~` using the `HOME` environment variable.
pub fn expand_home(raw: &str) -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    expand_home_with(raw, home.as_deref())
}

fn expand_home_with(raw: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(raw);
    };
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

/// Uses access(2) so the answer matches what execve will do for the real uid,
/// including root's "at least one x bit" rule.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use nix::unistd::{access, AccessFlags};
    access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}
