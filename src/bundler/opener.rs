//! Revealing the installer output folder to the user.
//!
//! The orchestrator does not reach for a desktop environment on its own; the
//! caller hands it an [`OutputOpener`]. The CLI passes [`SystemOpener`]
//! unless `--no-open` is given, tests pass [`NoopOpener`].

use crate::bundler::error::{Error, Result};
use std::path::Path;

/// Opens a directory for the user once packaging finishes.
pub trait OutputOpener: Send + Sync {
    /// Opens `path`.
    fn open(&self, path: &Path) -> Result<()>;
}

/// Opens folders with the host's file manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl SystemOpener {
    #[cfg(target_os = "windows")]
    const PROGRAM: &'static str = "explorer";
    #[cfg(target_os = "macos")]
    const PROGRAM: &'static str = "open";
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    const PROGRAM: &'static str = "xdg-open";
}

impl OutputOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<()> {
        // The file manager outlives us; only the spawn is checked.
        std::process::Command::new(Self::PROGRAM)
            .arg(path)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|error| Error::CommandFailed {
                command: format!("{} {}", Self::PROGRAM, path.display()),
                error,
            })?;
        Ok(())
    }
}

/// Does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOpener;

impl OutputOpener for NoopOpener {
    fn open(&self, path: &Path) -> Result<()> {
        log::debug!("Not opening {}", path.display());
        Ok(())
    }
}
