//! External packager invocation.
//!
//! The packager is a black box that consumes a prepared staging directory.
//! Every invocation is awaited to completion; a nonzero exit is a
//! [`Error::PackagingFailed`] carrying the captured standard error, and a
//! cancelled run kills the child before returning [`Error::Cancelled`].

use crate::bundler::error::{Error, Result};
use std::{
    ffi::{OsStr, OsString},
    path::Path,
    process::{ExitStatus, Stdio},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// An external program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl PackagerCommand {
    /// Creates a command for `program` with no arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Program name as given.
    pub fn program(&self) -> &OsStr {
        &self.program
    }

    /// Arguments in order.
    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    /// Command line for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs `command` in `working_dir` and waits for it to exit.
///
/// Standard output is forwarded to the debug log; standard error is captured
/// for the failure report.
///
/// # Errors
///
/// - [`Error::CommandFailed`] if the program cannot be found or started.
/// - [`Error::PackagingFailed`] if it exits unsuccessfully.
/// - [`Error::Cancelled`] if `cancel` fires first. The child is killed.
pub async fn invoke(
    command: &PackagerCommand,
    working_dir: &Path,
    cancel: &CancellationToken,
) -> Result<ExitStatus> {
    let display = command.display();

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let program = which::which(command.program()).map_err(|e| Error::CommandFailed {
        command: display.clone(),
        error: std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
    })?;

    log::info!("Running `{}` in {}", display, working_dir.display());

    let mut child = Command::new(&program)
        .args(command.arguments())
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| Error::CommandFailed {
            command: display.clone(),
            error,
        })?;

    let stdout_handle = child.stdout.take().map(|stdout| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                log::debug!("packager: {}", line);
            }
        })
    });

    let stderr_handle = child.stderr.take().map(|stderr| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut captured = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                captured.push(line);
            }
            captured
        })
    });

    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel.cancelled() => None,
    };

    let status = match waited {
        Some(status) => status.map_err(|error| Error::CommandFailed {
            command: display.clone(),
            error,
        })?,
        None => {
            log::warn!("Cancelling `{}`", display);
            if let Err(e) = child.kill().await {
                log::warn!("Failed to kill `{}`: {}", display, e);
            }
            return Err(Error::Cancelled);
        }
    };

    if let Some(handle) = stdout_handle {
        let _ = handle.await;
    }
    let stderr = match stderr_handle {
        Some(handle) => handle.await.unwrap_or_default().join("\n"),
        None => String::new(),
    };

    if !status.success() {
        return Err(Error::PackagingFailed {
            command: display,
            exit_code: status.code(),
            stderr,
        });
    }

    log::debug!("`{}` finished with {}", display, status);
    Ok(status)
}
