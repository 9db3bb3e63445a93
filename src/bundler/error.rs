//! Error types for installer staging and packaging.
//!
//! Every failure that can end a platform's pipeline has its own variant so the
//! orchestrator can record it against that platform and keep going with the
//! others.
//!
//! # Features
//!
//! - **Context trait**: Add context to errors similar to anyhow
//! - **ErrorExt trait**: Filesystem operations with automatic path context,
//!   split into staging IO and manifest IO
//! - **bail! macro**: Early return with formatted error messages
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_installer::bundler::{Error, Result};
//! use kodegen_bundler_installer::bundler::error::ErrorExt;
//! use std::path::Path;
//!
//! fn write_control(path: &Path, text: &str) -> Result<()> {
//!     std::fs::write(path, text).fs_context("writing control file", path)?;
//!     Ok(())
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the installer pipeline.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// The requested platform identifier is not in the catalog.
    #[error("unknown platform `{id}` (known platforms: {known})")]
    UnknownPlatform {
        /// Identifier that was requested
        id: String,
        /// Comma-separated catalog identifiers
        known: String,
    },

    /// No publishable binary was found for the platform.
    #[error("no binary found for {platform} in {}", .directory.display())]
    BinaryNotFound {
        /// Platform identifier
        platform: String,
        /// Directory that was scanned
        directory: PathBuf,
    },

    /// More than one file qualified as the platform's binary.
    #[error(
        "ambiguous binary for {platform} in {}: {}",
        .directory.display(),
        join_paths(.candidates)
    )]
    AmbiguousBinary {
        /// Platform identifier
        platform: String,
        /// Directory that was scanned
        directory: PathBuf,
        /// Every file that qualified
        candidates: Vec<PathBuf>,
    },

    /// A manifest template could not be loaded.
    #[error("failed to read template {}: {error}", .path.display())]
    TemplateRead {
        /// Template location
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A template declares placeholders that the substitution map does not cover.
    #[error("unresolved placeholders in template {template}: {}", .placeholders.join(", "))]
    UnresolvedPlaceholder {
        /// Template name
        template: String,
        /// Placeholder keys left without a value
        placeholders: Vec<String>,
    },

    /// Filesystem failure while building a staging tree.
    #[error("staging failed while {context} {}: {error}", .path.display())]
    Staging {
        /// Operation that failed (e.g., "creating directory")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// File system error with path context, raised while writing manifests
    /// and archives.
    #[error("{context} {}: {error}", .path.display())]
    Fs {
        /// Context describing the operation (e.g., "writing control file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// External command could not be started.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// External packager exited unsuccessfully.
    #[error(
        "packaging failed: `{command}` exited with {}{}",
        exit_label(.exit_code),
        stderr_suffix(.stderr)
    )]
    PackagingFailed {
        /// Command line that was run
        command: String,
        /// Exit code, `None` when terminated by a signal
        exit_code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The run was cancelled while a platform was in flight.
    #[error("cancelled")]
    Cancelled,

    /// Version string is not a 1 to 4 part numeric version.
    #[error("invalid version `{0}`: expected major[.minor[.build[.revision]]]")]
    InvalidVersion(String),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Handlebars template rendering error.
    #[error("{0}")]
    HandleBarsError(#[from] handlebars::RenderError),

    /// Handlebars template parsing error.
    #[error("{0}")]
    Template(#[from] handlebars::TemplateError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Returns the innermost error, skipping [`Error::Context`] layers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Context(_, inner) = current {
            current = inner;
        }
        current
    }

    /// Stable short name of the failure class, used in reports.
    pub fn kind_name(&self) -> &'static str {
        match self.root_cause() {
            Error::UnknownPlatform { .. } => "UnknownPlatform",
            Error::BinaryNotFound { .. } => "BinaryNotFound",
            Error::AmbiguousBinary { .. } => "AmbiguousBinary",
            Error::TemplateRead { .. } => "TemplateReadError",
            Error::UnresolvedPlaceholder { .. } => "UnresolvedPlaceholder",
            Error::Staging { .. } => "StagingIOError",
            Error::Fs { .. } | Error::IoError(_) => "IOError",
            Error::PackagingFailed { .. } => "PackagingFailed",
            Error::CommandFailed { .. } => "CommandFailed",
            Error::Cancelled => "Cancelled",
            Error::InvalidVersion(_) => "InvalidVersion",
            _ => "Error",
        }
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "signal".to_string())
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with the bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
///
/// The `context` should be a present-tense verb phrase describing the
/// operation, e.g. "creating directory", "copying binary".
pub trait ErrorExt<T> {
    /// Wrap an I/O error raised while writing manifests or archives.
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;

    /// Wrap an I/O error raised while building a staging tree.
    fn staging_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }

    fn staging_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Staging {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// # Examples
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($msg.into()))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::error::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::error::Error::GenericError(format!($fmt, $($arg)*)))
    };
}
