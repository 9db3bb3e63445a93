//! Error types for the installer command line.
//!
//! Library failures come from [`crate::bundler::Error`]; this module wraps
//! them together with argument, configuration and I/O failures and attaches
//! recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

/// Main error type for the installer command line
#[derive(Error, Debug)]
pub enum InstallerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML error in {}: {source}", .path.display())]
    Toml {
        /// Configuration file that failed to parse
        path: PathBuf,
        /// Parsing error
        #[source]
        source: toml::de::Error,
    },

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bundler errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },
}

impl InstallerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error as BundlerError;

        match self {
            InstallerError::Cli(CliError::MissingArgument { argument }) => vec![
                format!("Pass --{} on the command line", argument),
                "Or set it in installer.toml (see --config)".to_string(),
            ],
            InstallerError::Toml { path, .. } => vec![
                format!("Fix the syntax of {}", path.display()),
                "Run with --config pointing at another file to bypass it".to_string(),
            ],
            InstallerError::Bundler(e) => match e.root_cause() {
                BundlerError::UnknownPlatform { known, .. } => vec![
                    format!("Use one of: {}", known),
                    "List platforms with --list-platforms".to_string(),
                ],
                BundlerError::InvalidVersion(_) => vec![
                    "Use a numeric version with one to four parts, e.g. 1.2.0.0".to_string(),
                ],
                BundlerError::TemplateRead { path, .. } => vec![
                    format!("Create the template at {}", path.display()),
                    "Point --templates at the directory holding msi/ProductTemplate.wxs"
                        .to_string(),
                ],
                BundlerError::Staging { path, .. } => vec![
                    format!("Check permissions and free space at {}", path.display()),
                    "Remove files that block the installer output folders".to_string(),
                ],
                _ => vec!["Check the error message above for specific details".to_string()],
            },
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_platform_suggests_catalog() {
        let err = InstallerError::from(crate::bundler::Error::UnknownPlatform {
            id: "osx-x64".into(),
            known: "win-x64, linux-x64".into(),
        });
        let suggestions = err.recovery_suggestions();
        assert!(suggestions[0].contains("win-x64, linux-x64"));
    }

    #[test]
    fn bundler_errors_are_unwrapped_through_context() {
        let inner = crate::bundler::Error::InvalidVersion("1.2.3.4.5".into());
        let err = InstallerError::from(crate::bundler::Error::Context(
            "reading project".into(),
            Box::new(inner),
        ));
        assert!(err.recovery_suggestions()[0].contains("one to four parts"));
    }
}
