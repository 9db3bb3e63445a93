//! Installer packaging for per-platform published binaries.
//!
//! Given a build-output root with one published-binary folder per platform,
//! this module stages each platform into the layout its installer format
//! expects, writes the format's manifests, and runs the packager.
//!
//! # Supported Formats
//!
//! | Platforms | Format | Packager |
//! |-----------|--------|----------|
//! | `win-x64`, `win-x86`, `win-arm64` | .msi | WiX (`wix build`) |
//! | `linux-x64`, `linux-arm64` | .deb | built in (`ar` + `tar.gz`) |
//!
//! # Layout
//!
//! ```text
//! builds/build-<timestamp>/<platform>/<binary>      published input
//! installers/<platform>/...                         staging + installers
//! ```
//!
//! # Integration
//!
//! ```no_run
//! use kodegen_bundler_installer::bundler::{Bundler, NoopOpener, Project, SettingsBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> kodegen_bundler_installer::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project(Project::new("Sample App", "Acme", "1.2".parse()?))
//!     .build_root("builds/build-2024-01-01_00-00-00")
//!     .build()?;
//!
//! let report = Bundler::new(settings)
//!     .bundle(&NoopOpener, &CancellationToken::new())
//!     .await?;
//! assert!(report.all_packaged());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifacts;
mod builder;
pub mod error;
pub mod locator;
pub mod opener;
pub mod packager;
pub mod platform;
pub mod settings;
pub mod staging;
pub mod template;
mod utils;

// Public re-exports
pub use artifacts::BuildArtifactSet;
pub use builder::{BundleReport, Bundler, PlatformOutcome, PlatformState};
pub use error::{Error, Result};
pub use locator::BinaryFile;
pub use opener::{NoopOpener, OutputOpener, SystemOpener};
pub use packager::PackagerCommand;
pub use platform::{CATALOG, PackagingFamily, Platform, resolve_family};
pub use settings::{
    ApplicationVersion,
    // Family-specific settings
    DebianSettings,
    MsiSettings,
    Project,
    // Main configuration types
    Settings,
    SettingsBuilder,
    slugify,
};
pub use staging::{StagingBuilder, StagingTree};
pub use template::TemplateEngine;

use std::path::PathBuf;

/// An installer produced for one platform.
///
/// # Fields
///
/// - `platform`: Platform identifier (`win-x64`, `linux-x64`, ...)
/// - `family`: Installer technology
/// - `path`: The package file, or the staged package tree when no archive is built
/// - `size`: Size in bytes, when the path exists
/// - `checksum`: SHA-256 checksum, when the path exists
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstallerArtifact {
    /// Platform identifier.
    pub platform: String,

    /// Installer technology that produced the artifact.
    pub family: PackagingFamily,

    /// Location of the artifact inside the platform's installer folder.
    pub path: PathBuf,

    /// Total size in bytes.
    ///
    /// `None` when the packager reported success without leaving the file
    /// where expected.
    pub size: Option<u64>,

    /// SHA-256 checksum for integrity verification.
    pub checksum: Option<String>,
}

impl InstallerArtifact {
    /// Describes the artifact at `path`, hashing it if it exists.
    pub async fn describe(platform: &Platform, path: PathBuf) -> Result<Self> {
        let (size, checksum) = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            (
                Some(utils::checksum::calculate_size(&path).await?),
                Some(utils::checksum::calculate_sha256(&path).await?),
            )
        } else {
            log::warn!(
                "{}: packager succeeded but {} does not exist",
                platform.id,
                path.display()
            );
            (None, None)
        };

        Ok(Self {
            platform: platform.id.to_string(),
            family: platform.family,
            path,
            size,
            checksum,
        })
    }
}
