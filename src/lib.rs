//! # Kodegen Installer Bundler
//!
//! Turns per-platform published binaries into native installers.
//!
//! For every requested platform the [`Bundler`] locates the published
//! binary, stages it into an isolated installer tree, writes the packaging
//! manifests and runs the packager:
//!
//! - **Windows** (`win-x86`, `win-x64`, `win-arm64`): a WiX source rendered
//!   from `msi/ProductTemplate.wxs` and handed to the MSI packager
//! - **Linux** (`linux-x64`, `linux-arm64`): a Debian control file, desktop
//!   entry and maintainer scripts, archived into a `.deb`
//!
//! Failures are scoped to the platform that produced them; the run returns a
//! [`BundleReport`] with one outcome per platform.
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_installer --build-root builds/latest --name "Sample App" \
//!     --manufacturer Acme --version 1.2.0.0
//! kodegen_bundler_installer --publish-root src/App/bin/Release -p linux-x64 --json
//! kodegen_bundler_installer --list-platforms
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

pub use bundler::{BundleReport, Bundler, InstallerArtifact, PlatformOutcome, Settings};
pub use cli::Args;
pub use error::{CliError, InstallerError, Result};
pub use metadata::InstallerManifest;
