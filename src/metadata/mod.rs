//! Installer configuration from `installer.toml`.
//!
//! Every key is optional; command-line flags override file values.
//!
//! ```toml
//! [project]
//! name = "Sample App"
//! manufacturer = "Acme"
//! version = "1.2.0.0"
//! description = "Sample App launcher"
//!
//! [msi]
//! packager = "wix"
//! extra_files = ["CustomAction.dll"]
//!
//! [deb]
//! control_version = "1.0"
//! icon = "assets/sample.xpm"
//! archive = true
//!
//! [build]
//! platforms = ["win-x64", "linux-x64"]
//! templates = "templates"
//! parallel = false
//! ```

use crate::error::{InstallerError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "installer.toml";

/// Parsed `installer.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerManifest {
    /// `[project]`
    pub project: ProjectSection,
    /// `[msi]`
    pub msi: MsiSection,
    /// `[deb]`
    pub deb: DebSection,
    /// `[build]`
    pub build: BuildSection,
}

/// `[project]` table
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
    /// Product name
    pub name: Option<String>,
    /// Manufacturer / publisher
    pub manufacturer: Option<String>,
    /// 1 to 4 part numeric version
    pub version: Option<String>,
    /// Package description
    pub description: Option<String>,
}

/// `[msi]` table
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MsiSection {
    /// Packager program
    pub packager: Option<String>,
    /// Files copied beside the binary
    pub extra_files: Vec<PathBuf>,
}

/// `[deb]` table
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebSection {
    /// `Version` field of the control file
    pub control_version: Option<String>,
    /// XPM icon
    pub icon: Option<PathBuf>,
    /// Build the `.deb` archive
    pub archive: Option<bool>,
}

/// `[build]` table
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSection {
    /// Platform identifiers to package
    pub platforms: Vec<String>,
    /// Template directory
    pub templates: Option<PathBuf>,
    /// Run platform pipelines concurrently
    pub parallel: Option<bool>,
}

impl InstallerManifest {
    /// Parses manifest text. `path` is only used in error messages.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| InstallerError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let manifest = Self::parse(&text, path)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(manifest)
    }

    /// Loads `path` when given, otherwise `installer.toml` if it exists.
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub async fn discover(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path).await,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if tokio::fs::try_exists(default).await.unwrap_or(false) {
                    Self::load(default).await
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
