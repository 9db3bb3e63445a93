//! Staging tree construction.
//!
//! A staging tree is the on-disk layout a packaging family expects before
//! its manifests are written and its packager runs:
//!
//! ```text
//! <output>/<platform>/                    MSI: flat folder
//!   ├── <binary>
//!   ├── <extra files>
//!   └── <slug>-<platform>.wxs
//!
//! <output>/<platform>/PackageData/        DEB: filesystem hierarchy
//!   ├── DEBIAN/{control,preinst,postinst}
//!   └── usr/
//!       ├── bin/<binary>
//!       └── share/{applications,icons}/
//! ```
//!
//! Every directory is created idempotently, so staging the same platform
//! twice yields the same tree. A pipeline run uses [`StagingBuilder::restage`],
//! which first removes whatever an earlier run left in the platform folder.
//! Filesystem failures here are
//! [`Error::Staging`](crate::bundler::Error::Staging).

use crate::bundler::{
    error::{ErrorExt, Result},
    locator::BinaryFile,
    platform::{PackagingFamily, Platform},
    utils::fs::{copy_file, ensure_dir},
};
use std::path::{Path, PathBuf};

/// Name of the DEB staging subtree that becomes the package payload.
pub const PACKAGE_DATA_DIR: &str = "PackageData";

/// Directories of a DEB staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebLayout {
    /// `<output>/<platform>`
    pub root: PathBuf,
    /// `<root>/PackageData`
    pub package_data: PathBuf,
    /// `<package_data>/DEBIAN`
    pub debian: PathBuf,
    /// `<package_data>/usr/bin`
    pub bin: PathBuf,
    /// `<package_data>/usr/share/applications`
    pub applications: PathBuf,
    /// `<package_data>/usr/share/icons`
    pub icons: PathBuf,
}

impl DebLayout {
    fn new(root: PathBuf) -> Self {
        let package_data = root.join(PACKAGE_DATA_DIR);
        Self {
            debian: package_data.join("DEBIAN"),
            bin: package_data.join("usr/bin"),
            applications: package_data.join("usr/share/applications"),
            icons: package_data.join("usr/share/icons"),
            package_data,
            root,
        }
    }

    fn directories(&self) -> [&Path; 4] {
        [&self.debian, &self.bin, &self.applications, &self.icons]
    }
}

/// A platform's staging tree. All of its directories exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingTree {
    /// Flat folder holding the binary and the WiX manifest.
    Msi {
        /// `<output>/<platform>`
        root: PathBuf,
    },
    /// Filesystem-hierarchy layout under `PackageData`.
    Deb(DebLayout),
}

impl StagingTree {
    /// The platform's folder in the installer output.
    pub fn root(&self) -> &Path {
        match self {
            StagingTree::Msi { root } => root,
            StagingTree::Deb(layout) => &layout.root,
        }
    }

    /// Packaging family of this tree.
    pub fn family(&self) -> PackagingFamily {
        match self {
            StagingTree::Msi { .. } => PackagingFamily::Msi,
            StagingTree::Deb(_) => PackagingFamily::Deb,
        }
    }

    /// Copies the published binary into the tree and returns its staged path.
    ///
    /// MSI trees get the binary at the top level. DEB trees get it in
    /// `usr/bin` with mode 0755. An existing staged binary is overwritten.
    pub async fn install_binary(&self, binary: &BinaryFile) -> Result<PathBuf> {
        let dest = match self {
            StagingTree::Msi { root } => root.join(binary.file_name()),
            StagingTree::Deb(layout) => layout.bin.join(binary.file_name()),
        };

        copy_file(binary.path(), &dest).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let StagingTree::Deb(_) = self {
                tokio::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o755))
                    .await
                    .staging_context("setting executable permission", &dest)?;
            }
        }

        log::debug!("Staged binary {}", dest.display());
        Ok(dest)
    }

    /// Copies additional payload files beside the binary of an MSI tree.
    ///
    /// DEB trees ignore extra files.
    pub async fn install_extra_files(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let StagingTree::Msi { root } = self else {
            return Ok(Vec::new());
        };

        let mut installed = Vec::with_capacity(files.len());
        for file in files {
            let Some(name) = file.file_name() else {
                crate::bail!("extra file {:?} has no file name", file);
            };
            let dest = root.join(name);
            copy_file(file, &dest).await?;
            log::debug!("Staged extra file {}", dest.display());
            installed.push(dest);
        }
        Ok(installed)
    }

    /// Installs the application icon as `usr/share/icons/<slug>.xpm`.
    ///
    /// Returns `None` for MSI trees and when no icon is configured.
    pub async fn install_icon(&self, icon: Option<&Path>, slug: &str) -> Result<Option<PathBuf>> {
        let (StagingTree::Deb(layout), Some(icon)) = (self, icon) else {
            return Ok(None);
        };

        let dest = layout.icons.join(format!("{slug}.xpm"));
        copy_file(icon, &dest).await?;
        log::debug!("Staged icon {}", dest.display());
        Ok(Some(dest))
    }
}

/// Builds staging trees under an installer output root.
#[derive(Debug, Clone)]
pub struct StagingBuilder {
    output_root: PathBuf,
}

impl StagingBuilder {
    /// Creates a builder rooted at `output_root` (usually `<build root>/installers`).
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Installer output root.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Removes the platform's folder left by an earlier run, then stages it.
    ///
    /// # Errors
    ///
    /// [`Error::Staging`](crate::bundler::Error::Staging) if the old folder
    /// cannot be removed or the new tree cannot be created.
    pub async fn restage(&self, platform: &Platform) -> Result<StagingTree> {
        let root = self.output_root.join(platform.id);
        match tokio::fs::remove_dir_all(&root).await {
            Ok(()) => log::debug!("Removed previous staging tree {}", root.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).staging_context("clearing staging tree", &root),
        }
        self.stage(platform).await
    }

    /// Creates the platform's staging tree.
    ///
    /// Idempotent: existing directories are left in place.
    ///
    /// # Errors
    ///
    /// [`Error::Staging`](crate::bundler::Error::Staging) if a directory cannot
    /// be created, e.g. because a file occupies its path.
    pub async fn stage(&self, platform: &Platform) -> Result<StagingTree> {
        let root = self.output_root.join(platform.id);

        let tree = match platform.family {
            PackagingFamily::Msi => {
                ensure_dir(&root).await?;
                StagingTree::Msi { root }
            }
            PackagingFamily::Deb => {
                let layout = DebLayout::new(root);
                for dir in layout.directories() {
                    ensure_dir(dir).await?;
                }
                StagingTree::Deb(layout)
            }
        };

        log::debug!(
            "Staged {} tree for {} at {}",
            platform.family,
            platform.id,
            tree.root().display()
        );
        Ok(tree)
    }
}
