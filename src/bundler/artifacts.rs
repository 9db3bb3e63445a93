//! Build-output collection.
//!
//! A [`BuildArtifactSet`] is a root directory with one published-binary
//! folder per platform (`<root>/<platform id>/`). It either already exists
//! or is collected from a publish tree, where each platform's output sits in
//! a folder named `publish` whose parent is named after the platform:
//!
//! ```text
//! <publish root>/.../win-x64/publish/App.exe
//! <publish root>/.../linux-x64/publish/app
//! ```
//!
//! Collected sets land in a fresh `build-<timestamp>` folder so repeated
//! runs never overwrite each other.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::Platform,
    utils::fs::{copy_dir, ensure_dir},
};
use std::path::{Path, PathBuf};

/// Name of the folder a publish step writes a platform's output to.
pub const PUBLISH_DIR_NAME: &str = "publish";

/// `chrono` format of collected build folder names.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Root directory of per-platform published binaries. Read-only to the
/// packaging pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifactSet {
    root: PathBuf,
}

impl BuildArtifactSet {
    /// Uses an existing build-output root.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let metadata = tokio::fs::metadata(&root)
            .await
            .fs_context("opening build root", &root)?;
        if !metadata.is_dir() {
            crate::bail!("build root {} is not a directory", root.display());
        }
        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Folder holding `platform`'s published binary.
    pub fn platform_dir(&self, platform: &Platform) -> PathBuf {
        self.root.join(platform.id)
    }

    /// Copies every `publish` folder under `publish_root` into a new
    /// `build-<timestamp>` folder of `builds_dir`.
    ///
    /// Each tree is copied to `<build>/<parent folder name>/`, overwriting
    /// existing files.
    pub async fn collect(publish_root: &Path, builds_dir: &Path) -> Result<Self> {
        let publish_dirs = find_publish_dirs(publish_root, builds_dir).await?;
        if publish_dirs.is_empty() {
            crate::bail!(
                "no `{}` folders found under {}",
                PUBLISH_DIR_NAME,
                publish_root.display()
            );
        }

        let root = create_timestamped_dir(builds_dir).await?;
        for (platform_id, dir) in &publish_dirs {
            let dest = root.join(platform_id);
            copy_dir(dir, &dest).await?;
            log::info!("Collected {} from {}", platform_id, dir.display());
        }

        Ok(Self { root })
    }
}

/// Finds `publish` folders and pairs each with its parent folder's name.
///
/// Does not descend into `builds_dir` or into a found `publish` folder.
async fn find_publish_dirs(publish_root: &Path, builds_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let publish_root = publish_root.to_path_buf();
    let builds_dir = builds_dir.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        let mut walker = walkdir::WalkDir::new(&publish_root)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.path() == builds_dir.as_path() {
                walker.skip_current_dir();
                continue;
            }
            if entry.file_name() != PUBLISH_DIR_NAME {
                continue;
            }

            let parent_name = entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            match parent_name {
                Some(name) => found.push((name, entry.path().to_path_buf())),
                None => log::warn!("Skipping {}: no parent folder", entry.path().display()),
            }
            walker.skip_current_dir();
        }

        Ok(found)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Publish scan task failed: {}", e)))?
}

/// Creates `builds_dir/build-<timestamp>`.
///
/// If that folder already exists a numeric suffix is appended
/// (`build-<timestamp>-1`, ...), so the returned folder is always new.
pub async fn create_timestamped_dir(builds_dir: &Path) -> Result<PathBuf> {
    ensure_dir(builds_dir).await?;

    let base = format!("build-{}", chrono::Local::now().format(TIMESTAMP_FORMAT));
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            base.clone()
        } else {
            format!("{}-{}", base, attempt)
        };
        let candidate = builds_dir.join(name);

        match tokio::fs::create_dir(&candidate).await {
            Ok(()) => {
                log::debug!("Created build folder {}", candidate.display());
                return Ok(candidate);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e).staging_context("creating build folder", &candidate),
        }
    }
}
