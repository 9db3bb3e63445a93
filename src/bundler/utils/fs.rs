//! File system utilities for staging.
//!
//! One copy routine for files and one for directory trees, both with
//! always-overwrite semantics, plus helpers for executable text files.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::path::Path;
use tokio::fs;

/// Makes a symbolic link.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path, _is_dir: bool) -> std::io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link.
#[cfg(windows)]
fn symlink(src: &Path, dst: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Creates a directory and all of its parents. Existing directories are fine.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .staging_context("creating directory", path)
}

/// Copies a regular file, creating the destination's parent directories and
/// overwriting an existing destination.
///
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    let metadata = fs::metadata(from)
        .await
        .staging_context("reading source file", from)?;
    if !metadata.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        ensure_dir(dest_dir).await?;
    }
    fs::copy(from, to).await.staging_context("copying file", to)
}

/// Recursively copies a directory tree into `to`.
///
/// Existing files at the destination are overwritten; existing directories
/// are merged. Symlinks are recreated rather than followed.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from)
        .await
        .staging_context("reading source directory", from)?;
    if !metadata.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a directory")));
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<()> {
        std::fs::create_dir_all(&to).staging_context("creating directory", &to)?;

        for entry in walkdir::WalkDir::new(&from) {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .staging_context("reading symlink", entry.path())?;
                if dest_path.symlink_metadata().is_ok() {
                    std::fs::remove_file(&dest_path)
                        .staging_context("replacing symlink", &dest_path)?;
                }
                symlink(&target, &dest_path, entry.path().is_dir())
                    .staging_context("creating symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .staging_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path)
                    .staging_context("copying file", &dest_path)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

/// Marks a file as executable (0755). No-op on non-Unix hosts.
pub async fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting executable permission", path)?;
    }
    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// Writes a text file, replacing any previous content.
pub async fn write_text(path: &Path, content: &str, context: &'static str) -> Result<()> {
    fs::write(path, content).await.fs_context(context, path)
}

/// Writes a shell script with executable permissions.
pub async fn write_script(path: &Path, content: &str) -> Result<()> {
    write_text(path, content, "writing maintainer script").await?;
    set_executable(path).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_overwrites_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("app"), b"new").unwrap();
        std::fs::write(src.join("nested/lib.so"), b"lib").unwrap();

        std::fs::create_dir_all(&dst).unwrap();
        std::fs::write(dst.join("app"), b"old").unwrap();
        std::fs::write(dst.join("keep.txt"), b"keep").unwrap();

        copy_dir(&src, &dst).await.unwrap();
        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(dst.join("app")).unwrap(), b"new");
        assert_eq!(std::fs::read(dst.join("nested/lib.so")).unwrap(), b"lib");
        assert_eq!(std::fs::read(dst.join("keep.txt")).unwrap(), b"keep");
    }

    #[tokio::test]
    async fn copy_dir_rejects_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f");
        std::fs::write(&file, b"x").unwrap();
        assert!(copy_dir(&file, &dir.path().join("out")).await.is_err());
    }

    #[tokio::test]
    async fn copy_file_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("bin");
        std::fs::write(&src, b"v2").unwrap();
        let dst = dir.path().join("a/b/bin");
        std::fs::create_dir_all(dst.parent().unwrap()).unwrap();
        std::fs::write(&dst, b"v1").unwrap();

        copy_file(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"v2");
    }

    #[tokio::test]
    async fn copy_file_missing_source_is_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_file(&dir.path().join("nope"), &dir.path().join("out"))
            .await
            .unwrap_err();
        assert_eq!(err.kind_name(), "StagingIOError");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn scripts_are_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postinst");
        write_script(&path, "#!/bin/sh\n").await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
