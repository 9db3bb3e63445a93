//! Published-binary discovery.
//!
//! Each platform's published output lives in `<build root>/<platform id>/`.
//! The folder must hold exactly one file that is not a debug-symbol file;
//! that file is the binary to package.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    platform::Platform,
};
use std::path::{Path, PathBuf};

/// File extensions treated as debug symbols.
const DEBUG_SYMBOL_EXTENSIONS: &[&str] = &["pdb", "dbg", "debug", "sym"];

/// The published binary selected for a platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFile {
    path: PathBuf,
    file_name: String,
}

impl BinaryFile {
    /// Full path of the binary inside the build root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name, e.g. `sample` or `Sample.exe`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Returns true when `path` is a debug-symbol file (`.pdb`, `.dbg`, ...).
pub fn is_debug_symbol(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            DEBUG_SYMBOL_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s))
        })
        .unwrap_or(false)
}

/// Finds the platform's published binary under `build_directory`.
///
/// Only the top level of the platform folder is scanned.
///
/// # Errors
///
/// - [`Error::BinaryNotFound`] if the platform folder is missing or holds no
///   qualifying file.
/// - [`Error::AmbiguousBinary`] if more than one file qualifies.
pub async fn locate(build_directory: &Path, platform: &Platform) -> Result<BinaryFile> {
    let directory = build_directory.join(platform.id);

    let mut entries = match tokio::fs::read_dir(&directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::BinaryNotFound {
                platform: platform.id.to_string(),
                directory,
            });
        }
        Err(e) => return Err(e).fs_context("reading build directory", &directory),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading build directory", &directory)?
    {
        let file_type = entry
            .file_type()
            .await
            .fs_context("reading file type", entry.path())?;
        let path = entry.path();
        if file_type.is_file() && !is_debug_symbol(&path) {
            candidates.push(path);
        } else {
            log::debug!("Skipping {} while locating binary", path.display());
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(Error::BinaryNotFound {
            platform: platform.id.to_string(),
            directory,
        }),
        1 => {
            let path = candidates.remove(0);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            log::debug!("Located {} binary: {}", platform.id, path.display());
            Ok(BinaryFile { path, file_name })
        }
        _ => Err(Error::AmbiguousBinary {
            platform: platform.id.to_string(),
            directory,
            candidates,
        }),
    }
}
