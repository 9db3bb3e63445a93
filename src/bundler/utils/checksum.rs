//! Artifact checksum calculation.
//!
//! SHA-256 of a single installer file, or of a whole directory tree when the
//! artifact is an unarchived staging directory.

use crate::bundler::error::{ErrorExt, Result};
use crate::bail;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Calculates the hex-encoded SHA-256 of a file or directory.
///
/// Directories hash every file's relative path and content in sorted order,
/// so the result is deterministic.
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;

    if metadata.is_file() {
        let mut hasher = Sha256::new();
        hash_file(path, &mut hasher).await?;
        Ok(hex::encode(hasher.finalize()))
    } else if metadata.is_dir() {
        calculate_directory_sha256(path).await
    } else {
        bail!("Path is neither file nor directory: {}", path.display())
    }
}

/// Total size in bytes of a file or of every file under a directory.
pub async fn calculate_size(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading artifact metadata", path)?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }

    let mut total = 0u64;
    for entry in walkdir::WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

async fn hash_file(path: &Path, hasher: &mut Sha256) -> Result<()> {
    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hash calculation", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(())
}

async fn calculate_directory_sha256(dir_path: &Path) -> Result<String> {
    let mut entries: Vec<_> = walkdir::WalkDir::new(dir_path)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    entries.sort_by_key(|e| e.path().to_path_buf());

    let mut hasher = Sha256::new();
    for entry in entries {
        let rel_path = entry.path().strip_prefix(dir_path)?;
        hasher.update(rel_path.to_string_lossy().as_bytes());
        hash_file(entry.path(), &mut hasher).await?;
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_hash_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            calculate_sha256(&path).await.unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(calculate_size(&path).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn directory_hash_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("x/y")).unwrap();
        std::fs::write(dir.path().join("x/y/z"), b"1").unwrap();
        std::fs::write(dir.path().join("x/w"), b"22").unwrap();

        let first = calculate_sha256(dir.path()).await.unwrap();
        let second = calculate_sha256(dir.path()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(calculate_size(dir.path()).await.unwrap(), 3);
    }
}
