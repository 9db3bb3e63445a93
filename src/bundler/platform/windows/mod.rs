//! Windows Installer (.msi) packaging.
//!
//! MSI platforms stage into a flat folder: the published binary, any extra
//! payload files, and a WiX manifest rendered by [`manifest`]. The WiX
//! toolset then builds the package in that folder:
//!
//! ```text
//! wix build <slug>-<platform>.wxs -arch <x64|x86|arm64> -o <slug>-<platform>.msi
//! ```
//!
//! The packager program is configurable (`[msi] packager`), default `wix`.

pub mod manifest;

use crate::bundler::{
    error::Result,
    packager::{self, PackagerCommand},
    platform::{Arch, Platform},
    settings::Settings,
};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// WiX `-arch` value for a platform architecture.
pub fn wix_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::X86_64 => "x64",
        Arch::X86 => "x86",
        Arch::AArch64 => "arm64",
    }
}

/// `<slug>-<platform>.msi`
pub fn msi_file_name(slug: &str, platform: &Platform) -> String {
    format!("{}-{}.msi", slug, platform.id)
}

/// Builds the packager command line for a written manifest.
pub fn build_command(
    packager: &str,
    manifest: &Path,
    platform: &Platform,
    slug: &str,
) -> PackagerCommand {
    let manifest_name = manifest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| manifest.as_os_str().to_os_string());

    PackagerCommand::new(packager)
        .arg("build")
        .arg(manifest_name)
        .args(["-arch", wix_arch(platform.arch)])
        .arg("-o")
        .arg(msi_file_name(slug, platform))
}

/// Runs the MSI packager in the staging folder and returns the package path.
pub async fn package(
    settings: &Settings,
    platform: &Platform,
    staging_root: &Path,
    manifest: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    let slug = settings.project().slug();
    let command = build_command(&settings.msi().packager, manifest, platform, slug);

    packager::invoke(&command, staging_root, cancel).await?;

    let msi = staging_root.join(msi_file_name(slug, platform));
    log::info!("Built {}", msi.display());
    Ok(msi)
}
