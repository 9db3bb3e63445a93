//! WiX product manifest generation.
//!
//! Renders `msi/ProductTemplate.wxs` from the template directory with the
//! project metadata and writes it beside the staged binary as
//! `<slug>-<platform>.wxs`.

use crate::bundler::{
    error::{ErrorExt, Result},
    locator::BinaryFile,
    platform::Platform,
    settings::{Project, Settings},
    template::{TemplateEngine, template_path},
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Location of the MSI template inside the template directory.
pub const TEMPLATE: &str = "msi/ProductTemplate.wxs";

/// A written WiX manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsiManifest {
    /// Path of the `.wxs` file
    pub path: PathBuf,
    /// Package identifier generated for this build (`ProductCode`)
    pub guid: String,
    /// Product family identifier shared by every build (`UpgradeCode`)
    pub upgrade_code: String,
}

/// Generates a fresh package identifier: an uppercase, hyphenated UUID v4.
///
/// A new identifier per build lets Windows Installer recognize upgrades.
pub fn new_package_guid() -> String {
    uuid::Uuid::new_v4()
        .hyphenated()
        .to_string()
        .to_uppercase()
}

/// Stable upgrade code of a product: a UUID v5 of `<manufacturer>/<name>`.
///
/// Every version of the same product shares it, so `MajorUpgrade` finds the
/// installed one.
pub fn upgrade_code(project: &Project) -> String {
    let key = format!("{}/{}", project.manufacturer(), project.name());
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, key.as_bytes())
        .hyphenated()
        .to_string()
        .to_uppercase()
}

/// `<slug>-<platform>.wxs`
pub fn manifest_file_name(slug: &str, platform: &Platform) -> String {
    format!("{}-{}.wxs", slug, platform.id)
}

/// Builds the template substitution map for one MSI build.
///
/// Values are XML-escaped since they land in `.wxs` attributes.
pub fn substitutions(
    settings: &Settings,
    binary: &BinaryFile,
    guid: &str,
) -> BTreeMap<String, String> {
    let project = settings.project();
    [
        ("ApplicationName", project.name().to_string()),
        ("ExecutableName", binary.file_name().to_string()),
        ("ExecutablePath", binary.file_name().to_string()),
        ("Manufacturer", project.manufacturer().to_string()),
        ("ApplicationVersion", project.version().to_string()),
        ("ApplicationGuid", guid.to_string()),
        ("UpgradeCode", upgrade_code(project)),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), handlebars::html_escape(&value)))
    .collect()
}

/// Renders and writes the platform's WiX manifest into `staging_root`.
///
/// # Errors
///
/// - [`TemplateRead`](crate::bundler::Error::TemplateRead) if the template is missing.
/// - [`UnresolvedPlaceholder`](crate::bundler::Error::UnresolvedPlaceholder) if it
///   declares a token outside the substitution map.
/// - [`Fs`](crate::bundler::Error::Fs) if the manifest cannot be written.
pub async fn write_manifest(
    settings: &Settings,
    platform: &Platform,
    staging_root: &Path,
    binary: &BinaryFile,
) -> Result<MsiManifest> {
    let template = TemplateEngine::load(&template_path(settings.template_directory(), TEMPLATE))
        .await?;

    let guid = new_package_guid();
    let upgrade_code = upgrade_code(settings.project());
    let content = template.render(&substitutions(settings, binary, &guid))?;

    let path = staging_root.join(manifest_file_name(settings.project().slug(), platform));
    tokio::fs::write(&path, content)
        .await
        .fs_context("writing MSI manifest", &path)?;

    log::info!("Wrote MSI manifest {} ({})", path.display(), guid);
    Ok(MsiManifest {
        path,
        guid,
        upgrade_code,
    })
}
