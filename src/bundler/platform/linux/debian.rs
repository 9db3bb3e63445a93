//! Debian package (.deb) manifests and archive.
//!
//! A .deb file is an ar archive containing:
//! - debian-binary: Format version (2.0)
//! - control.tar.gz: Package metadata (`DEBIAN/` of the staging tree)
//! - data.tar.gz: Files to install (everything else under `PackageData`)

use crate::bundler::{
    error::{Context, Error, ErrorExt, Result},
    platform::{Platform, linux::freedesktop::{self, DesktopEntry}},
    settings::{Project, Settings},
    staging::DebLayout,
    utils::fs::{write_script, write_text},
};
use flate2::{Compression, write::GzEncoder};
use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tar::HeaderMode;
use walkdir::WalkDir;

/// Contents of the `debian-binary` member.
const DEBIAN_BINARY: &str = "2.0\n";

/// Maintainer script run before unpacking. Intentionally does nothing yet.
pub const PREINST: &str = "#!/bin/sh\n\nexit 0\n";

/// Files written into `DEBIAN/` and `usr/share/applications/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebManifests {
    /// `DEBIAN/control`
    pub control: PathBuf,
    /// `DEBIAN/preinst`
    pub preinst: PathBuf,
    /// `DEBIAN/postinst`
    pub postinst: PathBuf,
    /// `usr/share/applications/<slug>.desktop`
    pub desktop_entry: DesktopEntry,
}

/// Renders `DEBIAN/control`.
pub fn control_text(project: &Project, control_version: &str) -> String {
    format!(
        "Package: {slug}-package\n\
         Version: {control_version}\n\
         Architecture: all\n\
         Essential: no\n\
         Priority: optional\n\
         Maintainer: {name}\n\
         Description: {description}\n",
        slug = project.slug(),
        name = project.name(),
        description = project.description(),
    )
}

/// Renders `DEBIAN/postinst`.
///
/// Takes the written [`DesktopEntry`] so the script always links the entry's
/// final file name.
pub fn postinst_text(binary_name: &str, entry: &DesktopEntry) -> String {
    format!(
        r#"#!/bin/sh

chmod +x /usr/bin/{binary_name}

if [ -n "$SUDO_USER" ]; then
    user_home=$(getent passwd "$SUDO_USER" | cut -d: -f6)
else
    user_home="$HOME"
fi

desktop_file_path="{installed}"
target_file_path="$user_home/Desktop/{file_name}"

if [ -d "$user_home/Desktop" ]; then
    ln -sf "$desktop_file_path" "$target_file_path"
    chmod +x "$target_file_path"
fi

exit 0
"#,
        installed = entry.installed_path(),
        file_name = entry.file_name,
    )
}

/// Writes the control file, desktop entry and maintainer scripts.
///
/// `postinst` is written last because it refers to the desktop entry.
pub async fn write_manifests(
    settings: &Settings,
    layout: &DebLayout,
    binary_name: &str,
) -> Result<DebManifests> {
    let project = settings.project();

    let control = layout.debian.join("control");
    write_text(
        &control,
        &control_text(project, &settings.deb().control_version),
        "writing control file",
    )
    .await?;

    let desktop_entry = freedesktop::write_desktop_entry(layout, project, binary_name).await?;

    let preinst = layout.debian.join("preinst");
    write_script(&preinst, PREINST).await?;

    let postinst = layout.debian.join("postinst");
    write_script(&postinst, &postinst_text(binary_name, &desktop_entry)).await?;

    log::info!("Wrote Debian manifests in {}", layout.debian.display());
    Ok(DebManifests {
        control,
        preinst,
        postinst,
        desktop_entry,
    })
}

/// `<slug>_<control version>_all.deb`
pub fn deb_file_name(slug: &str, control_version: &str) -> String {
    format!("{}_{}_all.deb", slug, control_version)
}

/// Final packaging step for a DEB platform.
///
/// Archives `PackageData` into `<root>/<slug>_<version>_all.deb`, or returns
/// the `PackageData` directory itself when archiving is disabled.
pub async fn package(settings: &Settings, platform: &Platform, layout: &DebLayout) -> Result<PathBuf> {
    if !settings.deb().archive {
        log::info!(
            "Archiving disabled for {}, package tree is {}",
            platform.id,
            layout.package_data.display()
        );
        return Ok(layout.package_data.clone());
    }

    let deb_path = layout.root.join(deb_file_name(
        settings.project().slug(),
        &settings.deb().control_version,
    ));
    build_deb(layout, &deb_path)
        .await
        .with_context(|| format!("failed to build {}", deb_path.display()))?;

    log::info!("Built {}", deb_path.display());
    Ok(deb_path)
}

/// Builds the ar archive from a staged layout.
async fn build_deb(layout: &DebLayout, deb_path: &Path) -> Result<()> {
    let control_tar_gz = tar_and_gzip_dir(layout.debian.clone(), None)
        .await
        .context("failed to tar/gzip control directory")?;
    let data_tar_gz = tar_and_gzip_dir(layout.package_data.clone(), Some(layout.debian.clone()))
        .await
        .context("failed to tar/gzip data directory")?;

    create_ar_archive(
        vec![
            ("debian-binary", DEBIAN_BINARY.as_bytes().to_vec()),
            ("control.tar.gz", control_tar_gz),
            ("data.tar.gz", data_tar_gz),
        ],
        deb_path,
    )
    .await
}

/// Creates an in-memory tar.gz of `src_dir`, skipping the `exclude` subtree.
///
/// Headers are deterministic: fixed mtime and ownership, modes preserved.
async fn tar_and_gzip_dir(src_dir: PathBuf, exclude: Option<PathBuf>) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
        let enc = GzEncoder::new(Vec::new(), Compression::default());
        let mut tar = tar::Builder::new(enc);

        let mut entries: Vec<_> = WalkDir::new(&src_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| exclude.as_deref() != Some(e.path()))
            .collect::<std::result::Result<_, _>>()?;
        entries.retain(|e| e.path() != src_dir.as_path());

        for entry in entries {
            let path = entry.path();
            let rel_path = path.strip_prefix(&src_dir)?;
            let metadata = std::fs::metadata(path).fs_context("reading metadata", path)?;

            let mut header = tar::Header::new_gnu();
            header.set_metadata_in_mode(&metadata, HeaderMode::Deterministic);

            if entry.file_type().is_dir() {
                tar.append_data(&mut header, rel_path, &mut io::empty())?;
            } else {
                let mut file = File::open(path).fs_context("opening file for archive", path)?;
                tar.append_data(&mut header, rel_path, &mut file)?;
            }
        }

        let enc = tar.into_inner()?;
        Ok(enc.finish()?)
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archive task failed: {}", e)))?
}

/// Writes the ar archive (the final .deb) from named in-memory members.
async fn create_ar_archive(members: Vec<(&'static str, Vec<u8>)>, dest: &Path) -> Result<()> {
    let tokio_file = tokio::fs::File::create(dest)
        .await
        .fs_context("creating .deb archive", dest)?;
    let dest_file = tokio_file.into_std().await;

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut builder = ar::Builder::new(dest_file);

        for (name, data) in members {
            let mut header = ar::Header::new(name.as_bytes().to_vec(), data.len() as u64);
            header.set_mode(0o100644);
            builder.append(&header, data.as_slice())?;
        }

        let mut finished = builder.into_inner()?;
        finished.flush()?;
        finished.sync_all()?;
        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archive task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{
        platform,
        settings::{ApplicationVersion, DebianSettings, SettingsBuilder},
        staging::{StagingBuilder, StagingTree},
    };
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn project() -> Project {
        Project::new("Sample App", "Acme", ApplicationVersion::new(1, 2, 0, 0))
    }

    async fn staged(dir: &Path, deb: DebianSettings) -> (Settings, DebLayout) {
        let settings = SettingsBuilder::new()
            .project(project())
            .build_root(dir.join("build"))
            .output_directory(dir.join("installers"))
            .deb_settings(deb)
            .build()
            .unwrap();
        let tree = StagingBuilder::new(settings.output_directory())
            .stage(platform::resolve("linux-x64").unwrap())
            .await
            .unwrap();
        let StagingTree::Deb(layout) = tree else {
            panic!("expected a DEB tree");
        };
        std::fs::write(layout.bin.join("sample"), b"\x7fELF").unwrap();
        (settings, layout)
    }

    fn member_names(deb: &[u8]) -> Vec<String> {
        let mut archive = ar::Archive::new(deb);
        let mut names = Vec::new();
        while let Some(entry) = archive.next_entry() {
            let entry = entry.unwrap();
            names.push(String::from_utf8_lossy(entry.header().identifier()).into_owned());
        }
        names
    }

    fn tar_paths(deb: &[u8], member: &str) -> Vec<String> {
        let mut archive = ar::Archive::new(deb);
        while let Some(entry) = archive.next_entry() {
            let mut entry = entry.unwrap();
            if entry.header().identifier() == member.as_bytes() {
                let mut gz = Vec::new();
                entry.read_to_end(&mut gz).unwrap();
                let mut tar = tar::Archive::new(GzDecoder::new(gz.as_slice()));
                return tar
                    .entries()
                    .unwrap()
                    .map(|e| e.unwrap().path().unwrap().display().to_string())
                    .collect();
            }
        }
        panic!("member {member} not found");
    }

    #[test]
    fn control_file_fields() {
        assert_eq!(
            control_text(&project(), "1.0"),
            "Package: sample-app-package\n\
             Version: 1.0\n\
             Architecture: all\n\
             Essential: no\n\
             Priority: optional\n\
             Maintainer: Sample App\n\
             Description: Sample App launcher\n"
        );
    }

    #[test]
    fn postinst_links_desktop_entry() {
        let entry = DesktopEntry {
            path: PathBuf::from("x/sample-app.desktop"),
            file_name: "sample-app.desktop".into(),
        };
        let script = postinst_text("sample", &entry);

        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("chmod +x /usr/bin/sample"));
        assert!(script.contains("desktop_file_path=\"/usr/share/applications/sample-app.desktop\""));
        assert!(script.contains("ln -sf \"$desktop_file_path\" \"$target_file_path\""));
        assert!(script.contains("chmod +x \"$target_file_path\""));
        assert!(script.contains("SUDO_USER"));
    }

    #[tokio::test]
    async fn manifests_are_written_into_layout() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, layout) = staged(dir.path(), DebianSettings::default()).await;

        let manifests = write_manifests(&settings, &layout, "sample").await.unwrap();

        let control = std::fs::read_to_string(&manifests.control).unwrap();
        assert!(control.contains("Package: sample-app-package"));
        assert!(control.contains("Version: 1.0"));
        assert_eq!(
            manifests.desktop_entry.path,
            layout.applications.join("sample-app.desktop")
        );
        assert_eq!(std::fs::read_to_string(&manifests.preinst).unwrap(), PREINST);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for script in [&manifests.preinst, &manifests.postinst] {
                let mode = std::fs::metadata(script).unwrap().permissions().mode();
                assert_eq!(mode & 0o777, 0o755);
            }
        }
    }

    #[tokio::test]
    async fn archive_splits_control_and_data() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, layout) = staged(dir.path(), DebianSettings::default()).await;
        write_manifests(&settings, &layout, "sample").await.unwrap();

        let deb = package(&settings, platform::resolve("linux-x64").unwrap(), &layout)
            .await
            .unwrap();
        assert_eq!(deb, layout.root.join("sample-app_1.0_all.deb"));

        let bytes = std::fs::read(&deb).unwrap();
        assert_eq!(
            member_names(&bytes),
            vec!["debian-binary", "control.tar.gz", "data.tar.gz"]
        );

        let control = tar_paths(&bytes, "control.tar.gz");
        assert!(control.contains(&"control".to_string()));
        assert!(control.contains(&"postinst".to_string()));

        let data = tar_paths(&bytes, "data.tar.gz");
        assert!(data.contains(&"usr/bin/sample".to_string()));
        assert!(data.contains(&"usr/share/applications/sample-app.desktop".to_string()));
        assert!(data.iter().all(|p| !p.contains("DEBIAN")));
    }

    #[tokio::test]
    async fn archive_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, layout) = staged(dir.path(), DebianSettings::default()).await;
        write_manifests(&settings, &layout, "sample").await.unwrap();
        let linux = platform::resolve("linux-x64").unwrap();

        let first = std::fs::read(package(&settings, linux, &layout).await.unwrap()).unwrap();
        let second = std::fs::read(package(&settings, linux, &layout).await.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn disabled_archive_returns_package_tree() {
        let dir = tempfile::tempdir().unwrap();
        let deb = DebianSettings {
            archive: false,
            ..Default::default()
        };
        let (settings, layout) = staged(dir.path(), deb).await;

        let artifact = package(&settings, platform::resolve("linux-x64").unwrap(), &layout)
            .await
            .unwrap();
        assert_eq!(artifact, layout.package_data);
        assert!(!layout.root.join("sample-app_1.0_all.deb").exists());
    }
}
