//! FreeDesktop.org desktop entry generation.
//!
//! The entry is written to `usr/share/applications/<slug>.desktop` inside
//! the staged package and launches `/usr/bin/<binary>`.

use crate::bundler::{
    error::{ErrorExt, Result},
    settings::Project,
    staging::DebLayout,
};
use std::path::PathBuf;

/// Where desktop entries live on the installed system.
pub const INSTALLED_APPLICATIONS_DIR: &str = "/usr/share/applications";

/// Where the application icon lives on the installed system.
pub const INSTALLED_ICONS_DIR: &str = "/usr/share/icons";

/// A desktop entry written into a staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    /// Staged path of the `.desktop` file
    pub path: PathBuf,
    /// File name, `<slug>.desktop`
    pub file_name: String,
}

impl DesktopEntry {
    /// Path of the entry once the package is installed.
    pub fn installed_path(&self) -> String {
        format!("{}/{}", INSTALLED_APPLICATIONS_DIR, self.file_name)
    }
}

/// Renders the desktop entry for `binary_name`.
pub fn desktop_entry_text(project: &Project, binary_name: &str) -> String {
    format!(
        "[Desktop Entry]\n\
         Encoding=UTF-8\n\
         Version=1.0\n\
         Type=Application\n\
         Terminal=false\n\
         Exec=/usr/bin/{binary_name}\n\
         Name={name}\n\
         Icon={icons}/{slug}.xpm\n",
        name = project.name(),
        icons = INSTALLED_ICONS_DIR,
        slug = project.slug(),
    )
}

/// Writes `<slug>.desktop` into the layout's applications directory.
pub async fn write_desktop_entry(
    layout: &DebLayout,
    project: &Project,
    binary_name: &str,
) -> Result<DesktopEntry> {
    let file_name = format!("{}.desktop", project.slug());
    let path = layout.applications.join(&file_name);

    tokio::fs::write(&path, desktop_entry_text(project, binary_name))
        .await
        .fs_context("writing desktop entry", &path)?;

    log::debug!("Wrote desktop entry {}", path.display());
    Ok(DesktopEntry { path, file_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::settings::ApplicationVersion;

    #[test]
    fn entry_points_at_installed_binary_and_icon() {
        let project = Project::new("Sample App", "Acme", ApplicationVersion::new(1, 2, 0, 0));
        let text = desktop_entry_text(&project, "sample");

        assert_eq!(
            text,
            "[Desktop Entry]\n\
             Encoding=UTF-8\n\
             Version=1.0\n\
             Type=Application\n\
             Terminal=false\n\
             Exec=/usr/bin/sample\n\
             Name=Sample App\n\
             Icon=/usr/share/icons/sample-app.xpm\n"
        );
    }

    #[test]
    fn installed_path_uses_file_name() {
        let entry = DesktopEntry {
            path: PathBuf::from("/tmp/x/sample-app.desktop"),
            file_name: "sample-app.desktop".into(),
        };
        assert_eq!(
            entry.installed_path(),
            "/usr/share/applications/sample-app.desktop"
        );
    }
}
