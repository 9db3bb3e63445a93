//! Configuration structures for installer runs.
//!
//! [`Settings`] is the immutable input of one pipeline run: the project being
//! packaged, where its published binaries live, where installers go, and the
//! per-family knobs. It is constructed with [`SettingsBuilder`].

use crate::bundler::{
    error::{Context, Error, Result},
    platform::CATALOG,
};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default directory holding the per-family manifest templates.
pub const DEFAULT_TEMPLATE_DIRECTORY: &str = "templates";

/// Default external program used to build MSI packages.
pub const DEFAULT_MSI_PACKAGER: &str = "wix";

/// Default `Version` field of the Debian control file.
pub const DEFAULT_DEB_CONTROL_VERSION: &str = "1.0";

/// Derives the filesystem/package slug of a project name.
///
/// Lowercases the name and replaces every space with a hyphen.
///
/// ```
/// use kodegen_bundler_installer::bundler::slugify;
///
/// assert_eq!(slugify("Sample App"), "sample-app");
/// ```
pub fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// Four-part application version (`major.minor.build.revision`).
///
/// Parses one to four numeric components; missing trailing components are
/// zero-filled, so `"1.2"` becomes `1.2.0.0`. This is the shape Windows
/// Installer expects for `ProductVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ApplicationVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
    /// Build component
    pub build: u32,
    /// Revision component
    pub revision: u32,
}

impl ApplicationVersion {
    /// Creates a version from its four components.
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl FromStr for ApplicationVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if trimmed.is_empty() || parts.len() > 4 {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut numbers = [0u32; 4];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2], numbers[3]))
    }
}

impl fmt::Display for ApplicationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// The application being packaged.
///
/// The slug is always derived from the name; there is no way to set it on
/// its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    slug: String,
    manufacturer: String,
    version: ApplicationVersion,
    description: Option<String>,
}

impl Project {
    /// Creates a project description.
    pub fn new(
        name: impl Into<String>,
        manufacturer: impl Into<String>,
        version: ApplicationVersion,
    ) -> Self {
        let name = name.into();
        Self {
            slug: slugify(&name),
            name,
            manufacturer: manufacturer.into(),
            version,
            description: None,
        }
    }

    /// Sets a one-line description used in package metadata.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Renames the project, re-deriving its slug.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.slug = slugify(&self.name);
    }

    /// Human-readable product name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lowercase, hyphenated form of the name.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Publisher shown by the installer.
    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    /// Four-part product version.
    pub fn version(&self) -> ApplicationVersion {
        self.version
    }

    /// Package description, falling back to `"<name> launcher"`.
    pub fn description(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} launcher", self.name))
    }
}

/// MSI (Windows Installer) configuration.
///
/// # Configuration
///
/// ```toml
/// [msi]
/// packager = "wix"
/// extra_files = ["CustomAction.dll"]
/// ```
#[derive(Debug, Clone)]
pub struct MsiSettings {
    /// Program invoked as `<packager> build <manifest> -arch <arch> -o <msi>`.
    ///
    /// Default: `wix`
    pub packager: String,

    /// Files copied beside the staged binary before the manifest is written
    /// (custom actions, license files, ...).
    ///
    /// Default: Empty
    pub extra_files: Vec<PathBuf>,
}

impl Default for MsiSettings {
    fn default() -> Self {
        Self {
            packager: DEFAULT_MSI_PACKAGER.to_string(),
            extra_files: Vec::new(),
        }
    }
}

/// Debian package (.deb) configuration.
///
/// # Configuration
///
/// ```toml
/// [deb]
/// control_version = "1.0"
/// icon = "assets/app.xpm"
/// archive = true
/// ```
#[derive(Debug, Clone)]
pub struct DebianSettings {
    /// `Version` field written to `DEBIAN/control`.
    ///
    /// Default: `1.0`
    pub control_version: String,

    /// XPM icon installed as `usr/share/icons/<slug>.xpm`.
    ///
    /// Default: None
    pub icon: Option<PathBuf>,

    /// Whether to archive the staged `PackageData` tree into a `.deb`.
    ///
    /// Default: true
    pub archive: bool,
}

impl Default for DebianSettings {
    fn default() -> Self {
        Self {
            control_version: DEFAULT_DEB_CONTROL_VERSION.to_string(),
            icon: None,
            archive: true,
        }
    }
}

/// Main settings for one installer run.
#[derive(Clone, Debug)]
pub struct Settings {
    project: Project,
    build_root: PathBuf,
    output_directory: PathBuf,
    template_directory: PathBuf,
    platforms: Vec<String>,
    msi: MsiSettings,
    deb: DebianSettings,
    parallel: bool,
}

impl Settings {
    /// Returns the project being packaged.
    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Root directory holding one published-binary subtree per platform.
    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    /// Directory receiving one installer folder per platform.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Directory holding the manifest templates.
    pub fn template_directory(&self) -> &Path {
        &self.template_directory
    }

    /// Requested platform identifiers, in request order.
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// MSI settings.
    pub fn msi(&self) -> &MsiSettings {
        &self.msi
    }

    /// Debian settings.
    pub fn deb(&self) -> &DebianSettings {
        &self.deb
    }

    /// Whether platform pipelines run concurrently.
    pub fn parallel(&self) -> bool {
        self.parallel
    }
}

/// Builder for constructing [`Settings`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_installer::bundler::{ApplicationVersion, Project, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_installer::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .project(Project::new("Sample App", "Acme", "1.2.0.0".parse()?))
///     .build_root("builds/build-2024-01-01_00-00-00")
///     .platforms(vec!["win-x64".into(), "linux-x64".into()])
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    project: Option<Project>,
    build_root: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    template_directory: Option<PathBuf>,
    platforms: Option<Vec<String>>,
    msi: MsiSettings,
    deb: DebianSettings,
    parallel: bool,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the project metadata.
    ///
    /// # Required
    pub fn project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    /// Sets the build-output root directory.
    ///
    /// # Required
    pub fn build_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.build_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the installer output directory.
    ///
    /// Default: `<build root>/installers`
    pub fn output_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the template directory.
    ///
    /// Default: `templates`
    pub fn template_directory<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.template_directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the platform identifiers to package.
    ///
    /// Default: every platform in the catalog
    pub fn platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = Some(platforms);
        self
    }

    /// Sets MSI configuration.
    pub fn msi_settings(mut self, settings: MsiSettings) -> Self {
        self.msi = settings;
        self
    }

    /// Sets Debian configuration.
    pub fn deb_settings(mut self, settings: DebianSettings) -> Self {
        self.deb = settings;
        self
    }

    /// Runs platform pipelines concurrently.
    ///
    /// Default: false
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if `project` or `build_root` is missing.
    pub fn build(self) -> Result<Settings> {
        let project = self.project.context("project is required")?;
        let build_root = self.build_root.context("build_root is required")?;

        let output_directory = self
            .output_directory
            .unwrap_or_else(|| build_root.join("installers"));
        let template_directory = self
            .template_directory
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIRECTORY));
        let platforms = self
            .platforms
            .unwrap_or_else(|| CATALOG.iter().map(|p| p.id.to_string()).collect());

        Ok(Settings {
            project,
            build_root,
            output_directory,
            template_directory,
            platforms,
            msi: self.msi,
            deb: self.deb,
            parallel: self.parallel,
        })
    }
}
