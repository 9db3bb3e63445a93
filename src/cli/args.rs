//! Command line argument parsing and validation.

use crate::error::CliError;
use clap::Parser;
use std::path::PathBuf;

/// Package published binaries into MSI and Debian installers
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "kodegen_bundler_installer",
    version,
    disable_version_flag = true,
    about = "Package published binaries into MSI and Debian installers",
    long_about = "Stage per-platform published binaries, write installer manifests, and run the packagers.

Usage:
  kodegen_bundler_installer --build-root builds/build-2024-01-01_00-00-00 --name \"Sample App\" --manufacturer Acme --version 1.2.0.0
  kodegen_bundler_installer --publish-root src/App/bin/Release -p win-x64 -p linux-x64
  kodegen_bundler_installer --list-platforms"
)]
pub struct Args {
    /// Build-output root holding one folder per platform
    #[arg(long, value_name = "DIR", conflicts_with = "publish_root")]
    pub build_root: Option<PathBuf>,

    /// Collect `publish` folders under DIR into a new timestamped build folder first
    #[arg(long, value_name = "DIR")]
    pub publish_root: Option<PathBuf>,

    /// Where collected build folders are created
    #[arg(long, value_name = "DIR", default_value = "builds")]
    pub builds_dir: PathBuf,

    /// Installer output directory [default: <build root>/installers]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Platform to package (repeatable) [default: every platform]
    #[arg(short, long = "platform", value_name = "ID")]
    pub platforms: Vec<String>,

    /// Product name
    #[arg(long, env = "INSTALLER_NAME")]
    pub name: Option<String>,

    /// Manufacturer / maintainer
    #[arg(long, env = "INSTALLER_MANUFACTURER")]
    pub manufacturer: Option<String>,

    /// Product version, 1 to 4 numeric parts
    #[arg(long, env = "INSTALLER_VERSION")]
    pub version: Option<String>,

    /// Package description [default: "<name> launcher"]
    #[arg(long)]
    pub description: Option<String>,

    /// Template directory holding msi/ProductTemplate.wxs
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// XPM icon installed with Debian packages
    #[arg(long, value_name = "FILE")]
    pub icon: Option<PathBuf>,

    /// Program used to build MSI packages
    #[arg(long, value_name = "PROGRAM")]
    pub msi_packager: Option<String>,

    /// Extra file shipped beside the MSI binary (repeatable)
    #[arg(long = "extra-file", value_name = "FILE")]
    pub extra_files: Vec<PathBuf>,

    /// Keep Debian packages as staged trees instead of .deb archives
    #[arg(long)]
    pub no_archive: bool,

    /// Package platforms concurrently
    #[arg(long)]
    pub parallel: bool,

    /// Do not open the output folder when done
    #[arg(long)]
    pub no_open: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Configuration file [default: installer.toml if present]
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List supported platforms and exit
    #[arg(long)]
    pub list_platforms: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if self.list_platforms {
            return Ok(());
        }

        if self.build_root.is_none() && self.publish_root.is_none() {
            return Err(CliError::MissingArgument {
                argument: "build-root".to_string(),
            });
        }

        if self.platforms.iter().any(|p| p.trim().is_empty()) {
            return Err(CliError::InvalidArguments {
                reason: "platform identifiers must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeatable_flags_accumulate() {
        let args = Args::try_parse_from([
            "kodegen_bundler_installer",
            "--build-root",
            "b",
            "-p",
            "win-x64",
            "--platform",
            "linux-x64",
            "--extra-file",
            "a.dll",
            "--extra-file",
            "b.dll",
        ])
        .unwrap();

        assert_eq!(args.platforms, vec!["win-x64", "linux-x64"]);
        assert_eq!(args.extra_files.len(), 2);
        assert_eq!(args.builds_dir, PathBuf::from("builds"));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn build_and_publish_roots_conflict() {
        let result = Args::try_parse_from([
            "kodegen_bundler_installer",
            "--build-root",
            "b",
            "--publish-root",
            "p",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn version_flag_is_the_product_version() {
        let args = Args::try_parse_from([
            "kodegen_bundler_installer",
            "--build-root",
            "b",
            "--version",
            "1.2.0.0",
        ])
        .unwrap();
        assert_eq!(args.version.as_deref(), Some("1.2.0.0"));
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn a_root_is_required() {
        let args = Args::try_parse_from(["kodegen_bundler_installer"]).unwrap();
        assert!(matches!(
            args.validate(),
            Err(CliError::MissingArgument { .. })
        ));
    }
}
