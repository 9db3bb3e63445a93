//! Command line interface for the installer packager.
//!
//! Merges flags with `installer.toml`, resolves the build root (collecting
//! publish folders first when asked), runs the [`Bundler`] and prints the
//! per-platform report.

mod args;
mod output;

pub use args::Args;
pub use output::OutputManager;

use crate::bundler::{
    ApplicationVersion, BuildArtifactSet, BundleReport, Bundler, CATALOG, DebianSettings,
    MsiSettings, NoopOpener, OutputOpener, PlatformOutcome, Project, Settings, SettingsBuilder,
    SystemOpener,
};
use crate::error::{CliError, Result};
use crate::metadata::InstallerManifest;
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute(args).await
}

/// Runs the installer for parsed arguments and returns the exit code.
///
/// Exit code is 0 when every platform was packaged, 1 otherwise.
pub async fn execute(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.json);

    if args.list_platforms {
        list_platforms(&output);
        return Ok(0);
    }

    args.validate()?;

    let manifest = InstallerManifest::discover(args.config.as_deref()).await?;
    let build_root = resolve_build_root(&args, &output).await?;
    let settings = build_settings(&args, &manifest, &build_root)?;

    let _ = output.section(&format!(
        "Packaging {} {}",
        settings.project().name(),
        settings.project().version()
    ));
    let _ = output.info(&format!("Build root: {}", settings.build_root().display()));

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling running packagers");
            ctrl_c.cancel();
        }
    });

    let opener: Box<dyn OutputOpener> = if args.no_open || args.json {
        Box::new(NoopOpener)
    } else {
        Box::new(SystemOpener)
    };

    let report = Bundler::new(settings)
        .bundle(opener.as_ref(), &cancel)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        print_report(&output, &report);
    }

    Ok(if report.all_packaged() { 0 } else { 1 })
}

fn list_platforms(output: &OutputManager) {
    let _ = output.section("Platforms");
    for platform in CATALOG {
        let _ = output.println(&format!(
            "{:<12} {:<14} {}",
            platform.id, platform.label, platform.family
        ));
    }
}

async fn resolve_build_root(args: &Args, output: &OutputManager) -> Result<PathBuf> {
    let set = match (&args.publish_root, &args.build_root) {
        (Some(publish_root), _) => {
            let set = BuildArtifactSet::collect(publish_root, &args.builds_dir).await?;
            let _ = output.success(&format!("Collected builds into {}", set.root().display()));
            set
        }
        (None, Some(build_root)) => BuildArtifactSet::open(build_root.as_path()).await?,
        (None, None) => {
            return Err(CliError::MissingArgument {
                argument: "build-root".to_string(),
            }
            .into());
        }
    };

    Ok(set.root().absolutize()?.into_owned())
}

/// Merges flags over `installer.toml` values into bundler [`Settings`].
pub fn build_settings(
    args: &Args,
    manifest: &InstallerManifest,
    build_root: &Path,
) -> Result<Settings> {
    let required = |flag: &Option<String>, file: &Option<String>, name: &str| {
        flag.clone()
            .or_else(|| file.clone())
            .ok_or_else(|| CliError::MissingArgument {
                argument: name.to_string(),
            })
    };

    let name = required(&args.name, &manifest.project.name, "name")?;
    let manufacturer = required(
        &args.manufacturer,
        &manifest.project.manufacturer,
        "manufacturer",
    )?;
    let version: ApplicationVersion =
        required(&args.version, &manifest.project.version, "version")?.parse()?;

    let mut project = Project::new(name, manufacturer, version);
    if let Some(description) = args
        .description
        .clone()
        .or_else(|| manifest.project.description.clone())
    {
        project = project.with_description(description);
    }

    let mut msi = MsiSettings::default();
    if let Some(packager) = args
        .msi_packager
        .clone()
        .or_else(|| manifest.msi.packager.clone())
    {
        msi.packager = packager;
    }
    msi.extra_files = manifest
        .msi
        .extra_files
        .iter()
        .chain(&args.extra_files)
        .cloned()
        .collect();

    let mut deb = DebianSettings::default();
    if let Some(control_version) = manifest.deb.control_version.clone() {
        deb.control_version = control_version;
    }
    deb.icon = args.icon.clone().or_else(|| manifest.deb.icon.clone());
    deb.archive = !args.no_archive && manifest.deb.archive.unwrap_or(true);

    let mut builder = SettingsBuilder::new()
        .project(project)
        .build_root(build_root)
        .msi_settings(msi)
        .deb_settings(deb)
        .parallel(args.parallel || manifest.build.parallel.unwrap_or(false));

    if let Some(output) = &args.output {
        builder = builder.output_directory(output);
    }
    if let Some(templates) = args.templates.as_ref().or(manifest.build.templates.as_ref()) {
        builder = builder.template_directory(templates);
    }
    if !args.platforms.is_empty() {
        builder = builder.platforms(args.platforms.clone());
    } else if !manifest.build.platforms.is_empty() {
        builder = builder.platforms(manifest.build.platforms.clone());
    }

    Ok(builder.build()?)
}

fn print_report(output: &OutputManager, report: &BundleReport) {
    let _ = output.section("Installers");

    for (platform, outcome) in report.outcomes() {
        match outcome {
            PlatformOutcome::Packaged(artifact) => {
                let _ = output.success(&format!("{}: {}", platform, artifact.path.display()));
                if let (Some(size), Some(checksum)) = (artifact.size, &artifact.checksum) {
                    let _ = output.indent(&format!("{} bytes, sha256 {}", size, checksum));
                }
            }
            PlatformOutcome::Failed { stage, error } => {
                output.error(&format!(
                    "{}: {} (after {}, {})",
                    platform,
                    error,
                    stage,
                    error.kind_name()
                ));
            }
        }
    }

    let packaged = report.artifacts().count();
    let total = report.outcomes().len();
    let summary = format!(
        "{} of {} platforms packaged into {}",
        packaged,
        total,
        report.output_directory().display()
    );
    if report.all_packaged() {
        let _ = output.success(&summary);
    } else {
        let _ = output.warn(&summary);
    }
}
