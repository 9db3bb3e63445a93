use kodegen_bundler_installer::bundler::{
    ApplicationVersion, Bundler, DebianSettings, Error, MsiSettings, NoopOpener,
    PlatformOutcome, PlatformState, Project, Settings, SettingsBuilder,
};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const WXS_TEMPLATE: &str = r#"<Package Name="{{ApplicationName}}" Manufacturer="{{Manufacturer}}" Version="{{ApplicationVersion}}" ProductCode="{{ApplicationGuid}}" UpgradeCode="{{UpgradeCode}}">
  <File Source="{{ExecutablePath}}" Name="{{ExecutableName}}" />
</Package>
"#;

fn project() -> Project {
    Project::new("Sample App", "Acme", "1.2.0.0".parse::<ApplicationVersion>().unwrap())
}

fn publish(root: &Path, platform: &str, binary: &str) {
    let dir = root.join(platform);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(binary), b"\x7fELF binary").unwrap();
    fs::write(dir.join(format!("{binary}.pdb")), b"symbols").unwrap();
}

fn templates(root: &Path) -> std::path::PathBuf {
    let dir = root.join("templates");
    fs::create_dir_all(dir.join("msi")).unwrap();
    fs::write(dir.join("msi/ProductTemplate.wxs"), WXS_TEMPLATE).unwrap();
    dir
}

fn settings(root: &Path, platforms: &[&str], packager: &str, archive: bool) -> Settings {
    SettingsBuilder::new()
        .project(project())
        .build_root(root.join("build"))
        .template_directory(templates(root))
        .platforms(platforms.iter().map(|p| p.to_string()).collect())
        .msi_settings(MsiSettings {
            packager: packager.to_string(),
            ..MsiSettings::default()
        })
        .deb_settings(DebianSettings {
            archive,
            ..DebianSettings::default()
        })
        .build()
        .unwrap()
}

async fn bundle(settings: Settings) -> kodegen_bundler_installer::bundler::BundleReport {
    Bundler::new(settings)
        .bundle(&NoopOpener, &CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn linux_tree_contains_control_desktop_entry_and_binary() {
    let dir = tempfile::tempdir().unwrap();
    publish(&dir.path().join("build"), "linux-x64", "sample");

    let report = bundle(settings(dir.path(), &["linux-x64"], "true", false)).await;
    assert!(report.all_packaged());

    let package_data = dir.path().join("build/installers/linux-x64/PackageData");
    let control = fs::read_to_string(package_data.join("DEBIAN/control")).unwrap();
    assert!(control.contains("Package: sample-app-package\n"));
    assert!(control.contains("Maintainer: Sample App\n"));
    assert!(control.contains("Description: Sample App launcher\n"));

    let desktop =
        fs::read_to_string(package_data.join("usr/share/applications/sample-app.desktop"))
            .unwrap();
    assert!(desktop.contains("Exec=/usr/bin/sample\n"));
    assert!(desktop.contains("Name=Sample App\n"));

    assert_eq!(
        fs::read(package_data.join("usr/bin/sample")).unwrap(),
        fs::read(dir.path().join("build/linux-x64/sample")).unwrap()
    );
    assert!(!package_data.join("usr/bin/sample.pdb").exists());

    let artifact = report.get("linux-x64").and_then(|o| o.artifact()).unwrap();
    assert_eq!(artifact.path, package_data);
}

#[tokio::test]
async fn second_run_does_not_package_files_from_the_first() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "linux-x64", "old-name");

    let first = bundle(settings(dir.path(), &["linux-x64"], "true", false)).await;
    assert!(first.all_packaged());

    fs::remove_dir_all(build.join("linux-x64")).unwrap();
    publish(&build, "linux-x64", "sample");

    let second = bundle(settings(dir.path(), &["linux-x64"], "true", false)).await;
    assert!(second.all_packaged());

    let bin = build.join("installers/linux-x64/PackageData/usr/bin");
    let names: Vec<String> = fs::read_dir(&bin)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["sample"]);
}

#[tokio::test]
async fn linux_archive_is_written_and_hashed() {
    let dir = tempfile::tempdir().unwrap();
    publish(&dir.path().join("build"), "linux-x64", "sample");

    let report = bundle(settings(dir.path(), &["linux-x64"], "true", true)).await;

    let artifact = report.get("linux-x64").and_then(|o| o.artifact()).unwrap();
    assert_eq!(
        artifact.path,
        dir.path().join("build/installers/linux-x64/sample-app_1.0_all.deb")
    );
    let bytes = fs::read(&artifact.path).unwrap();
    assert!(bytes.starts_with(b"!<arch>\n"));
    assert_eq!(artifact.size, Some(bytes.len() as u64));
    assert_eq!(artifact.checksum.as_ref().map(String::len), Some(64));
}

#[cfg(unix)]
#[tokio::test]
async fn missing_platform_binary_fails_only_that_platform() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "win-x64", "Sample.exe");
    publish(&build, "linux-x64", "sample");

    let report = bundle(settings(
        dir.path(),
        &["win-x64", "win-x86", "linux-x64"],
        "true",
        false,
    ))
    .await;

    assert!(report.any_packaged());
    assert!(!report.all_packaged());
    assert!(report.get("win-x64").unwrap().is_packaged());
    assert!(report.get("linux-x64").unwrap().is_packaged());

    match report.get("win-x86").unwrap() {
        PlatformOutcome::Failed { stage, error } => {
            assert_eq!(*stage, PlatformState::Pending);
            assert!(matches!(error.root_cause(), Error::BinaryNotFound { .. }));
        }
        other => panic!("expected failure, got {other}"),
    }

    let wxs = fs::read_to_string(
        build.join("installers/win-x64/sample-app-win-x64.wxs"),
    )
    .unwrap();
    assert!(wxs.contains(r#"Name="Sample App""#));
    assert!(wxs.contains(r#"Version="1.2.0.0""#));
    assert!(wxs.contains(r#"Source="Sample.exe""#));
    assert!(build.join("installers/win-x64/Sample.exe").is_file());
}

#[tokio::test]
async fn blocked_staging_folder_does_not_affect_other_platforms() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "win-x64", "Sample.exe");
    publish(&build, "linux-x64", "sample");
    fs::create_dir_all(build.join("installers")).unwrap();
    fs::write(build.join("installers/win-x64"), b"not a directory").unwrap();

    let report = bundle(settings(dir.path(), &["win-x64", "linux-x64"], "true", false)).await;

    match report.get("win-x64").unwrap() {
        PlatformOutcome::Failed { stage, error } => {
            assert_eq!(*stage, PlatformState::Located);
            assert_eq!(error.kind_name(), "StagingIOError");
        }
        other => panic!("expected failure, got {other}"),
    }
    assert!(report.get("linux-x64").unwrap().is_packaged());
}

#[cfg(unix)]
#[tokio::test]
async fn every_msi_build_gets_a_fresh_guid() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "win-x64", "Sample.exe");
    let manifest = build.join("installers/win-x64/sample-app-win-x64.wxs");

    let attribute = |text: &str, name: &str| {
        text.split(&format!("{name}=\""))
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string()
    };

    let mut product_codes = Vec::new();
    let mut upgrade_codes = Vec::new();
    for _ in 0..2 {
        bundle(settings(dir.path(), &["win-x64"], "true", false)).await;
        let text = fs::read_to_string(&manifest).unwrap();
        let guid = attribute(&text, "ProductCode");
        assert_eq!(guid, guid.to_uppercase());
        product_codes.push(guid);
        upgrade_codes.push(attribute(&text, "UpgradeCode"));
    }
    assert_ne!(product_codes[0], product_codes[1]);
    assert_eq!(upgrade_codes[0], upgrade_codes[1]);
    assert_ne!(product_codes[0], upgrade_codes[0]);
}

#[cfg(unix)]
#[tokio::test]
async fn msi_manifest_escapes_xml_special_characters() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "win-x64", "Sample.exe");

    let settings = SettingsBuilder::new()
        .project(Project::new(
            "Tools & <More>",
            "Smith & \"Sons\"",
            ApplicationVersion::new(1, 0, 0, 0),
        ))
        .build_root(&build)
        .template_directory(templates(dir.path()))
        .platforms(vec!["win-x64".into()])
        .msi_settings(MsiSettings {
            packager: "true".into(),
            ..MsiSettings::default()
        })
        .build()
        .unwrap();
    let report = bundle(settings).await;
    assert!(report.all_packaged());

    let wxs =
        fs::read_to_string(build.join("installers/win-x64/tools-&-<more>-win-x64.wxs")).unwrap();
    assert!(wxs.contains(r#"Name="Tools &amp; &lt;More&gt;""#));
    assert!(wxs.contains(r#"Manufacturer="Smith &amp; &quot;Sons&quot;""#));
}

#[cfg(unix)]
#[tokio::test]
async fn failing_packager_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    publish(&dir.path().join("build"), "win-x64", "Sample.exe");

    let report = bundle(settings(dir.path(), &["win-x64"], "false", false)).await;

    match report.get("win-x64").unwrap() {
        PlatformOutcome::Failed { stage, error } => {
            assert_eq!(*stage, PlatformState::ManifestWritten);
            match error.root_cause() {
                Error::PackagingFailed { exit_code, .. } => assert_eq!(*exit_code, Some(1)),
                other => panic!("expected PackagingFailed, got {other}"),
            }
        }
        other => panic!("expected failure, got {other}"),
    }
}

#[tokio::test]
async fn parallel_run_matches_sequential_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let build = dir.path().join("build");
    publish(&build, "linux-x64", "sample");
    publish(&build, "linux-arm64", "sample");

    let mut settings = SettingsBuilder::new()
        .project(project())
        .build_root(&build)
        .platforms(vec!["linux-x64".into(), "linux-arm64".into(), "win-x86".into()])
        .parallel(true);
    settings = settings.deb_settings(DebianSettings {
        archive: false,
        ..DebianSettings::default()
    });

    let report = bundle(settings.build().unwrap()).await;
    assert_eq!(report.outcomes().len(), 3);
    assert!(report.get("linux-x64").unwrap().is_packaged());
    assert!(report.get("linux-arm64").unwrap().is_packaged());
    assert!(!report.get("win-x86").unwrap().is_packaged());
}
