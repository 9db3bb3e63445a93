//! Installer orchestration.
//!
//! This module provides the main [`Bundler`] orchestrator. For every requested
//! platform it runs one pipeline:
//!
//! ```text
//! Pending -> Located -> Staged -> ManifestWritten -> Packaged -> Done
//!    \_________\__________\___________\______________\--> Failed
//! ```
//!
//! 1. Locates the published binary ([`locator`])
//! 2. Builds the staging tree and copies payload into it ([`staging`])
//! 3. Writes the family's manifests ([`windows::manifest`], [`debian`])
//! 4. Runs the packager ([`windows::package`], [`debian::package`])
//!
//! Platforms are independent. A failure is recorded against its platform and
//! the remaining platforms carry on, so a run can end in partial success.
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_installer::bundler::{
//!     Bundler, NoopOpener, Project, SettingsBuilder,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> kodegen_bundler_installer::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .project(Project::new("Sample App", "Acme", "1.2.0.0".parse()?))
//!     .build_root("builds/build-2024-01-01_00-00-00")
//!     .platforms(vec!["win-x64".into(), "linux-x64".into()])
//!     .build()?;
//!
//! let report = Bundler::new(settings)
//!     .bundle(&NoopOpener, &CancellationToken::new())
//!     .await?;
//!
//! for (platform, outcome) in report.outcomes() {
//!     println!("{platform}: {outcome}");
//! }
//! # Ok(())
//! # }
//! ```

use crate::bundler::{
    Error, InstallerArtifact, Result, Settings,
    locator,
    opener::OutputOpener,
    platform::{
        self, Platform,
        linux::debian,
        windows::{self, manifest},
    },
    staging::{StagingBuilder, StagingTree},
    utils::fs::ensure_dir,
};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Progress of one platform's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum PlatformState {
    /// Not started
    Pending,
    /// Published binary found
    Located,
    /// Staging tree built and payload copied
    Staged,
    /// Manifests written
    ManifestWritten,
    /// Packager finished
    Packaged,
    /// Artifact described
    Done,
    /// Pipeline stopped; the outcome carries the reason
    Failed,
}

impl fmt::Display for PlatformState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Terminal result for one platform.
#[derive(Debug)]
pub enum PlatformOutcome {
    /// The platform produced an installer.
    Packaged(InstallerArtifact),
    /// The platform failed after reaching `stage`.
    Failed {
        /// Last state reached before the failure
        stage: PlatformState,
        /// What went wrong
        error: Error,
    },
}

impl PlatformOutcome {
    /// The artifact, if packaged.
    pub fn artifact(&self) -> Option<&InstallerArtifact> {
        match self {
            PlatformOutcome::Packaged(artifact) => Some(artifact),
            PlatformOutcome::Failed { .. } => None,
        }
    }

    /// The failure, if failed.
    pub fn error(&self) -> Option<&Error> {
        match self {
            PlatformOutcome::Packaged(_) => None,
            PlatformOutcome::Failed { error, .. } => Some(error),
        }
    }

    /// Whether the platform produced an installer.
    pub fn is_packaged(&self) -> bool {
        matches!(self, PlatformOutcome::Packaged(_))
    }
}

impl fmt::Display for PlatformOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformOutcome::Packaged(artifact) => write!(f, "{}", artifact.path.display()),
            PlatformOutcome::Failed { stage, error } => {
                write!(f, "failed after {}: {}", stage, error)
            }
        }
    }
}

/// Per-platform results of one run.
#[derive(Debug)]
pub struct BundleReport {
    output_directory: PathBuf,
    outcomes: BTreeMap<String, PlatformOutcome>,
}

impl BundleReport {
    /// Installer output root.
    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Outcome per platform identifier.
    pub fn outcomes(&self) -> &BTreeMap<String, PlatformOutcome> {
        &self.outcomes
    }

    /// Outcome of one platform.
    pub fn get(&self, platform: &str) -> Option<&PlatformOutcome> {
        self.outcomes.get(platform)
    }

    /// Artifacts of the platforms that succeeded.
    pub fn artifacts(&self) -> impl Iterator<Item = &InstallerArtifact> {
        self.outcomes.values().filter_map(PlatformOutcome::artifact)
    }

    /// `(platform, error)` for the platforms that failed.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.error().map(|e| (id.as_str(), e)))
    }

    /// True if at least one platform produced an installer.
    pub fn any_packaged(&self) -> bool {
        self.outcomes.values().any(PlatformOutcome::is_packaged)
    }

    /// True if every platform produced an installer.
    pub fn all_packaged(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.values().all(PlatformOutcome::is_packaged)
    }

    /// Machine-readable form of the report.
    pub fn to_json(&self) -> serde_json::Value {
        let platforms: serde_json::Map<String, serde_json::Value> = self
            .outcomes
            .iter()
            .map(|(id, outcome)| {
                let value = match outcome {
                    PlatformOutcome::Packaged(artifact) => serde_json::json!({
                        "status": "packaged",
                        "artifact": artifact,
                    }),
                    PlatformOutcome::Failed { stage, error } => serde_json::json!({
                        "status": "failed",
                        "stage": stage,
                        "kind": error.kind_name(),
                        "error": error.to_string(),
                    }),
                };
                (id.clone(), value)
            })
            .collect();

        serde_json::json!({
            "output_directory": self.output_directory,
            "platforms": platforms,
        })
    }
}

/// One platform's run through the pipeline.
struct PlatformPipeline<'a> {
    settings: &'a Settings,
    platform: &'static Platform,
    state: PlatformState,
}

impl<'a> PlatformPipeline<'a> {
    fn new(settings: &'a Settings, platform: &'static Platform) -> Self {
        Self {
            settings,
            platform,
            state: PlatformState::Pending,
        }
    }

    fn advance(&mut self, next: PlatformState) {
        log::debug!("{}: {} -> {}", self.platform.id, self.state, next);
        self.state = next;
    }

    async fn run(mut self, cancel: &CancellationToken) -> PlatformOutcome {
        match self.execute(cancel).await {
            Ok(artifact) => {
                log::info!("{}: packaged {}", self.platform.id, artifact.path.display());
                PlatformOutcome::Packaged(artifact)
            }
            Err(error) => {
                log::error!("{}: failed after {}: {}", self.platform.id, self.state, error);
                let stage = self.state;
                self.advance(PlatformState::Failed);
                PlatformOutcome::Failed { stage, error }
            }
        }
    }

    async fn execute(&mut self, cancel: &CancellationToken) -> Result<InstallerArtifact> {
        let settings = self.settings;
        let platform = self.platform;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let binary = locator::locate(settings.build_root(), platform).await?;
        self.advance(PlatformState::Located);

        let tree = StagingBuilder::new(settings.output_directory())
            .restage(platform)
            .await?;
        tree.install_binary(&binary).await?;
        match &tree {
            StagingTree::Msi { .. } => {
                tree.install_extra_files(&settings.msi().extra_files).await?;
            }
            StagingTree::Deb(_) => {
                tree.install_icon(settings.deb().icon.as_deref(), settings.project().slug())
                    .await?;
            }
        }
        self.advance(PlatformState::Staged);

        let msi_manifest = match &tree {
            StagingTree::Msi { root } => {
                Some(manifest::write_manifest(settings, platform, root, &binary).await?)
            }
            StagingTree::Deb(layout) => {
                debian::write_manifests(settings, layout, binary.file_name()).await?;
                None
            }
        };
        self.advance(PlatformState::ManifestWritten);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let package_path = match (&tree, msi_manifest) {
            (StagingTree::Msi { root }, Some(msi_manifest)) => {
                windows::package(settings, platform, root, &msi_manifest.path, cancel).await?
            }
            (StagingTree::Deb(layout), _) => debian::package(settings, platform, layout).await?,
            (StagingTree::Msi { .. }, None) => {
                crate::bail!("{}: MSI manifest missing before packaging", platform.id)
            }
        };
        self.advance(PlatformState::Packaged);

        let artifact = InstallerArtifact::describe(platform, package_path).await?;
        self.advance(PlatformState::Done);
        Ok(artifact)
    }
}

/// Main installer orchestrator.
///
/// Holds the run's immutable [`Settings`] and drives one pipeline per
/// requested platform.
#[derive(Debug, Clone)]
pub struct Bundler {
    settings: Arc<Settings>,
}

impl Bundler {
    /// Creates a bundler for `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    /// Returns a reference to the bundler settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Packages every requested platform and reports per-platform results.
    ///
    /// The output root is created once before any pipeline starts. When at
    /// least one platform succeeds, `opener` is asked to reveal the output
    /// root; an opener failure is logged, not returned.
    ///
    /// # Errors
    ///
    /// Only when the output root itself cannot be created. Platform failures
    /// are part of the returned [`BundleReport`].
    pub async fn bundle(
        &self,
        opener: &dyn OutputOpener,
        cancel: &CancellationToken,
    ) -> Result<BundleReport> {
        let output_directory = self.settings.output_directory().to_path_buf();
        ensure_dir(&output_directory).await?;

        let mut outcomes = BTreeMap::new();
        let mut runnable = Vec::new();
        for id in self.requested_platforms() {
            match platform::resolve(&id) {
                Ok(platform) => runnable.push(platform),
                Err(error) => {
                    log::error!("{}: {}", id, error);
                    outcomes.insert(
                        id,
                        PlatformOutcome::Failed {
                            stage: PlatformState::Pending,
                            error,
                        },
                    );
                }
            }
        }

        if self.settings.parallel() {
            outcomes.extend(self.run_parallel(runnable, cancel).await);
        } else {
            for platform in runnable {
                log::info!("Packaging {} ({})", platform.id, platform.label);
                let outcome = PlatformPipeline::new(&self.settings, platform)
                    .run(cancel)
                    .await;
                outcomes.insert(platform.id.to_string(), outcome);
            }
        }

        let report = BundleReport {
            output_directory,
            outcomes,
        };

        if report.any_packaged() {
            if let Err(e) = opener.open(report.output_directory()) {
                log::warn!("Could not open {}: {}", report.output_directory().display(), e);
            }
        } else {
            log::warn!("No platform was packaged; not opening the output folder");
        }

        Ok(report)
    }

    /// Requested platform ids in order, with duplicates dropped.
    fn requested_platforms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for id in self.settings.platforms() {
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            } else {
                log::warn!("Platform {} requested more than once; packaging it once", id);
            }
        }
        ids
    }

    async fn run_parallel(
        &self,
        platforms: Vec<&'static Platform>,
        cancel: &CancellationToken,
    ) -> Vec<(String, PlatformOutcome)> {
        let mut tasks = JoinSet::new();
        let mut task_platforms = HashMap::new();

        for platform in platforms {
            log::info!("Packaging {} ({})", platform.id, platform.label);
            let settings = Arc::clone(&self.settings);
            let cancel = cancel.clone();
            let handle = tasks.spawn(async move {
                PlatformPipeline::new(&settings, platform).run(&cancel).await
            });
            task_platforms.insert(handle.id(), platform.id);
        }

        let mut outcomes = Vec::with_capacity(task_platforms.len());
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, outcome)) => {
                    if let Some(id) = task_platforms.get(&task_id) {
                        outcomes.push((id.to_string(), outcome));
                    }
                }
                Err(join_error) => {
                    if let Some(id) = task_platforms.get(&join_error.id()) {
                        log::error!("{}: pipeline task failed: {}", id, join_error);
                        outcomes.push((
                            id.to_string(),
                            PlatformOutcome::Failed {
                                stage: PlatformState::Pending,
                                error: Error::GenericError(format!(
                                    "pipeline task failed: {}",
                                    join_error
                                )),
                            },
                        ));
                    }
                }
            }
        }
        outcomes
    }
}
