//! Two-phase scaffold generation
//!
//! 1. [`ScaffoldBuilder::build_structure`] creates every directory the
//!    project needs.
//! 2. [`ScaffoldBuilder::build_files`] walks the template set, keeps the
//!    entries whose parent directory exists, compiles and renders them with
//!    the answers as context and writes each result once.
//!
//! A run moves `Idle -> StructureBuilt -> FilesRendered -> Done`. Only
//! setup problems (unreachable source, unwritable target, deadline) move it
//! to `Failed`; a bad entry is recorded in the [`RunReport`] and skipped.

use crate::config::{keys, ConfigModel, EngineSettings, ProjectKind};
use crate::error::{EntryError, ScaffoldError};
use crate::scaffold::report::{EntryOutcome, RunReport};
use crate::templates::filter::local_path;
use crate::templates::{
    is_template, output_path, resolve, BuildInfo, Decision, GitHubFs, SkipList, SkipReason,
    TemplateCompiler, TemplateFilter, TemplateFs, TemplateSetLocator, WalkStep, Walker,
};
use std::collections::BTreeSet;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    StructureBuilt,
    FilesRendered,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::StructureBuilt => "structure-built",
            RunState::FilesRendered => "files-rendered",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

/// Everything a run needs, passed in explicitly
#[derive(Debug, Clone)]
pub struct ScaffoldContext {
    pub settings: EngineSettings,
    pub config: ConfigModel,
    pub project: ProjectKind,
    /// Root of the generated project
    pub target: PathBuf,
    pub skip: SkipList,
    /// Pin the template set to the release in `build`
    pub pin_version: bool,
    pub build: BuildInfo,
    /// Explicit template set location, replacing the resolved one
    pub locator_override: Option<TemplateSetLocator>,
}

impl ScaffoldContext {
    /// Context for the answers in `config`; the target is `projectDir`
    pub fn from_config(settings: EngineSettings, config: ConfigModel) -> Result<Self, ScaffoldError> {
        let project = ProjectKind::from_config(&config)?;
        let target = PathBuf::from(config.require_string(keys::PROJECT_DIR)?);

        Ok(Self {
            settings,
            config,
            project,
            target,
            skip: SkipList::new(),
            pin_version: false,
            build: BuildInfo::default(),
            locator_override: None,
        })
    }

    pub fn with_skip_list(mut self, skip: SkipList) -> Self {
        self.skip = skip;
        self
    }

    /// Pin to the template release recorded in `build`
    pub fn with_pinned_version(mut self, build: BuildInfo) -> Self {
        self.pin_version = true;
        self.build = build;
        self
    }

    /// Write the scaffold somewhere other than `projectDir`
    pub fn with_target(mut self, target: PathBuf) -> Self {
        self.target = target;
        self
    }

    /// Read templates from `location` (`<host>/<org>/<repo>/<path>[@tags/<version>]`)
    pub fn with_locator(mut self, location: &str) -> Result<Self, ScaffoldError> {
        self.locator_override = Some(location.parse()?);
        Ok(self)
    }

    /// Location of the template set for this project
    pub fn locator(&self) -> TemplateSetLocator {
        if let Some(locator) = &self.locator_override {
            return locator.clone();
        }
        resolve(
            &self.settings,
            self.project.project_type(),
            self.pin_version,
            &self.build,
        )
    }
}

/// Entry that passed the filter and compiled
struct AcceptedEntry {
    path: String,
    /// Raw bytes for non-template entries; templates live in the compiler
    verbatim: Option<Vec<u8>>,
}

/// Output of one accepted entry, not yet written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Path of the template entry that produced this file
    pub source_path: String,
    /// Suffix-stripped path relative to the project root
    pub output_path: String,
    pub contents: Vec<u8>,
    pub templated: bool,
}

/// Builds a scaffold from a template set
pub struct ScaffoldBuilder {
    ctx: ScaffoldContext,
    state: RunState,
    created_dirs: BTreeSet<String>,
}

impl ScaffoldBuilder {
    pub fn new(ctx: ScaffoldContext) -> Self {
        Self {
            ctx,
            state: RunState::Idle,
            created_dirs: BTreeSet::new(),
        }
    }

    pub fn context(&self) -> &ScaffoldContext {
        &self.ctx
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn target(&self) -> &Path {
        &self.ctx.target
    }

    /// Relative directories created by [`ScaffoldBuilder::build_structure`]
    pub fn created_dirs(&self) -> impl Iterator<Item = &str> {
        self.created_dirs.iter().map(String::as_str)
    }

    fn invalid_state(&self, operation: &'static str) -> ScaffoldError {
        ScaffoldError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    /// Create the project's directory tree; safe to call again
    pub async fn build_structure(&mut self) -> Result<(), ScaffoldError> {
        if !matches!(self.state, RunState::Idle | RunState::StructureBuilt) {
            return Err(self.invalid_state("build the structure"));
        }

        match self.create_structure().await {
            Ok(()) => {
                info!(
                    target_dir = %self.ctx.target.display(),
                    dirs = self.created_dirs.len(),
                    "created project structure"
                );
                self.state = RunState::StructureBuilt;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    async fn create_structure(&mut self) -> Result<(), ScaffoldError> {
        let target = self.ctx.target.clone();
        let not_writable = |reason: String| ScaffoldError::TargetNotWritable {
            path: target.clone(),
            reason,
        };

        for dir in self.ctx.project.structure() {
            let path = local_path(&target, dir)?;
            fs::create_dir_all(&path).await.map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => not_writable(e.to_string()),
                _ => ScaffoldError::Io(e),
            })?;
            debug!(dir, "created directory");
            self.created_dirs.insert(dir.to_string());
        }

        let meta = fs::metadata(&target).await?;
        if meta.permissions().readonly() {
            return Err(not_writable("directory is read-only".to_string()));
        }
        Ok(())
    }

    /// Render the remote template set, authenticating with `token`
    ///
    /// Connecting and rendering share the run deadline.
    pub async fn build_files(&mut self, token: &str) -> Result<RunReport, ScaffoldError> {
        if self.state != RunState::StructureBuilt {
            return Err(self.invalid_state("build files"));
        }

        let deadline = self.deadline();
        let locator = self.ctx.locator();
        let connected =
            within(deadline, GitHubFs::connect(&self.ctx.settings, locator, token)).await;

        let source = match connected {
            Some(Ok(source)) => source,
            Some(Err(e)) => {
                self.state = RunState::Failed;
                return Err(e);
            }
            None => {
                self.state = RunState::Failed;
                return Err(ScaffoldError::DeadlineExceeded(self.ctx.settings.run_deadline));
            }
        };

        self.run_until(&source, deadline).await
    }

    /// Render the template set read from `source`
    pub async fn build_files_from(
        &mut self,
        source: &dyn TemplateFs,
    ) -> Result<RunReport, ScaffoldError> {
        if self.state != RunState::StructureBuilt {
            return Err(self.invalid_state("build files"));
        }

        let deadline = self.deadline();
        self.run_until(source, deadline).await
    }

    /// End of the run window; `None` when the deadline is too far out to represent
    fn deadline(&self) -> Option<Instant> {
        let deadline = Instant::now().checked_add(self.ctx.settings.run_deadline);
        if deadline.is_none() {
            warn!(
                secs = self.ctx.settings.run_deadline.as_secs(),
                "run deadline out of range, running without one"
            );
        }
        deadline
    }

    async fn run_until(
        &mut self,
        source: &dyn TemplateFs,
        deadline: Option<Instant>,
    ) -> Result<RunReport, ScaffoldError> {
        info!(source = %source.describe(), "rendering scaffold");

        let outcome = within(deadline, self.render_pipeline(source)).await;
        match outcome {
            Some(Ok(report)) => {
                self.state = RunState::Done;
                let summary = report.summary();
                info!(
                    rendered = summary.rendered,
                    copied = summary.copied,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "scaffold complete"
                );
                Ok(report)
            }
            Some(Err(e)) => {
                self.state = RunState::Failed;
                Err(e)
            }
            None => {
                self.state = RunState::Failed;
                Err(ScaffoldError::DeadlineExceeded(self.ctx.settings.run_deadline))
            }
        }
    }

    async fn render_pipeline(&mut self, source: &dyn TemplateFs) -> Result<RunReport, ScaffoldError> {
        let mut report = RunReport::default();

        let (compiler, accepted) = self.collect_templates(source, &mut report).await?;
        let rendered = self.render_entries(&compiler, accepted, &mut report);
        self.state = RunState::FilesRendered;

        self.write_files(rendered, &mut report).await;
        Ok(report)
    }

    /// Walk, filter and compile; only an unreachable root is fatal
    async fn collect_templates(
        &self,
        source: &dyn TemplateFs,
        report: &mut RunReport,
    ) -> Result<(TemplateCompiler, Vec<AcceptedEntry>), ScaffoldError> {
        let filter = TemplateFilter::new(&self.ctx.skip, &self.ctx.target);
        let mut compiler = TemplateCompiler::new();
        let mut accepted = Vec::new();
        let mut walker = Walker::new(source);

        while let Some(step) = walker.step().await {
            let entry = match step {
                WalkStep::Visited(entry) => entry,
                WalkStep::Failed { path, error } if path.is_empty() => {
                    return Err(ScaffoldError::SourceUnavailable {
                        location: source.describe(),
                        reason: error.to_string(),
                    });
                }
                WalkStep::Failed { path, error } => {
                    warn!(path = %path, error = %error, "failed to read template directory");
                    report.record(
                        path.clone(),
                        EntryOutcome::Failed(EntryError::Source { path, source: error }),
                    );
                    continue;
                }
            };

            match filter.evaluate(&entry).await {
                Ok(Decision::Accept) => {}
                Ok(Decision::Reject(reason)) => {
                    if reason != SkipReason::Directory {
                        info!(path = %entry.path, reason = %reason, "skipping template");
                    }
                    report.record(entry.path, EntryOutcome::Skipped(reason));
                    continue;
                }
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "failed to check template parent");
                    let path = entry.path;
                    report.record(
                        path.clone(),
                        EntryOutcome::Failed(EntryError::Filter { path, source: e }),
                    );
                    continue;
                }
            }

            let raw = match source.read_file(&entry.path).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(path = %entry.path, error = %e, "failed to fetch template");
                    let path = entry.path;
                    report.record(
                        path.clone(),
                        EntryOutcome::Failed(EntryError::Source { path, source: e }),
                    );
                    continue;
                }
            };

            if !is_template(&entry.path) {
                accepted.push(AcceptedEntry {
                    path: entry.path,
                    verbatim: Some(raw),
                });
                continue;
            }

            info!(path = output_path(&entry.path), "fetching template");
            // A template that fails to parse is dropped for the rest of the run
            if let Err(e) = compiler.compile(&entry.path, &raw) {
                warn!(error = %e, "template dropped");
                report.record(entry.path, EntryOutcome::Failed(e));
                continue;
            }
            accepted.push(AcceptedEntry {
                path: entry.path,
                verbatim: None,
            });
        }

        Ok((compiler, accepted))
    }

    fn render_entries(
        &self,
        compiler: &TemplateCompiler,
        accepted: Vec<AcceptedEntry>,
        report: &mut RunReport,
    ) -> Vec<RenderedFile> {
        let mut rendered = Vec::with_capacity(accepted.len());

        for entry in accepted {
            let output = output_path(&entry.path).to_string();
            match entry.verbatim {
                Some(contents) => rendered.push(RenderedFile {
                    source_path: entry.path,
                    output_path: output,
                    contents,
                    templated: false,
                }),
                None => match compiler.render(&entry.path, &self.ctx.config) {
                    Ok(text) => rendered.push(RenderedFile {
                        source_path: entry.path,
                        output_path: output,
                        contents: text.into_bytes(),
                        templated: true,
                    }),
                    Err(e) => {
                        warn!(error = %e, "template dropped");
                        report.record(entry.path, EntryOutcome::Failed(e));
                    }
                },
            }
        }

        rendered
    }

    /// Write each file once; never creates directories or overwrites files
    async fn write_files(&self, files: Vec<RenderedFile>, report: &mut RunReport) {
        for file in files {
            let written = match local_path(&self.ctx.target, &file.output_path) {
                Ok(target) => write_new(&target, &file.contents).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => {
                    debug!(path = %file.output_path, bytes = file.contents.len(), "wrote file");
                    let output = file.output_path;
                    let outcome = if file.templated {
                        EntryOutcome::Rendered { output }
                    } else {
                        EntryOutcome::Copied { output }
                    };
                    report.record(file.source_path, outcome);
                }
                Err(e) => {
                    warn!(path = %file.output_path, error = %e, "failed to write file");
                    let path = file.source_path;
                    report.record(
                        path.clone(),
                        EntryOutcome::Failed(EntryError::Write { path, source: e }),
                    );
                }
            }
        }
    }
}

/// Run `fut` until `deadline`; `None` once the deadline has passed
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}

async fn write_new(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(contents).await?;
    file.flush().await
}
