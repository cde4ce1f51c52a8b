//! End-to-end tests for the two-phase scaffold pipeline
//!
//! The template set lives in memory so individual reads and listings can be
//! made to fail or stall.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Duration;
use svcgen_core::config::{keys, ConfigModel, EngineSettings};
use svcgen_core::error::{EntryError, ScaffoldError, SourceError};
use svcgen_core::scaffold::{EntryOutcome, RunState, ScaffoldBuilder, ScaffoldContext};
use svcgen_core::templates::source::parent_path;
use svcgen_core::templates::{ArchiveFs, DirEntry, SkipList, SkipReason, TemplateFs};
use tempfile::TempDir;
use walkdir::WalkDir;

#[derive(Default)]
struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
    failing_reads: BTreeSet<String>,
    failing_dirs: BTreeSet<String>,
    listing_delay: Option<Duration>,
}

impl MemoryFs {
    fn with_file(mut self, path: &str, contents: &str) -> Self {
        self.files.insert(path.to_string(), contents.as_bytes().to_vec());
        self
    }

    fn failing_read(mut self, path: &str) -> Self {
        self.failing_reads.insert(path.to_string());
        self
    }

    fn failing_dir(mut self, path: &str) -> Self {
        self.failing_dirs.insert(path.to_string());
        self
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.listing_delay = Some(delay);
        self
    }

    fn dirs(&self) -> BTreeSet<String> {
        let mut dirs = BTreeSet::new();
        for path in self.files.keys() {
            let mut parent = parent_path(path);
            while !parent.is_empty() {
                dirs.insert(parent.to_string());
                parent = parent_path(parent);
            }
        }
        dirs
    }
}

#[async_trait]
impl TemplateFs for MemoryFs {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
        if let Some(delay) = self.listing_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_dirs.contains(path) {
            return Err(SourceError::Request(format!("connection reset listing {path}")));
        }

        let mut entries: Vec<DirEntry> = self
            .dirs()
            .into_iter()
            .filter(|d| parent_path(d) == path)
            .map(DirEntry::dir)
            .collect();
        entries.extend(
            self.files
                .keys()
                .filter(|f| parent_path(f) == path)
                .map(|f| DirEntry::file(f.as_str())),
        );
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        if self.failing_reads.contains(path) {
            return Err(SourceError::Status {
                path: path.to_string(),
                status: 502,
            });
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }
}

fn grpc_templates() -> MemoryFs {
    MemoryFs::default()
        .with_file("README.md.tmpl", "# {{projectName}}\n")
        .with_file(".gitignore", "/bin\n{{not a template}}\n")
        .with_file(
            "cmd/server/main.go.tmpl",
            "package main\n\n// {{topascal projectName}} serves {{toplural coreDbObject}}\n",
        )
        .with_file(
            "internal/config/config.go.tmpl",
            "package config\n\nconst Field = \"{{tocamel \"my_field\"}}\"\n",
        )
        .with_file("db/schema.sql.tmpl", "create table {{toplural coreDbObject}} ();\n")
}

fn answers(target: &Path, require_db: bool) -> ConfigModel {
    ConfigModel::new()
        .with(keys::PROJECT_TYPE, "go-grpc")
        .with(keys::PROJECT_NAME, "svc-foo")
        .with(keys::PROJECT_DIR, target.display().to_string())
        .with(keys::REQUIRE_DB, require_db)
        .with(keys::CORE_DB_OBJECT, "box")
}

fn builder_for(target: &Path, require_db: bool) -> ScaffoldBuilder {
    let ctx = ScaffoldContext::from_config(EngineSettings::default(), answers(target, require_db))
        .unwrap();
    ScaffoldBuilder::new(ctx)
}

fn read(target: &Path, relative: &str) -> String {
    std::fs::read_to_string(target.join(relative)).unwrap()
}

/// Every directory below `root`, relative to it
fn directory_set(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.path().strip_prefix(root).unwrap().display().to_string())
        .collect()
}

/// Every file below `root`, relative to it
fn file_set(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(root).unwrap().display().to_string())
        .collect()
}

fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    use std::io::Write;

    let mut buffer = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer
}

#[tokio::test]
async fn test_grpc_scaffold_without_database_skips_db_templates() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert_eq!(builder.state(), RunState::Done);
    assert_eq!(read(&target, "README.md"), "# svc-foo\n");
    assert_eq!(
        read(&target, "cmd/server/main.go"),
        "package main\n\n// SvcFoo serves boxes\n"
    );
    assert!(!target.join("db").exists());
    assert!(!target.join("db/schema.sql").exists());
    assert!(matches!(
        report.outcome("db/schema.sql.tmpl"),
        Some(EntryOutcome::Skipped(SkipReason::MissingParent(parent))) if parent == "db"
    ));
    let skipped: Vec<&str> = report.skipped().map(|(path, _)| path).collect();
    assert_eq!(skipped, vec!["db/schema.sql.tmpl"]);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_grpc_scaffold_with_database_renders_db_templates() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let mut builder = builder_for(&target, true);

    builder.build_structure().await.unwrap();
    builder.build_files_from(&templates).await.unwrap();

    assert_eq!(read(&target, "db/schema.sql"), "create table boxes ();\n");
}

#[tokio::test]
async fn test_helpers_are_available_to_every_template() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    builder.build_files_from(&templates).await.unwrap();

    assert_eq!(
        read(&target, "internal/config/config.go"),
        "package config\n\nconst Field = \"myField\"\n"
    );
}

#[tokio::test]
async fn test_non_template_files_are_copied_verbatim() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert_eq!(read(&target, ".gitignore"), "/bin\n{{not a template}}\n");
    assert!(matches!(
        report.outcome(".gitignore"),
        Some(EntryOutcome::Copied { output }) if output == ".gitignore"
    ));
}

#[tokio::test]
async fn test_failed_fetch_does_not_block_later_entries() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates().failing_read("cmd/server/main.go.tmpl");
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert_eq!(builder.state(), RunState::Done);
    assert!(!target.join("cmd/server/main.go").exists());
    assert!(target.join("internal/config/config.go").is_file());
    assert!(matches!(
        report.outcome("cmd/server/main.go.tmpl"),
        Some(EntryOutcome::Failed(EntryError::Source { .. }))
    ));
    assert_eq!(report.summary().failed, 1);
}

#[tokio::test]
async fn test_failed_listing_loses_only_that_subtree() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates().failing_dir("cmd");
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert!(!target.join("cmd/server/main.go").exists());
    assert!(target.join("README.md").is_file());
    assert!(target.join("internal/config/config.go").is_file());
    assert!(matches!(
        report.outcome("cmd"),
        Some(EntryOutcome::Failed(EntryError::Source { .. }))
    ));
}

#[tokio::test]
async fn test_unreachable_root_fails_the_run() {
    let out = TempDir::new().unwrap();
    let templates = grpc_templates().failing_dir("");
    let mut builder = builder_for(&out.path().join("svc-foo"), false);

    builder.build_structure().await.unwrap();
    let err = builder.build_files_from(&templates).await.unwrap_err();

    assert!(matches!(err, ScaffoldError::SourceUnavailable { .. }));
    assert_eq!(builder.state(), RunState::Failed);
}

#[tokio::test]
async fn test_skip_list_is_honoured() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let skip: SkipList = ["README.md.tmpl"].into_iter().collect();
    let ctx = ScaffoldContext::from_config(EngineSettings::default(), answers(&target, false))
        .unwrap()
        .with_skip_list(skip);
    let mut builder = ScaffoldBuilder::new(ctx);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert!(!target.join("README.md").exists());
    assert!(matches!(
        report.outcome("README.md.tmpl"),
        Some(EntryOutcome::Skipped(SkipReason::Listed))
    ));
}

#[tokio::test]
async fn test_compile_failure_drops_only_that_template() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates().with_file("Makefile.tmpl", "{{#if requireDb}}migrate:\n");
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert!(!target.join("Makefile").exists());
    assert!(matches!(
        report.outcome("Makefile.tmpl"),
        Some(EntryOutcome::Failed(EntryError::Compile { .. }))
    ));
    assert!(target.join("README.md").is_file());
}

#[tokio::test]
async fn test_directories_are_never_written_as_files() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates();
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    for dir in ["cmd", "cmd/server", "internal", "internal/config", "db"] {
        assert!(matches!(
            report.outcome(dir),
            Some(EntryOutcome::Skipped(SkipReason::Directory))
        ));
    }
    assert!(target.join("cmd/server").is_dir());
}

#[tokio::test]
async fn test_extra_answers_reach_the_render_context() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = MemoryFs::default().with_file("OWNERS.tmpl", "{{owner}}\n");
    let config = answers(&target, false).with("owner", "platform-team");
    let ctx = ScaffoldContext::from_config(EngineSettings::default(), config).unwrap();
    let mut builder = ScaffoldBuilder::new(ctx);

    builder.build_structure().await.unwrap();
    builder.build_files_from(&templates).await.unwrap();

    assert_eq!(read(&target, "OWNERS"), "platform-team\n");
}

#[tokio::test]
async fn test_stalled_source_hits_the_deadline() {
    let out = TempDir::new().unwrap();
    let templates = grpc_templates().slow(Duration::from_secs(5));
    let settings = EngineSettings {
        run_deadline: Duration::from_millis(50),
        ..EngineSettings::default()
    };
    let ctx = ScaffoldContext::from_config(settings, answers(&out.path().join("svc-foo"), false))
        .unwrap();
    let mut builder = ScaffoldBuilder::new(ctx);

    builder.build_structure().await.unwrap();
    let err = builder.build_files_from(&templates).await.unwrap_err();

    assert!(matches!(err, ScaffoldError::DeadlineExceeded(_)));
    assert_eq!(builder.state(), RunState::Failed);
}

#[tokio::test]
async fn test_unsupported_host_is_rejected_before_any_request() {
    let out = TempDir::new().unwrap();
    let settings = EngineSettings {
        host: "gitlab.com".to_string(),
        ..EngineSettings::default()
    };
    let ctx = ScaffoldContext::from_config(settings, answers(&out.path().join("svc-foo"), false))
        .unwrap();
    let mut builder = ScaffoldBuilder::new(ctx);

    builder.build_structure().await.unwrap();
    let err = builder.build_files("token").await.unwrap_err();

    assert!(matches!(err, ScaffoldError::UnsupportedHost(host) if host == "gitlab.com"));
    assert_eq!(builder.state(), RunState::Failed);
}

#[tokio::test]
async fn test_bundled_grpc_template_set_renders_cleanly() {
    let template_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates/go-grpc/template");
    let source = svcgen_core::templates::LocalFs::open(template_root).unwrap();
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let mut builder = builder_for(&target, true);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&source).await.unwrap();

    assert!(!report.has_failures(), "{}", report.render_summary());
    assert!(read(&target, "README.md").contains("`boxes` table"));
    assert!(read(&target, "internal/db/model.go").contains("type Box struct"));
    assert!(read(&target, "cmd/server/main.go").contains("handlers.RegisterSvcFoo(srv)"));
    assert!(!target.join("terraform").exists());
    assert!(matches!(
        report.outcome("terraform/main.tf.tmpl"),
        Some(EntryOutcome::Skipped(SkipReason::MissingParent(_)))
    ));
}

#[tokio::test]
async fn test_rendering_creates_no_directories() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("svc-foo");
    let templates = grpc_templates()
        .with_file("internal/service/handlers/orders.go.tmpl", "package handlers\n")
        .with_file("api/v1/proto/svc.proto.tmpl", "syntax = \"proto3\";\n")
        .with_file("db/migrations/001_init.sql.tmpl", "create table {{coreDbObject}} ();\n");
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let before = directory_set(&target);
    let report = builder.build_files_from(&templates).await.unwrap();
    let after = directory_set(&target);

    assert_eq!(before, after);
    assert!(!target.join("internal/service").exists());
    for nested in [
        "internal/service/handlers/orders.go.tmpl",
        "api/v1/proto/svc.proto.tmpl",
        "db/migrations/001_init.sql.tmpl",
    ] {
        assert!(matches!(
            report.outcome(nested),
            Some(EntryOutcome::Skipped(SkipReason::MissingParent(_)))
        ));
    }
}

#[tokio::test]
async fn test_archive_entries_cannot_escape_the_target() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("a/svc-foo");
    let bytes = zip_of(&[
        ("template/README.md.tmpl", "# {{projectName}}\n"),
        ("template/../../escaped.txt.tmpl", "escaped\n"),
        ("template/../../../outside.txt", "escaped\n"),
    ]);
    let source = ArchiveFs::from_bytes("bundle.zip", &bytes, "template").unwrap();
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&source).await.unwrap();

    assert_eq!(builder.state(), RunState::Done);
    assert_eq!(read(&target, "README.md"), "# svc-foo\n");
    assert_eq!(file_set(out.path()), BTreeSet::from(["a/svc-foo/README.md".to_string()]));
    assert_eq!(report.written().collect::<Vec<_>>(), vec!["README.md"]);
}

#[tokio::test]
async fn test_source_paths_leaving_the_target_are_refused() {
    let out = TempDir::new().unwrap();
    let target = out.path().join("a/svc-foo");
    let templates = MemoryFs::default()
        .with_file("README.md.tmpl", "# {{projectName}}\n")
        .with_file("../escaped.txt.tmpl", "escaped\n");
    let mut builder = builder_for(&target, false);

    builder.build_structure().await.unwrap();
    let report = builder.build_files_from(&templates).await.unwrap();

    assert!(!out.path().join("a/escaped.txt").exists());
    assert_eq!(file_set(out.path()), BTreeSet::from(["a/svc-foo/README.md".to_string()]));
    assert!(matches!(
        report.outcome("../escaped.txt.tmpl"),
        Some(EntryOutcome::Failed(EntryError::Filter { .. }))
    ));
}
