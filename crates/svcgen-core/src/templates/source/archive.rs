//! Template set packed in a zip archive

use super::{parent_path, DirEntry, TemplateFs};
use crate::error::{ScaffoldError, SourceError};
use crate::templates::filter::is_contained;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::warn;
use zip::ZipArchive;

/// In-memory view of the files below one directory of a zip archive
#[derive(Debug, Clone)]
pub struct ArchiveFs {
    label: String,
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl ArchiveFs {
    /// Read an archive from disk
    pub async fn open(path: &Path, prefix: &str) -> Result<Self, ScaffoldError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScaffoldError::SourceUnavailable {
                location: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Self::from_bytes(&path.display().to_string(), &bytes, prefix)
    }

    /// Extract the entries below `prefix` (e.g. `template` or
    /// `acme-svcgen-tmpl-go-grpc-1a2b3c4/template`); entries outside it are
    /// ignored
    pub fn from_bytes(label: &str, zip_bytes: &[u8], prefix: &str) -> Result<Self, ScaffoldError> {
        let unavailable = |reason: String| ScaffoldError::SourceUnavailable {
            location: label.to_string(),
            reason,
        };

        let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
            .map_err(|e| unavailable(format!("failed to read zip archive: {}", e)))?;

        let prefix = prefix.trim_matches('/');
        let mut files = BTreeMap::new();
        let mut dirs = BTreeSet::new();
        dirs.insert(String::new());

        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| unavailable(format!("corrupt archive entry {}: {}", i, e)))?;

            let full_path = file.name().trim_end_matches('/').to_string();
            let relative = match strip_prefix(&full_path, prefix) {
                Some(rel) if !rel.is_empty() => rel.to_string(),
                _ => continue,
            };
            if file.enclosed_name().is_none() || !is_contained(&relative) {
                warn!(archive = label, entry = %full_path, "ignoring archive entry outside the template root");
                continue;
            }

            // Every ancestor is a directory even without its own zip entry
            let mut parent = parent_path(&relative);
            while !parent.is_empty() {
                dirs.insert(parent.to_string());
                parent = parent_path(parent);
            }

            if file.is_dir() {
                dirs.insert(relative);
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)
                .map_err(|e| unavailable(format!("failed to extract {}: {}", relative, e)))?;
            files.insert(relative, contents);
        }

        if files.is_empty() {
            return Err(unavailable(format!("no files below '{}'", prefix)));
        }

        Ok(Self {
            label: label.to_string(),
            files,
            dirs,
        })
    }
}

fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    path.strip_prefix(prefix)?.strip_prefix('/')
}

#[async_trait]
impl TemplateFs for ArchiveFs {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
        if !self.dirs.contains(path) {
            return Err(SourceError::NotFound(path.to_string()));
        }

        let subdirs = self
            .dirs
            .iter()
            .filter(|d| !d.is_empty() && parent_path(d) == path)
            .map(|d| DirEntry::dir(d.as_str()));
        let files = self
            .files
            .keys()
            .filter(|f| parent_path(f) == path)
            .map(|f| DirEntry::file(f.as_str()));

        Ok(subdirs.chain(files).collect())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_string()))
    }
}
