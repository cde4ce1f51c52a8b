//! Template set in a local directory

use super::{join_path, DirEntry, TemplateFs};
use crate::error::{ScaffoldError, SourceError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Read-only view of a directory on disk
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Open a template directory, failing if it does not exist
    pub fn open(root: PathBuf) -> Result<Self, ScaffoldError> {
        if !root.is_dir() {
            return Err(ScaffoldError::SourceUnavailable {
                location: root.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

fn map_io(path: &str, err: std::io::Error) -> SourceError {
    if err.kind() == ErrorKind::NotFound {
        SourceError::NotFound(path.to_string())
    } else {
        SourceError::Io(err)
    }
}

#[async_trait]
impl TemplateFs for LocalFs {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
        let mut reader = fs::read_dir(self.resolve(path))
            .await
            .map_err(|e| map_io(path, e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().await?.is_dir();
            entries.push(DirEntry {
                path: join_path(path, &name),
                is_dir,
            });
        }
        Ok(entries)
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        fs::read(self.resolve(path))
            .await
            .map_err(|e| map_io(path, e))
    }
}
