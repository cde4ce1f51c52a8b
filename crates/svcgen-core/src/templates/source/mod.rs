//! Read-only template filesystems
//!
//! A template set can be read from three places:
//! - Remote: a directory of a GitHub repository, read through the contents API
//! - Local: a directory on disk (for template development)
//! - Archive: a zip bundle, such as one produced by `svcgen bundle` or a
//!   repository snapshot downloaded ahead of time
//!
//! All three present the same [`TemplateFs`] view: `/`-separated paths
//! relative to the template set root, with `""` naming the root itself.

pub mod archive;
pub mod github;
pub mod local;

pub use archive::ArchiveFs;
pub use github::GitHubFs;
pub use local::LocalFs;

use crate::config::EngineSettings;
use crate::error::{ScaffoldError, SourceError};
use crate::templates::locator::TemplateSetLocator;
use async_trait::async_trait;
use std::path::PathBuf;

/// One entry of a template filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Path relative to the template set root
    pub path: String,
    pub is_dir: bool,
}

impl DirEntry {
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    /// Path of the directory containing this entry (`""` for top-level entries)
    pub fn parent(&self) -> &str {
        parent_path(&self.path)
    }
}

/// A walkable, read-only view over a template set
#[async_trait]
pub trait TemplateFs: Send + Sync {
    /// Human-readable location, used in logs and errors
    fn describe(&self) -> String;

    /// List the immediate children of a directory
    async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError>;

    /// Read the raw bytes of a file
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Where to read a template set from
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Remote(TemplateSetLocator),
    Local(PathBuf),
    Archive { path: PathBuf, prefix: String },
}

impl TemplateSource {
    /// Open the source; only remote sources use the access token
    pub async fn open(
        &self,
        settings: &EngineSettings,
        token: &str,
    ) -> Result<Box<dyn TemplateFs>, ScaffoldError> {
        Ok(match self {
            TemplateSource::Remote(locator) => {
                Box::new(GitHubFs::connect(settings, locator.clone(), token).await?)
            }
            TemplateSource::Local(path) => Box::new(LocalFs::open(path.clone())?),
            TemplateSource::Archive { path, prefix } => {
                Box::new(ArchiveFs::open(path, prefix).await?)
            }
        })
    }
}

/// Join a parent path and a child name
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Parent directory of a relative path (`""` for top-level entries)
pub fn parent_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}
