//! Depth-first walk over a template filesystem
//!
//! The walk is lazy: each call to [`Walker::step`] performs at most one
//! directory listing. A directory is always visited before its children and
//! siblings are visited in lexical order, so runs over the same template set
//! are reproducible. A listing that fails is reported as a
//! [`WalkStep::Failed`] step and only that subtree is lost.

use crate::error::SourceError;
use crate::templates::source::{DirEntry, TemplateFs};
use tracing::debug;

/// Outcome of one walk step
#[derive(Debug)]
pub enum WalkStep {
    Visited(DirEntry),
    Failed { path: String, error: SourceError },
}

/// Restartable depth-first walker
pub struct Walker<'a> {
    fs: &'a dyn TemplateFs,
    stack: Vec<DirEntry>,
    expanded_root: bool,
}

impl<'a> Walker<'a> {
    pub fn new(fs: &'a dyn TemplateFs) -> Self {
        let mut walker = Self {
            fs,
            stack: Vec::new(),
            expanded_root: false,
        };
        walker.restart();
        walker
    }

    /// Start over from the template root
    pub fn restart(&mut self) {
        self.stack.clear();
        self.expanded_root = false;
    }

    /// Advance to the next entry; `None` once the walk is exhausted
    ///
    /// The root itself is not reported. If it cannot be listed the first step
    /// is a failure for the path `""`.
    pub async fn step(&mut self) -> Option<WalkStep> {
        if !self.expanded_root {
            self.expanded_root = true;
            if let Err(error) = self.expand("").await {
                return Some(WalkStep::Failed {
                    path: String::new(),
                    error,
                });
            }
        }

        let entry = self.stack.pop()?;
        if entry.is_dir {
            if let Err(error) = self.expand(&entry.path).await {
                return Some(WalkStep::Failed {
                    path: entry.path,
                    error,
                });
            }
        }
        Some(WalkStep::Visited(entry))
    }

    async fn expand(&mut self, path: &str) -> Result<(), SourceError> {
        let mut children = self.fs.read_dir(path).await?;
        debug!(path, children = children.len(), "listed template directory");

        // Reverse order so the lexically smallest child is popped first
        children.sort_by(|a, b| b.path.cmp(&a.path));
        self.stack.extend(children);
        Ok(())
    }

    /// Drain the remaining steps
    pub async fn collect(mut self) -> Vec<WalkStep> {
        let mut steps = Vec::new();
        while let Some(step) = self.step().await {
            steps.push(step);
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    /// Directory listings keyed by path; listed paths in `broken` fail
    struct FakeFs {
        dirs: BTreeMap<&'static str, Vec<DirEntry>>,
        broken: Vec<&'static str>,
    }

    #[async_trait]
    impl TemplateFs for FakeFs {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, SourceError> {
            if self.broken.iter().any(|b| *b == path) {
                return Err(SourceError::Request("connection reset".to_string()));
            }
            self.dirs
                .get(path)
                .cloned()
                .ok_or_else(|| SourceError::NotFound(path.to_string()))
        }

        async fn read_file(&self, path: &str) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::NotFound(path.to_string()))
        }
    }

    fn fake(broken: Vec<&'static str>) -> FakeFs {
        let mut dirs = BTreeMap::new();
        dirs.insert(
            "",
            vec![
                DirEntry::file("main.go.tmpl"),
                DirEntry::dir("db"),
                DirEntry::file("README.md.tmpl"),
                DirEntry::dir("cmd"),
            ],
        );
        dirs.insert("db", vec![DirEntry::file("db/schema.sql.tmpl")]);
        dirs.insert("cmd", vec![DirEntry::file("cmd/server.go.tmpl")]);
        FakeFs { dirs, broken }
    }

    fn visited(steps: &[WalkStep]) -> Vec<&str> {
        steps
            .iter()
            .filter_map(|s| match s {
                WalkStep::Visited(entry) => Some(entry.path.as_str()),
                WalkStep::Failed { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_depth_first_parent_before_child() {
        let fs = fake(vec![]);
        let steps = Walker::new(&fs).collect().await;
        assert_eq!(
            visited(&steps),
            vec![
                "README.md.tmpl",
                "cmd",
                "cmd/server.go.tmpl",
                "db",
                "db/schema.sql.tmpl",
                "main.go.tmpl",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_listing_prunes_only_that_subtree() {
        let fs = fake(vec!["cmd"]);
        let steps = Walker::new(&fs).collect().await;

        let failed: Vec<&str> = steps
            .iter()
            .filter_map(|s| match s {
                WalkStep::Failed { path, .. } => Some(path.as_str()),
                WalkStep::Visited(_) => None,
            })
            .collect();
        assert_eq!(failed, vec!["cmd"]);
        assert_eq!(
            visited(&steps),
            vec!["README.md.tmpl", "db", "db/schema.sql.tmpl", "main.go.tmpl"]
        );
    }

    #[tokio::test]
    async fn test_root_failure_is_reported_once() {
        let fs = fake(vec![""]);
        let steps = Walker::new(&fs).collect().await;
        assert_eq!(steps.len(), 1);
        assert!(matches!(&steps[0], WalkStep::Failed { path, .. } if path.is_empty()));
    }

    #[tokio::test]
    async fn test_restart_replays_the_walk() {
        let fs = fake(vec![]);
        let mut walker = Walker::new(&fs);
        let first = walker.step().await;
        walker.restart();
        let again = walker.step().await;
        match (first, again) {
            (Some(WalkStep::Visited(a)), Some(WalkStep::Visited(b))) => assert_eq!(a, b),
            other => panic!("unexpected steps: {:?}", other),
        }
    }
}
