//! Deciding which walked entries become output
//!
//! An entry is accepted when it is a file, its parent directory already
//! exists in the local scaffold and it is not on the skip list. A missing
//! parent means the template belongs to a feature this project did not ask
//! for (e.g. `db/` without a database), so rejection is a normal outcome.

use crate::templates::source::DirEntry;
use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

/// Relative template paths that must never be compiled or rendered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    paths: BTreeSet<String>,
}

impl SkipList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<str>) {
        self.paths.insert(normalize(path.as_ref()).to_string());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(normalize(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for SkipList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = SkipList::new();
        for path in iter {
            list.insert(path);
        }
        list
    }
}

fn normalize(path: &str) -> &str {
    path.trim_start_matches("./").trim_start_matches('/')
}

/// Why an entry produced no output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Directory,
    Listed,
    /// The parent directory was not created for this project
    MissingParent(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Directory => f.write_str("directory"),
            SkipReason::Listed => f.write_str("on the skip list"),
            SkipReason::MissingParent(parent) => {
                write!(f, "directory '{}' is not part of this project", parent)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(SkipReason),
}

/// Filter bound to a skip list and the local scaffold root
#[derive(Debug, Clone, Copy)]
pub struct TemplateFilter<'a> {
    skip: &'a SkipList,
    base: &'a Path,
}

impl<'a> TemplateFilter<'a> {
    pub fn new(skip: &'a SkipList, base: &'a Path) -> Self {
        Self { skip, base }
    }

    /// Classify an entry; errors when the local parent cannot be inspected
    /// or the entry path would leave the scaffold root
    pub async fn evaluate(&self, entry: &DirEntry) -> io::Result<Decision> {
        if entry.is_dir {
            return Ok(Decision::Reject(SkipReason::Directory));
        }

        local_path(self.base, &entry.path)?;
        let parent = entry.parent();
        if !dir_exists(&local_path(self.base, parent)?).await? {
            return Ok(Decision::Reject(SkipReason::MissingParent(parent.to_string())));
        }

        if self.skip.contains(&entry.path) {
            return Ok(Decision::Reject(SkipReason::Listed));
        }

        Ok(Decision::Accept)
    }

    /// Boolean form of [`TemplateFilter::evaluate`]; inspection errors reject
    pub async fn accept(&self, entry: &DirEntry) -> bool {
        matches!(self.evaluate(entry).await, Ok(Decision::Accept))
    }
}

/// Whether `entry` should be compiled for the scaffold rooted at `base`
pub async fn accept(entry: &DirEntry, skip: &SkipList, base: &Path) -> bool {
    TemplateFilter::new(skip, base).accept(entry).await
}

/// Whether a `/`-separated relative path stays below its root
///
/// Every non-empty segment must be a plain name: no `.`, `..`, drive
/// prefix or root.
pub fn is_contained(relative: &str) -> bool {
    relative.split('/').filter(|s| !s.is_empty()).all(|segment| {
        let mut components = Path::new(segment).components();
        matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        )
    })
}

/// Map a `/`-separated relative path onto the local scaffold
///
/// Fails with `InvalidInput` for paths that would resolve outside `base`.
pub fn local_path(base: &Path, relative: &str) -> io::Result<PathBuf> {
    if !is_contained(relative) {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("'{}' escapes the project directory", relative),
        ));
    }

    Ok(relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, segment| acc.join(segment)))
}

async fn dir_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scaffold_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("cmd/server")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_accepts_file_with_existing_parent() {
        let root = scaffold_root();
        let skip = SkipList::new();
        let filter = TemplateFilter::new(&skip, root.path());

        assert!(filter.accept(&DirEntry::file("README.md.tmpl")).await);
        assert!(filter.accept(&DirEntry::file("cmd/server/main.go.tmpl")).await);
    }

    #[tokio::test]
    async fn test_rejects_directories() {
        let root = scaffold_root();
        let skip = SkipList::new();
        let filter = TemplateFilter::new(&skip, root.path());

        assert_eq!(
            filter.evaluate(&DirEntry::dir("cmd")).await.unwrap(),
            Decision::Reject(SkipReason::Directory)
        );
    }

    #[tokio::test]
    async fn test_rejects_missing_parent() {
        let root = scaffold_root();
        let skip = SkipList::new();
        let filter = TemplateFilter::new(&skip, root.path());

        assert_eq!(
            filter.evaluate(&DirEntry::file("db/schema.sql.tmpl")).await.unwrap(),
            Decision::Reject(SkipReason::MissingParent("db".to_string()))
        );
    }

    #[tokio::test]
    async fn test_rejects_skip_listed_paths() {
        let root = scaffold_root();
        let skip: SkipList = ["./cmd/server/main.go.tmpl"].into_iter().collect();
        let filter = TemplateFilter::new(&skip, root.path());

        assert_eq!(
            filter.evaluate(&DirEntry::file("cmd/server/main.go.tmpl")).await.unwrap(),
            Decision::Reject(SkipReason::Listed)
        );
        assert!(accept(&DirEntry::file("README.md.tmpl"), &skip, root.path()).await);
    }

    #[tokio::test]
    async fn test_file_in_place_of_parent_is_not_a_directory() {
        let root = scaffold_root();
        std::fs::write(root.path().join("db"), "not a dir").unwrap();
        let skip = SkipList::new();
        let filter = TemplateFilter::new(&skip, root.path());

        assert!(!filter.accept(&DirEntry::file("db/schema.sql.tmpl")).await);
    }

    #[tokio::test]
    async fn test_rejects_paths_leaving_the_root() {
        let root = scaffold_root();
        let skip = SkipList::new();
        let filter = TemplateFilter::new(&skip, root.path());

        let err = filter
            .evaluate(&DirEntry::file("../../escaped.txt.tmpl"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!filter.accept(&DirEntry::file("cmd/../../x.tmpl")).await);
    }

    #[test]
    fn test_local_path_stays_below_base() {
        let base = Path::new("/work/svc-foo");
        assert_eq!(
            local_path(base, "cmd/server/main.go").unwrap(),
            base.join("cmd").join("server").join("main.go")
        );
        assert_eq!(local_path(base, "").unwrap(), base.to_path_buf());
        assert!(local_path(base, "../x").is_err());
        assert!(local_path(base, "db/./x").is_err());
        assert!(is_contained(".github/workflows/ci.yml"));
        assert!(!is_contained("a/../../b"));
    }
}
