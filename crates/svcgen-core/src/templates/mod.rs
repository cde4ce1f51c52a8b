//! Template resolution, fetching, filtering and compilation
//!
//! This module provides:
//! - Template set location and version pinning (`locator`)
//! - Read-only template filesystems: GitHub, local directory, zip (`source`)
//! - A lazy depth-first walk over those filesystems (`walk`)
//! - The per-entry accept/reject decision (`filter`)
//! - Compilation with the fixed helper vocabulary (`compiler`, `helpers`)
//! - Bundling a local template set into a zip (`bundle`)

pub mod bundle;
pub mod compiler;
pub mod filter;
pub mod helpers;
pub mod locator;
pub mod source;
pub mod walk;

pub use compiler::TemplateCompiler;
pub use filter::{Decision, SkipList, SkipReason, TemplateFilter};
pub use locator::{resolve, BuildInfo, ModuleInfo, TemplateSetLocator};
pub use source::{ArchiveFs, DirEntry, GitHubFs, LocalFs, TemplateFs, TemplateSource};
pub use walk::{WalkStep, Walker};

/// Entries ending in this suffix are rendered; the suffix is dropped from the output path
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

pub fn is_template(path: &str) -> bool {
    path.ends_with(TEMPLATE_SUFFIX)
}

/// Output path for an entry: exactly one trailing suffix removed
pub fn output_path(path: &str) -> &str {
    path.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(path)
}
