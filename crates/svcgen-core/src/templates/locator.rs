//! Template set location and version pinning

use crate::config::{EngineSettings, ProjectType};
use crate::error::{ConfigError, ScaffoldError};
use semver::Version;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Compile-time variable listing the template modules this build was made against
pub const TEMPLATE_MODULES_ENV: &str = "SVCGEN_TEMPLATE_MODULES";

/// A template module the build depends on
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModuleInfo {
    pub path: String,
    pub version: String,
}

/// Dependency metadata used to pin a template set to a release
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildInfo {
    #[serde(default)]
    pub modules: Vec<ModuleInfo>,
}

impl BuildInfo {
    /// Metadata embedded through `SVCGEN_TEMPLATE_MODULES` at build time
    pub fn embedded() -> Self {
        option_env!("SVCGEN_TEMPLATE_MODULES")
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Parse `<module-path>@<version>` entries separated by `;` or `,`
    ///
    /// Malformed entries are ignored.
    pub fn parse(spec: &str) -> Self {
        let modules = spec
            .split([';', ','])
            .filter_map(|entry| {
                let (path, version) = entry.trim().rsplit_once('@')?;
                if path.is_empty() || version.is_empty() {
                    return None;
                }
                Some(ModuleInfo {
                    path: path.to_string(),
                    version: version.to_string(),
                })
            })
            .collect();
        Self { modules }
    }

    /// Load a modules file: `modules: [{ path, version }, ...]`
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Version of the first module whose path ends with `repo_name`
    pub fn find_version(&self, repo_name: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|m| m.path.ends_with(repo_name))
            .map(|m| m.version.as_str())
    }
}

/// Fully qualified location of a template set
///
/// Formatted as `<host>/<org>/<repo>/<path>[@tags/<version>]`. An empty
/// version (pinning was requested but nothing matched) formats as a trailing
/// `@tags/` and resolves to the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSetLocator {
    pub host: String,
    pub org: String,
    pub repo: String,
    pub path: String,
    pub version: Option<String>,
}

impl TemplateSetLocator {
    /// Git reference to read from, `None` for the default branch
    pub fn git_ref(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }
}

impl fmt::Display for TemplateSetLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.org, self.repo)?;
        if !self.path.is_empty() {
            write!(f, "/{}", self.path)?;
        }
        if let Some(version) = &self.version {
            write!(f, "@tags/{}", version)?;
        }
        Ok(())
    }
}

impl FromStr for TemplateSetLocator {
    type Err = ScaffoldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScaffoldError::InvalidLocator(s.to_string());

        let (base, selector) = match s.split_once('@') {
            Some((base, selector)) => (base, Some(selector)),
            None => (s, None),
        };

        let mut segments = base.trim_matches('/').split('/');
        let host = segments.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let org = segments.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let repo = segments.next().filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let rest: Vec<&str> = segments.collect();
        if rest.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }

        let version = selector.map(|sel| sel.strip_prefix("tags/").unwrap_or(sel).to_string());

        Ok(Self {
            host: host.to_string(),
            org: org.to_string(),
            repo: repo.to_string(),
            path: rest.join("/"),
            version,
        })
    }
}

/// Build the locator for a project type, optionally pinned to the release
/// recorded in the build metadata
pub fn resolve(
    settings: &EngineSettings,
    project_type: ProjectType,
    pin_version: bool,
    build: &BuildInfo,
) -> TemplateSetLocator {
    let repo = settings.repo_name(project_type.as_str());
    let version = pin_version.then(|| pinned_version(build, &repo));

    let locator = TemplateSetLocator {
        host: settings.host.clone(),
        org: settings.org.clone(),
        repo,
        path: settings.template_dir.clone(),
        version,
    };

    info!(location = %locator, "reading scaffolding template files");
    locator
}

fn pinned_version(build: &BuildInfo, repo: &str) -> String {
    match build.find_version(repo) {
        Some(version) => match tag_for(version) {
            Some(tag) => tag,
            None => {
                warn!(repo, version, "template module is pinned to a pseudo-version, using the default branch");
                String::new()
            }
        },
        None => {
            warn!(repo, "no template module in build metadata, using the default branch");
            String::new()
        }
    }
}

/// Tag to fetch for a module version; pseudo-versions do not name a tag
fn tag_for(version: &str) -> Option<String> {
    match parse_version(version) {
        Ok(parsed) if is_pseudo_version(&parsed) => None,
        // Non-semver tags are used as-is
        _ => Some(version.to_string()),
    }
}

/// Parse version string, handling a leading 'v'
pub fn parse_version(version_str: &str) -> Result<Version, semver::Error> {
    let cleaned = version_str.strip_prefix('v').unwrap_or(version_str);
    Version::parse(cleaned)
}

/// `v0.0.0-20191109021931-daa7c04131f5` style versions carry a commit timestamp
fn is_pseudo_version(version: &Version) -> bool {
    version
        .pre
        .as_str()
        .split(['.', '-'])
        .any(|part| part.len() == 14 && part.bytes().all(|b| b.is_ascii_digit()))
}
