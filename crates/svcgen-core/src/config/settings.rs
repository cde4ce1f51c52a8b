//! Engine settings with environment overrides

use crate::error::ConfigError;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "github.com";
pub const DEFAULT_ORG: &str = "svcgen-templates";
pub const DEFAULT_REPO_PREFIX: &str = "svcgen-tmpl";
pub const DEFAULT_TEMPLATE_DIR: &str = "template";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Timeout for a single request against the template host
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for connecting to the source and rendering the whole scaffold
pub const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(300);

pub const ENV_HOST: &str = "SVCGEN_TEMPLATE_HOST";
pub const ENV_ORG: &str = "SVCGEN_TEMPLATE_ORG";
pub const ENV_REPO_PREFIX: &str = "SVCGEN_TEMPLATE_PREFIX";
pub const ENV_TEMPLATE_DIR: &str = "SVCGEN_TEMPLATE_DIR";
pub const ENV_API_BASE: &str = "SVCGEN_GITHUB_API";
pub const ENV_DEADLINE: &str = "SVCGEN_DEADLINE_SECS";

/// Where template sets live and how long the engine may wait for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Host of the template repositories (e.g., "github.com")
    pub host: String,
    /// Organisation owning the template repositories
    pub org: String,
    /// Template repositories are named `<repo_prefix>-<projectType>`
    pub repo_prefix: String,
    /// Directory inside each template repository holding the template set
    pub template_dir: String,
    /// Base URL of the host's REST API
    pub api_base: String,
    pub request_timeout: Duration,
    pub run_deadline: Duration,
    /// User agent string for HTTP requests
    pub user_agent: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            org: DEFAULT_ORG.to_string(),
            repo_prefix: DEFAULT_REPO_PREFIX.to_string(),
            template_dir: DEFAULT_TEMPLATE_DIR.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            run_deadline: DEFAULT_RUN_DEADLINE,
            user_agent: concat!("svcgen/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineSettings {
    /// Defaults overridden by `SVCGEN_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Self::default();

        if let Some(host) = lookup(ENV_HOST) {
            settings.host = host;
        }
        if let Some(org) = lookup(ENV_ORG) {
            settings.org = org;
        }
        if let Some(prefix) = lookup(ENV_REPO_PREFIX) {
            settings.repo_prefix = prefix;
        }
        if let Some(dir) = lookup(ENV_TEMPLATE_DIR) {
            settings.template_dir = dir.trim_matches('/').to_string();
        }
        if let Some(api) = lookup(ENV_API_BASE) {
            settings.api_base = api;
        }
        if let Some(secs) = lookup(ENV_DEADLINE) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ConfigError::Parse(format!("{} must be a number of seconds", ENV_DEADLINE))
            })?;
            settings.run_deadline = Duration::from_secs(secs);
        }

        settings.api_url()?;
        Ok(settings)
    }

    /// Parsed API base URL
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.api_base)
            .map_err(|e| ConfigError::Parse(format!("invalid API URL '{}': {}", self.api_base, e)))
    }

    /// Template repository name for a project type
    pub fn repo_name(&self, project_type: &str) -> String {
        format!("{}-{}", self.repo_prefix, project_type)
    }
}
