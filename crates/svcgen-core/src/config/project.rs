//! Supported project types and their typed options
//!
//! Each project type is a variant of [`ProjectKind`] carrying the options it
//! reads from the answers. The variant decides which local directories a
//! scaffold gets and which steps are suggested once it is generated.

use crate::config::answers::{keys, ConfigModel};
use crate::error::ConfigError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Directories shared by every Go service layout
const GO_SERVICE_DIRS: &[&str] = &[
    "",
    ".github",
    ".github/workflows",
    "build",
    "cmd",
    "cmd/server",
    "internal",
    "internal/config",
    "internal/handlers",
];

const GRPC_DIRS: &[&str] = &["pkg", "pkg/client", "protobuf"];
const REST_DIRS: &[&str] = &["api", "internal/middleware"];

/// Only created when a database was requested
const DB_DIRS: &[&str] = &["db", "db/migrations", "internal/db"];

/// Only created when infrastructure provisioning was requested
const TERRAFORM_DIRS: &[&str] = &["terraform"];

/// Identifier of a template set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum ProjectType {
    GoGrpc,
    GoRest,
}

impl ProjectType {
    pub const ALL: [ProjectType; 2] = [ProjectType::GoGrpc, ProjectType::GoRest];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::GoGrpc => "go-grpc",
            ProjectType::GoRest => "go-rest",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProjectType::GoGrpc => "Go gRPC service",
            ProjectType::GoRest => "Go REST service",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ProjectType::GoGrpc => "protobuf API, generated client package",
            ProjectType::GoRest => "HTTP/JSON API with middleware",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownProjectType(s.to_string()))
    }
}

/// Options every service type reads from the answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    pub name: String,
    pub require_db: bool,
    /// Name of the core database object, present only when a database is requested
    pub core_db_object: Option<String>,
    pub run_terraform: bool,
}

impl ServiceOptions {
    fn from_config(config: &ConfigModel) -> Result<Self, ConfigError> {
        let name = config.require_string(keys::PROJECT_NAME)?.to_string();
        let require_db = config.try_bool(keys::REQUIRE_DB)?;
        let core_db_object = if require_db {
            Some(config.require_string(keys::CORE_DB_OBJECT)?.to_string())
        } else {
            None
        };
        let run_terraform = config.try_bool(keys::RUN_TERRAFORM)?;

        Ok(Self {
            name,
            require_db,
            core_db_object,
            run_terraform,
        })
    }
}

/// A project type together with its typed configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectKind {
    GoGrpc(ServiceOptions),
    GoRest(ServiceOptions),
}

impl ProjectKind {
    /// Read the project type and its recognised options from the answers
    pub fn from_config(config: &ConfigModel) -> Result<Self, ConfigError> {
        let project_type: ProjectType = config.require_string(keys::PROJECT_TYPE)?.parse()?;
        let options = ServiceOptions::from_config(config)?;

        Ok(match project_type {
            ProjectType::GoGrpc => ProjectKind::GoGrpc(options),
            ProjectType::GoRest => ProjectKind::GoRest(options),
        })
    }

    pub fn project_type(&self) -> ProjectType {
        match self {
            ProjectKind::GoGrpc(_) => ProjectType::GoGrpc,
            ProjectKind::GoRest(_) => ProjectType::GoRest,
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        match self {
            ProjectKind::GoGrpc(options) | ProjectKind::GoRest(options) => options,
        }
    }

    /// Relative directories to create before any template is fetched
    ///
    /// Parents always come before their children. The empty path is the
    /// project root.
    pub fn structure(&self) -> Vec<&'static str> {
        let options = self.options();
        let mut dirs: Vec<&'static str> = GO_SERVICE_DIRS.to_vec();

        match self {
            ProjectKind::GoGrpc(_) => dirs.extend_from_slice(GRPC_DIRS),
            ProjectKind::GoRest(_) => dirs.extend_from_slice(REST_DIRS),
        }
        if options.require_db {
            dirs.extend_from_slice(DB_DIRS);
        }
        if options.run_terraform {
            dirs.extend_from_slice(TERRAFORM_DIRS);
        }

        dirs
    }

    /// Generate the "next steps" instructions after the scaffold is written
    pub fn next_steps(&self, dir: &Path) -> Vec<String> {
        let options = self.options();
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        // Step 1: cd to directory if not current
        if current.as_deref() != Some(dir) {
            steps.push(format!("cd {}", dir.display()));
        }

        // Step 2: Generate code from the API definition
        match self {
            ProjectKind::GoGrpc(_) => steps.push("make proto".to_string()),
            ProjectKind::GoRest(_) => steps.push("make openapi".to_string()),
        }

        steps.push("go mod tidy".to_string());

        // Step 3: Database setup
        if let Some(object) = &options.core_db_object {
            steps.push(format!(
                "Review db/migrations and the {} model in internal/db",
                object
            ));
        }

        // Step 4: Infrastructure
        if options.run_terraform {
            steps.push("terraform -chdir=terraform plan".to_string());
        }

        steps.push("go run ./cmd/server".to_string());
        steps
    }
}
