//! Error taxonomy for a generation run
//!
//! - [`ScaffoldError`]: setup and run-level failures. These abort the run.
//! - [`EntryError`]: a single walked entry could not be turned into output.
//!   These are recorded in the run report and the walk continues.
//! - [`SourceError`]: a template filesystem could not list or read one path.
//! - [`ConfigError`]: the collected answers are incomplete or malformed.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fatal errors that stop a run
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("invalid template locator '{0}'")]
    InvalidLocator(String),

    #[error("unsupported template host '{0}' (only github.com is supported)")]
    UnsupportedHost(String),

    #[error("template source {location} is unavailable: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("access to template source {0} was denied, check the access token")]
    Unauthorized(String),

    #[error("target directory {path} is not writable: {reason}")]
    TargetNotWritable { path: PathBuf, reason: String },

    #[error("cannot {operation} while the run is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("run did not finish within {} seconds", .0.as_secs())]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a template filesystem for a single path
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Request(err.to_string())
    }
}

/// Recoverable failure of one entry; the entry contributes no output
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("failed to fetch {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: SourceError,
    },

    #[error("failed to inspect parent directory of {path}: {source}")]
    Filter {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse template {path}: {message}")]
    Compile { path: String, message: String },

    #[error("unable to render template {path}: {message}")]
    Render { path: String, message: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EntryError {
    /// Relative path of the entry that failed
    pub fn path(&self) -> &str {
        match self {
            EntryError::Source { path, .. }
            | EntryError::Filter { path, .. }
            | EntryError::Compile { path, .. }
            | EntryError::Render { path, .. }
            | EntryError::Write { path, .. } => path,
        }
    }
}

/// Problems with the answers in a [`crate::config::ConfigModel`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required option '{0}'")]
    Missing(&'static str),

    #[error("option '{key}' must be a {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
    },

    #[error("unknown project type '{0}'")]
    UnknownProjectType(String),

    #[error("failed to parse answers: {0}")]
    Parse(String),
}
