//! svcgen core - template resolution and scaffold rendering for new services
//!
//! A scaffold is produced in two phases. The directory layout is created
//! first from the project's typed options; then every template entry whose
//! parent directory exists locally is fetched, compiled, rendered with the
//! collected answers and written exactly once.
//!
//! # Architecture
//!
//! - **Templates** - locating a template set, reading it from GitHub, a
//!   local directory or a zip bundle, walking, filtering and compiling it
//! - **Scaffold** - the two-phase builder and its per-entry run report
//! - **Collaborators** - repository creation and `terraform init`
//! - **CLI/TUI** - optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use svcgen_core::config::{keys, ConfigModel, EngineSettings};
//! use svcgen_core::scaffold::{ScaffoldBuilder, ScaffoldContext};
//!
//! let config = ConfigModel::new()
//!     .with(keys::PROJECT_TYPE, "go-grpc")
//!     .with(keys::PROJECT_NAME, "svc-orders")
//!     .with(keys::PROJECT_DIR, "./svc-orders");
//! let ctx = ScaffoldContext::from_config(EngineSettings::from_env()?, config)?;
//!
//! let mut builder = ScaffoldBuilder::new(ctx);
//! builder.build_structure().await?;
//! let report = builder.build_files(&token).await?;
//! ```

pub mod config;
pub mod error;
pub mod hosting;
pub mod runtime;
pub mod scaffold;
pub mod templates;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use config::{ConfigModel, ConfigValue, EngineSettings, ProjectKind, ProjectType};
pub use error::{ConfigError, EntryError, ScaffoldError, SourceError};
pub use scaffold::{RunReport, RunState, ScaffoldBuilder, ScaffoldContext};
pub use templates::{TemplateFs, TemplateSetLocator, TemplateSource};

#[cfg(feature = "tui")]
pub use tui::run;
