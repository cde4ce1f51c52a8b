//! Answers, project types and engine settings

pub mod answers;
pub mod project;
pub mod settings;

pub use answers::{keys, ConfigModel, ConfigValue};
pub use project::{ProjectKind, ProjectType, ServiceOptions};
pub use settings::EngineSettings;
