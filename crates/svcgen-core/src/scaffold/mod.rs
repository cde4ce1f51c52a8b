//! Scaffold generation: directory structure, then rendered files

pub mod builder;
pub mod report;

pub use builder::{RenderedFile, RunState, ScaffoldBuilder, ScaffoldContext};
pub use report::{EntryOutcome, RunReport, Summary};
