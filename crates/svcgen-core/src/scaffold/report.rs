//! Per-entry outcomes of a run

use crate::error::EntryError;
use crate::templates::SkipReason;
use colored::Colorize;

/// What happened to one walked entry
#[derive(Debug)]
pub enum EntryOutcome {
    /// Compiled, rendered and written to `output`
    Rendered { output: String },
    /// Not a template; written unchanged to `output`
    Copied { output: String },
    Skipped(SkipReason),
    Failed(EntryError),
}

/// Counts per outcome, directories excluded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub rendered: usize,
    pub copied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcomes of a run, in the order they were decided
#[derive(Debug, Default)]
pub struct RunReport {
    entries: Vec<(String, EntryOutcome)>,
}

impl RunReport {
    pub fn record(&mut self, path: impl Into<String>, outcome: EntryOutcome) {
        self.entries.push((path.into(), outcome));
    }

    pub fn entries(&self) -> &[(String, EntryOutcome)] {
        &self.entries
    }

    /// Outcome recorded for a template path
    pub fn outcome(&self, path: &str) -> Option<&EntryOutcome> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, outcome)| outcome)
    }

    /// Output paths of every file written
    pub fn written(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(_, outcome)| match outcome {
            EntryOutcome::Rendered { output } | EntryOutcome::Copied { output } => {
                Some(output.as_str())
            }
            _ => None,
        })
    }

    /// Skipped files; directories are not listed
    pub fn skipped(&self) -> impl Iterator<Item = (&str, &SkipReason)> {
        self.entries.iter().filter_map(|(path, outcome)| match outcome {
            EntryOutcome::Skipped(SkipReason::Directory) => None,
            EntryOutcome::Skipped(reason) => Some((path.as_str(), reason)),
            _ => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &EntryError)> {
        self.entries.iter().filter_map(|(path, outcome)| match outcome {
            EntryOutcome::Failed(err) => Some((path.as_str(), err)),
            _ => None,
        })
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for (_, outcome) in &self.entries {
            match outcome {
                EntryOutcome::Rendered { .. } => summary.rendered += 1,
                EntryOutcome::Copied { .. } => summary.copied += 1,
                EntryOutcome::Skipped(SkipReason::Directory) => {}
                EntryOutcome::Skipped(_) => summary.skipped += 1,
                EntryOutcome::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Printable end-of-run summary listing skips and failures
    pub fn render_summary(&self) -> String {
        let summary = self.summary();
        let mut lines = vec![format!(
            "{} {} rendered, {} copied, {} skipped, {} failed",
            "Scaffold:".bold(),
            summary.rendered,
            summary.copied,
            summary.skipped,
            summary.failed
        )];

        for (path, reason) in self.skipped() {
            lines.push(format!("  {} {} ({})", "skipped".yellow(), path, reason));
        }
        for (path, err) in self.failed() {
            lines.push(format!("  {} {}: {}", "failed".red(), path, err));
        }
        lines.join("\n")
    }
}
