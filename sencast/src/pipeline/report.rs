//! Run reports: what happened to every cell, mosaic and adapter.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

use super::error::{CellFailure, GroupFailure};

/// Result of one processor cell, mosaic or adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Successful,
    FailedNoOutput,
    FailedUndersized,
    /// The output already existed and the step was not run.
    Skipped,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::FailedNoOutput => "failed (no output)",
            Self::FailedUndersized => "failed (empty/undersized output)",
            Self::Skipped => "skipped (already existed)",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::FailedNoOutput | Self::FailedUndersized)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (tile, processor) cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellReport {
    /// Level-1 product name of the tile
    pub tile: String,
    pub processor: String,
    pub outcome: Outcome,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

/// One named step that is not per tile: a mosaic or an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub name: String,
    pub outcome: Outcome,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl StepReport {
    pub fn done(name: impl Into<String>, outcome: Outcome, output: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            outcome,
            output,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, failure: &CellFailure) -> Self {
        Self {
            name: name.into(),
            outcome: failure.outcome(),
            output: None,
            error: Some(failure.to_string()),
        }
    }
}

/// Everything one group's worker did.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupReport {
    pub date: NaiveDate,
    /// Product names of the tiles that went through processing
    pub tiles: Vec<String>,
    /// Number of tiles before minimal-subset reduction
    pub tiles_before_reduction: usize,
    pub partial_coverage: bool,
    pub downloaded: usize,
    pub cells: Vec<CellReport>,
    /// Merge results per processor; absent when no merge was needed
    pub mosaics: Vec<StepReport>,
    pub adapters: Vec<StepReport>,
    /// Set when the group was aborted by a download or integrity failure
    pub failure: Option<GroupFailure>,
}

impl GroupReport {
    pub fn new(date: NaiveDate, tiles: Vec<String>) -> Self {
        let count = tiles.len();
        Self {
            date,
            tiles,
            tiles_before_reduction: count,
            partial_coverage: false,
            downloaded: 0,
            cells: Vec::new(),
            mosaics: Vec::new(),
            adapters: Vec::new(),
            failure: None,
        }
    }

    /// Report for a group that ended with a fatal error.
    pub fn failed(date: NaiveDate, tiles: Vec<String>, failure: GroupFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(date, tiles)
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn was_reduced(&self) -> bool {
        self.tiles.len() < self.tiles_before_reduction
    }

    pub fn cell(&self, tile: &str, processor: &str) -> Option<&CellReport> {
        self.cells
            .iter()
            .find(|c| c.tile == tile && c.processor == processor)
    }

    pub fn mosaic(&self, processor: &str) -> Option<&StepReport> {
        self.mosaics.iter().find(|s| s.name == processor)
    }

    pub fn adapter(&self, adapter: &str) -> Option<&StepReport> {
        self.adapters.iter().find(|s| s.name == adapter)
    }

    /// Outcomes of every cell, mosaic and adapter in the group.
    pub fn outcomes(&self) -> impl Iterator<Item = Outcome> + '_ {
        self.cells
            .iter()
            .map(|c| c.outcome)
            .chain(self.mosaics.iter().map(|s| s.outcome))
            .chain(self.adapters.iter().map(|s| s.outcome))
    }
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {} tile(s)", self.date, self.tiles.len())?;
        if self.was_reduced() {
            write!(f, " (reduced from {})", self.tiles_before_reduction)?;
        }
        if self.partial_coverage {
            write!(f, " [partial coverage]")?;
        }
        if self.downloaded > 0 {
            write!(f, ", {} downloaded", self.downloaded)?;
        }
        writeln!(f)?;

        if let Some(failure) = &self.failure {
            return writeln!(f, "    FAILED: {}", failure);
        }

        for cell in &self.cells {
            write!(f, "    {:<18} {:<40} {}", cell.processor, cell.tile, cell.outcome)?;
            write_error(f, cell.error.as_deref())?;
        }
        for step in &self.mosaics {
            write!(f, "    {:<18} {:<40} {}", step.name, "mosaic", step.outcome)?;
            write_error(f, step.error.as_deref())?;
        }
        for step in &self.adapters {
            write!(f, "    {:<18} {:<40} {}", step.name, "adapter", step.outcome)?;
            write_error(f, step.error.as_deref())?;
        }
        Ok(())
    }
}

fn write_error(f: &mut fmt::Formatter<'_>, error: Option<&str>) -> fmt::Result {
    match error {
        Some(e) => writeln!(f, ": {}", e),
        None => writeln!(f),
    }
}

/// Counts from catalog search and availability gating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub found: usize,
    pub available: usize,
    pub to_download: usize,
    pub dropped: usize,
}

/// Result of a complete hindcast run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub scenes: SceneCounts,
    /// One report per group, in scheduling order
    pub groups: Vec<GroupReport>,
}

impl RunReport {
    pub fn group(&self, date: NaiveDate) -> Option<&GroupReport> {
        self.groups.iter().find(|g| g.date == date)
    }

    /// Groups aborted by a fatal error.
    pub fn failed_groups(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.is_failed())
    }

    pub fn has_failed_groups(&self) -> bool {
        self.failed_groups().next().is_some()
    }

    /// Number of cells, mosaics and adapters with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.outcomes())
            .filter(|o| *o == outcome)
            .count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Hindcast: {} group(s), {} failed",
            self.groups.len(),
            self.failed_groups().count()
        )?;
        writeln!(
            f,
            "Scenes: {} found, {} available, {} to download, {} dropped",
            self.scenes.found, self.scenes.available, self.scenes.to_download, self.scenes.dropped
        )?;
        writeln!(
            f,
            "Steps: {} successful, {} skipped, {} failed (no output), {} failed (undersized)",
            self.count(Outcome::Successful),
            self.count(Outcome::Skipped),
            self.count(Outcome::FailedNoOutput),
            self.count(Outcome::FailedUndersized)
        )?;
        for group in &self.groups {
            writeln!(f)?;
            write!(f, "{}", group)?;
        }
        Ok(())
    }
}
