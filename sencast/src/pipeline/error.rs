//! Error types for the group pipeline.
//!
//! Failures are split by blast radius. A [`CellFailure`] costs one
//! (tile, processor) cell, one mosaic or one adapter and is recorded in the
//! report; a [`GroupFailure`] ends one group's worker and nothing else.

use std::path::PathBuf;
use thiserror::Error;

use super::report::Outcome;
use crate::command::CommandError;
use crate::provider::ProviderError;

/// Failure of a single unit of work inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellFailure {
    /// An upstream product this step consumes is absent from the ledger.
    #[error("required input {0} is not available")]
    MissingInput(String),

    /// The step reported success but its output does not exist.
    #[error("no output at {}", .0.display())]
    NoOutput(PathBuf),

    /// The output exists but is smaller than the configured minimum.
    #[error("output {} is undersized ({size} < {min} bytes)", path.display())]
    Undersized { path: PathBuf, size: u64, min: u64 },

    #[error(transparent)]
    Command(#[from] CommandError),

    /// The step cannot run as configured.
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Failed(String),
}

impl CellFailure {
    /// Report outcome for this failure.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Undersized { .. } => Outcome::FailedUndersized,
            _ => Outcome::FailedNoOutput,
        }
    }
}

impl From<std::io::Error> for CellFailure {
    fn from(e: std::io::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Failure that aborts one group's worker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupFailure {
    #[error("download of {scene} failed after {attempts} attempt(s): {source}")]
    Download {
        scene: String,
        attempts: u32,
        source: ProviderError,
    },

    #[error("integrity check failed, missing: {}", display_paths(.missing))]
    Integrity { missing: Vec<PathBuf> },

    #[error("group worker panicked: {0}")]
    Panicked(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
