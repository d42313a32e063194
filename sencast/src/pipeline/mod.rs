//! Per-group hindcast pipeline.
//!
//! One [`GroupPipeline`] runs each sensing-date group through a fixed
//! sequence of stages, borrowing permits from the shared resource pools:
//!
//! ```text
//! SceneGroup → Download → Integrity → Reduce → Process → Mosaic → Adapt → GroupReport
//!              [download]                      [---- process ----]  [adapt]
//! ```
//!
//! # Failure Scopes
//!
//! - Download and integrity failures abort the group ([`GroupFailure`]).
//! - A failing (tile, processor) cell, merge or adapter is recorded as a
//!   [`CellFailure`] in the report and the group carries on.
//!
//! # Idempotence
//!
//! Every output path is deterministic. Outputs already on disk are reported
//! as [`Outcome::Skipped`] and not recomputed, so an interrupted run can be
//! restarted with the same configuration.

mod context;
mod error;
mod group;
mod ledger;
mod output;
mod report;
pub mod stages;

pub use context::RunEnv;
pub use error::{CellFailure, GroupFailure};
pub use group::GroupPipeline;
pub use ledger::{MosaicedLedger, ProductLedger};
pub use output::{reusable_output, verify_output};
pub use report::{CellReport, GroupReport, Outcome, RunReport, SceneCounts, StepReport};
