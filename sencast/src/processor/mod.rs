//! Level-1 to Level-2 processors.
//!
//! A [`Processor`] turns one tile's Level-1 product (and the outputs of
//! earlier processors for the same tile) into one output path. Processors
//! are looked up by name in a [`ProcessorRegistry`] populated at startup.

mod command;
mod registry;

pub use command::{default_requires, CommandProcessor, DEFAULT_PROCESSOR_EXTENSION};
pub use registry::{ProcessorFactory, ProcessorRegistry, KNOWN_PROCESSORS};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::pipeline::{CellFailure, RunEnv};
use crate::BoxFuture;

/// Input of one (tile, processor) cell.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRequest<'a> {
    /// Level-1 product of the tile
    pub l1_product: &'a Path,
    /// Outputs of earlier processors for this tile, by processor name
    pub prior: &'a BTreeMap<String, PathBuf>,
    /// Deterministic output location the processor should write
    pub output: &'a Path,
    pub env: &'a RunEnv,
}

/// A named processing step in the per-tile chain.
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;

    /// Processors whose output for the same tile this one consumes.
    fn requires(&self) -> &[String] {
        &[]
    }

    /// File extension of the output, without the dot.
    fn extension(&self) -> &str {
        DEFAULT_PROCESSOR_EXTENSION
    }

    /// Runs the processor and returns the path it produced.
    fn process<'a>(&'a self, request: ProcessRequest<'a>) -> BoxFuture<'a, Result<PathBuf, CellFailure>>;
}
