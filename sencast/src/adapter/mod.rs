//! Post-processing adapters.
//!
//! Adapters consume a group's [`MosaicedLedger`] after the processor chain:
//! quicklooks, GeoTIFF export, Datalakes upload and the JSON manifest. A
//! failing adapter never stops the ones after it.

mod command;
mod manifest;
mod registry;

pub use command::CommandAdapter;
pub use manifest::{ManifestAdapter, MANIFEST_ADAPTER};
pub use registry::{AdapterFactory, AdapterRegistry, KNOWN_ADAPTERS};

use chrono::NaiveDate;
use std::path::Path;

use crate::pipeline::{CellFailure, MosaicedLedger, RunEnv};
use crate::BoxFuture;

/// Input of one adapter call for one group.
#[derive(Debug, Clone, Copy)]
pub struct AdaptRequest<'a> {
    pub date: NaiveDate,
    pub products: &'a MosaicedLedger,
    /// Deterministic location the adapter should write
    pub target: &'a Path,
    pub env: &'a RunEnv,
}

/// A named export step in the per-group adapter chain.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    /// Processors whose merged output this adapter needs.
    fn inputs(&self) -> &[String] {
        &[]
    }

    /// Extension of the target file, without the dot.
    fn extension(&self) -> &str {
        ""
    }

    fn apply<'a>(&'a self, request: AdaptRequest<'a>) -> BoxFuture<'a, Result<(), CellFailure>>;
}
