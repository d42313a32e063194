//! Per-group product ledgers.
//!
//! Both ledgers are owned by a single group worker and built from the
//! return values of each step. A failed step leaves its key absent; there is
//! no error marker, so consumers must treat a missing key as "not available".

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Outputs per tile and processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductLedger {
    entries: BTreeMap<PathBuf, BTreeMap<String, PathBuf>>,
}

impl ProductLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tile: &Path, processor: &str, output: PathBuf) {
        self.entries
            .entry(tile.to_path_buf())
            .or_default()
            .insert(processor.to_string(), output);
    }

    pub fn get(&self, tile: &Path, processor: &str) -> Option<&Path> {
        self.entries
            .get(tile)
            .and_then(|products| products.get(processor))
            .map(PathBuf::as_path)
    }

    pub fn contains(&self, tile: &Path, processor: &str) -> bool {
        self.get(tile, processor).is_some()
    }

    /// Products recorded so far for one tile.
    pub fn products(&self, tile: &Path) -> BTreeMap<String, PathBuf> {
        self.entries.get(tile).cloned().unwrap_or_default()
    }

    /// Outputs of one processor across `tiles`, in the given tile order.
    pub fn outputs<'a>(&'a self, processor: &str, tiles: &[&Path]) -> Vec<&'a Path> {
        tiles
            .iter()
            .filter_map(|tile| self.get(tile, processor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One merged output per processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MosaicedLedger {
    entries: BTreeMap<String, PathBuf>,
}

impl MosaicedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, processor: &str, output: PathBuf) {
        self.entries.insert(processor.to_string(), output);
    }

    pub fn get(&self, processor: &str) -> Option<&Path> {
        self.entries.get(processor).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
