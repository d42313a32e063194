//! Minimal-subset reduction of multi-tile groups.
//!
//! Only groups of exactly two or four tiles are reduced; those are the
//! cardinalities at which a rectangular AOI can be covered by a strict
//! subset. Every other size passes through unchanged.

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::aoi::{Aoi, CornerSet};
use crate::scene::ResolvedScene;

/// Group sizes eligible for reduction.
pub const REDUCIBLE_GROUP_SIZES: [usize; 2] = [2, 4];

/// Tiles kept for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub scenes: Vec<ResolvedScene>,
    /// No subset, the full group included, covers all four AOI corners
    pub partial_coverage: bool,
}

/// Returns the indices of the smallest subset whose corners cover the AOI.
///
/// Subsets are tried by ascending cardinality, in lexicographic index order
/// within a cardinality. `None` when even the full set falls short.
pub fn minimal_cover(coverage: &[CornerSet]) -> Option<Vec<usize>> {
    (1..=coverage.len()).find_map(|size| {
        (0..coverage.len()).combinations(size).find(|subset| {
            subset
                .iter()
                .fold(CornerSet::empty(), |set, i| set.union(coverage[*i]))
                .is_complete()
        })
    })
}

/// Reduces a group to the smallest set of tiles covering the AOI corners.
///
/// Tiles without a known footprint make the coverage unknowable, in which
/// case the group is kept whole.
pub fn reduce_stage(scenes: Vec<ResolvedScene>, aoi: &Aoi) -> Reduction {
    let unchanged = |scenes| Reduction {
        scenes,
        partial_coverage: false,
    };

    if !REDUCIBLE_GROUP_SIZES.contains(&scenes.len()) {
        return unchanged(scenes);
    }

    let coverage: Option<Vec<CornerSet>> = scenes
        .iter()
        .map(|s| s.descriptor.footprint.as_ref().map(|f| aoi.covered_corners(f)))
        .collect();
    let Some(coverage) = coverage else {
        debug!(tiles = scenes.len(), "Footprint unknown, skipping reduction");
        return unchanged(scenes);
    };

    match minimal_cover(&coverage) {
        Some(keep) => {
            if keep.len() < scenes.len() {
                info!(from = scenes.len(), to = keep.len(), "Reduced group to covering subset");
            }
            let scenes = scenes
                .into_iter()
                .enumerate()
                .filter(|(i, _)| keep.contains(i))
                .map(|(_, s)| s)
                .collect();
            unchanged(scenes)
        }
        None => {
            warn!(tiles = scenes.len(), "AOI only partially covered by group");
            Reduction {
                scenes,
                partial_coverage: true,
            }
        }
    }
}
