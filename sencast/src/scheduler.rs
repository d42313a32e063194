//! Grouping scenes by sensing date and ordering the groups for execution.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

use crate::scene::ResolvedScene;

/// The tiles needed to cover the AOI on one sensing date.
///
/// Membership is fixed at creation. Later stages may only filter it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneGroup {
    pub date: NaiveDate,
    pub scenes: Vec<ResolvedScene>,
}

impl SceneGroup {
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Builds the execution order of scene groups.
pub struct GroupScheduler;

impl GroupScheduler {
    /// Groups scenes by sensing date, keeping input order within a date.
    pub fn group_by_date(scenes: Vec<ResolvedScene>) -> BTreeMap<NaiveDate, Vec<ResolvedScene>> {
        let mut groups: BTreeMap<NaiveDate, Vec<ResolvedScene>> = BTreeMap::new();
        for scene in scenes {
            groups.entry(scene.sensing_date()).or_default().push(scene);
        }
        groups
    }

    /// Returns the groups ordered by `(size, date)`, smallest first.
    ///
    /// The order is computed once; it is the spawn order of the run.
    pub fn schedule(scenes: Vec<ResolvedScene>) -> Vec<SceneGroup> {
        let mut groups: Vec<SceneGroup> = Self::group_by_date(scenes)
            .into_iter()
            .map(|(date, scenes)| SceneGroup { date, scenes })
            .collect();
        groups.sort_by_key(|group| (group.len(), group.date));

        for (position, group) in groups.iter().enumerate() {
            debug!(position, group = %group.date, tiles = group.len(), "Scheduled group");
        }
        groups
    }
}
