//! Integrity stage - every Level-1 path of the group must exist.

use std::path::PathBuf;
use tracing::error;

use crate::pipeline::GroupFailure;
use crate::scheduler::SceneGroup;

/// Fails the group when any scene path is missing after the download stage.
///
/// Catches failed downloads as well as providers that returned success
/// without writing anything.
pub fn integrity_stage(group: &SceneGroup) -> Result<(), GroupFailure> {
    let missing: Vec<PathBuf> = group
        .scenes
        .iter()
        .filter(|s| !s.path.exists())
        .map(|s| s.path.clone())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        error!(group = %group.date, missing = missing.len(), "Integrity check failed");
        Err(GroupFailure::Integrity { missing })
    }
}
