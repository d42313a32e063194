//! Availability gating: which scenes are on disk, which must be downloaded.

use tracing::{debug, info};

use crate::scene::{ResolvedScene, ScenePair};

/// Outcome of an availability check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Availability {
    /// Scenes that take part in the run.
    pub scenes: Vec<ResolvedScene>,
    /// Scenes already present locally.
    pub available: usize,
    /// Scenes that will be downloaded.
    pub to_download: usize,
    /// Scenes dropped because they are missing in offline mode.
    pub dropped: usize,
}

/// Partitions scene pairs by local presence.
///
/// Offline, missing scenes are dropped without error: read-only archives
/// are expected to be incomplete. Online, every scene is kept and flagged
/// for download when its path does not exist yet.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityResolver {
    offline: bool,
}

impl AvailabilityResolver {
    pub fn new(offline: bool) -> Self {
        Self { offline }
    }

    pub fn resolve(&self, pairs: Vec<ScenePair>) -> Availability {
        let mut availability = Availability::default();

        for ScenePair { descriptor, path } in pairs {
            let present = path.exists();
            if present {
                availability.available += 1;
            } else if self.offline {
                debug!(scene = %descriptor.name, path = %path.display(), "Offline: dropping missing scene");
                availability.dropped += 1;
                continue;
            } else {
                availability.to_download += 1;
            }
            availability.scenes.push(ResolvedScene {
                descriptor,
                path,
                download_required: !present,
            });
        }

        info!(
            offline = self.offline,
            available = availability.available,
            to_download = availability.to_download,
            dropped = availability.dropped,
            "Availability resolved"
        );
        availability
    }
}
