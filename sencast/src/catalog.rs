//! Scene catalog: query window and AOI to scene pairs.
//!
//! The catalog delegates the search to the configured provider, collapses
//! products published under several timeliness tiers into the best one, and
//! pairs every scene with its canonical Level-1 path. Provider failures are
//! returned as-is; retrying is not this layer's business.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::provider::{AuthHandle, DownloadProvider, ProviderError, SearchCriteria};
use crate::scene::{scene_path, SceneDescriptor, ScenePair};

/// Resolves a search into deduplicated, located scenes.
pub struct SceneCatalog {
    provider: Arc<dyn DownloadProvider>,
    l1_root: PathBuf,
}

impl SceneCatalog {
    pub fn new(provider: Arc<dyn DownloadProvider>, l1_root: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            l1_root: l1_root.into(),
        }
    }

    pub fn l1_root(&self) -> &Path {
        &self.l1_root
    }

    /// Searches the provider and removes timeliness duplicates.
    #[instrument(skip_all, fields(provider = self.provider.name(), sensor = %criteria.sensor))]
    pub async fn search(
        &self,
        auth: &AuthHandle,
        criteria: &SearchCriteria,
    ) -> Result<Vec<SceneDescriptor>, ProviderError> {
        let found = self.provider.search(auth, criteria).await?;
        let found_count = found.len();
        let scenes = dedup_timeliness(found);
        info!(
            found = found_count,
            unique = scenes.len(),
            "Catalog search complete"
        );
        Ok(scenes)
    }

    /// Pairs each scene with the path its Level-1 product occupies.
    pub fn locate(&self, scenes: Vec<SceneDescriptor>) -> Vec<ScenePair> {
        scenes
            .into_iter()
            .map(|descriptor| {
                let path = scene_path(&self.l1_root, descriptor.sensor, &descriptor.name);
                ScenePair { descriptor, path }
            })
            .collect()
    }

    /// [`search`](Self::search) followed by [`locate`](Self::locate).
    pub async fn resolve(
        &self,
        auth: &AuthHandle,
        criteria: &SearchCriteria,
    ) -> Result<Vec<ScenePair>, ProviderError> {
        Ok(self.locate(self.search(auth, criteria).await?))
    }
}

/// Keeps one descriptor per physical acquisition.
///
/// Descriptors with identical sensing start, sensing end and tile are the
/// same acquisition; the one with the highest timeliness tier survives (an
/// unknown tier ranks lowest, ties keep the first seen). Output order follows
/// the first occurrence of each acquisition.
pub fn dedup_timeliness(scenes: Vec<SceneDescriptor>) -> Vec<SceneDescriptor> {
    let mut kept: Vec<SceneDescriptor> = Vec::with_capacity(scenes.len());
    let mut index = HashMap::new();

    for scene in scenes {
        let key = (scene.sensing_start, scene.sensing_end, scene.tile.clone());
        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(scene);
            }
            Entry::Occupied(slot) => {
                let existing = &mut kept[*slot.get()];
                if scene.timeliness > existing.timeliness {
                    debug!(kept = %scene.name, dropped = %existing.name, "Replacing lower timeliness duplicate");
                    *existing = scene;
                } else {
                    debug!(kept = %existing.name, dropped = %scene.name, "Dropping timeliness duplicate");
                }
            }
        }
    }

    kept
}
