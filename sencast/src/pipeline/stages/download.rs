//! Download stage - fetches missing Level-1 products for a group.
//!
//! Each scene is fetched under its own download permit, and the permit is
//! released between attempts, so a retrying scene never blocks other groups
//! during its back-off delay.

use tracing::{debug, info, instrument, warn};

use crate::executor::{ResourcePools, ResourceType};
use crate::pipeline::GroupFailure;
use crate::provider::{AuthHandle, DownloadProvider, RetryPolicy};
use crate::scene::ResolvedScene;
use crate::scheduler::SceneGroup;

/// Downloads every scene of the group still flagged for download.
///
/// Returns the number of scenes fetched. A scene that exhausts its attempts
/// fails the whole group.
#[instrument(skip_all, fields(group = %group.date))]
pub async fn download_stage(
    group: &SceneGroup,
    provider: &dyn DownloadProvider,
    auth: &AuthHandle,
    retry: RetryPolicy,
    pools: &ResourcePools,
) -> Result<usize, GroupFailure> {
    let mut downloaded = 0;
    for scene in group.scenes.iter().filter(|s| s.download_required) {
        if scene.path.exists() {
            debug!(scene = scene.name(), "Already present, skipping download");
            continue;
        }
        download_scene(scene, provider, auth, retry, pools).await?;
        downloaded += 1;
    }
    Ok(downloaded)
}

async fn download_scene(
    scene: &ResolvedScene,
    provider: &dyn DownloadProvider,
    auth: &AuthHandle,
    retry: RetryPolicy,
    pools: &ResourcePools,
) -> Result<(), GroupFailure> {
    let mut attempt = 1;
    loop {
        let result = {
            let _permit = pools.acquire(ResourceType::Download).await;
            debug!(scene = scene.name(), attempt, "Fetching scene");
            provider.fetch(auth, &scene.descriptor, &scene.path).await
        };

        match result {
            Ok(()) => {
                info!(scene = scene.name(), path = %scene.path.display(), "Scene downloaded");
                return Ok(());
            }
            Err(e) if retry.should_retry(attempt) => {
                warn!(
                    scene = scene.name(),
                    attempt,
                    max_attempts = retry.max_attempts,
                    error = %e,
                    "Download failed, retrying after {:?}",
                    retry.delay
                );
                tokio::time::sleep(retry.delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(GroupFailure::Download {
                    scene: scene.name().to_string(),
                    attempts: attempt,
                    source: e,
                })
            }
        }
    }
}
