//! One worker task per scene group, joined at a barrier.
//!
//! The coordinator spawns every group up front in scheduling order and then
//! waits for all of them. Workers share nothing but the [`ResourcePools`];
//! the pools, not the coordinator, throttle the actual work. A worker that
//! fails or panics becomes a failed [`GroupReport`] and never affects its
//! siblings.

use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info, instrument};

use super::resource_pool::{PoolCapacities, ResourcePools, ResourceType};
use crate::pipeline::{GroupFailure, GroupReport};
use crate::scheduler::SceneGroup;
use crate::BoxFuture;

/// Runs the pipeline for one scene group.
pub trait GroupWorker: Send + Sync + 'static {
    fn run_group<'a>(
        &'a self,
        group: SceneGroup,
        pools: &'a ResourcePools,
    ) -> BoxFuture<'a, Result<GroupReport, GroupFailure>>;
}

/// Owns the three resource pools and the per-group worker tasks.
#[derive(Debug)]
pub struct ConcurrencyCoordinator {
    pools: Arc<ResourcePools>,
}

impl ConcurrencyCoordinator {
    pub fn new(capacities: PoolCapacities) -> Self {
        Self {
            pools: Arc::new(ResourcePools::new(capacities)),
        }
    }

    pub fn pools(&self) -> &Arc<ResourcePools> {
        &self.pools
    }

    /// Spawns one task per group and waits for all of them.
    ///
    /// Reports come back in spawn order, one per group.
    #[instrument(skip_all, fields(groups = groups.len()))]
    pub async fn run<W>(&self, groups: Vec<SceneGroup>, worker: Arc<W>) -> Vec<GroupReport>
    where
        W: GroupWorker + ?Sized,
    {
        let mut handles = Vec::with_capacity(groups.len());

        for group in groups {
            let date = group.date;
            let tiles: Vec<String> = group.scenes.iter().map(|s| s.name().to_string()).collect();
            let worker = Arc::clone(&worker);
            let pools = Arc::clone(&self.pools);

            let handle = tokio::spawn(async move { worker.run_group(group, &pools).await });
            handles.push((date, tiles, handle));
        }
        info!(spawned = handles.len(), "Group workers spawned");

        let mut reports = Vec::with_capacity(handles.len());
        for (date, tiles, handle) in handles {
            let report = match handle.await {
                Ok(Ok(report)) => report,
                Ok(Err(failure)) => {
                    error!(group = %date, error = %failure, "Group failed");
                    GroupReport::failed(date, tiles, failure)
                }
                Err(join_error) => {
                    let message = join_message(join_error);
                    error!(group = %date, error = %message, "Group worker aborted");
                    GroupReport::failed(date, tiles, GroupFailure::Panicked(message))
                }
            };
            reports.push(report);
        }

        info!(
            groups = reports.len(),
            failed = reports.iter().filter(|r| r.is_failed()).count(),
            peak_downloads = self.pools.peak_in_flight(ResourceType::Download),
            peak_processing = self.pools.peak_in_flight(ResourceType::Process),
            peak_adapting = self.pools.peak_in_flight(ResourceType::Adapt),
            "All group workers finished"
        );
        reports
    }
}

fn join_message(join_error: JoinError) -> String {
    if join_error.is_cancelled() {
        return "worker was cancelled".to_string();
    }
    let payload = join_error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ResolvedScene, SceneDescriptor};
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn group(day: u32) -> SceneGroup {
        let name = format!(
            "S2B_MSIL1C_202107{:02}T103029_N0301_R108_T32TLS_202107{:02}T124106.SAFE",
            day, day
        );
        SceneGroup {
            date: NaiveDate::from_ymd_opt(2021, 7, day).unwrap(),
            scenes: vec![ResolvedScene {
                descriptor: SceneDescriptor::from_product_name(name.clone(), &name).unwrap(),
                path: PathBuf::from(&name),
                download_required: false,
            }],
        }
    }

    /// Holds the process permit for a while and records overlap.
    struct SlowWorker {
        inside: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GroupWorker for SlowWorker {
        fn run_group<'a>(
            &'a self,
            group: SceneGroup,
            pools: &'a ResourcePools,
        ) -> BoxFuture<'a, Result<GroupReport, GroupFailure>> {
            Box::pin(async move {
                let _permit = pools.acquire(ResourceType::Process).await;
                let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.inside.fetch_sub(1, Ordering::SeqCst);
                Ok(GroupReport::new(group.date, Vec::new()))
            })
        }
    }

    /// Fails day 2 and panics on day 3.
    struct FaultyWorker;

    impl GroupWorker for FaultyWorker {
        fn run_group<'a>(
            &'a self,
            group: SceneGroup,
            _pools: &'a ResourcePools,
        ) -> BoxFuture<'a, Result<GroupReport, GroupFailure>> {
            Box::pin(async move {
                match group.date.format("%d").to_string().as_str() {
                    "02" => Err(GroupFailure::Integrity {
                        missing: vec![PathBuf::from("/l1/missing")],
                    }),
                    "03" => panic!("processor exploded"),
                    _ => Ok(GroupReport::new(group.date, vec!["ok".into()])),
                }
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_process_pool_bounds_groups() {
        let coordinator = ConcurrencyCoordinator::new(PoolCapacities::new(4, 1, 1));
        let worker = Arc::new(SlowWorker {
            inside: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        let reports = coordinator
            .run((1..=5).map(group).collect(), Arc::clone(&worker))
            .await;

        assert_eq!(reports.len(), 5);
        assert_eq!(worker.peak.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pools().peak_in_flight(ResourceType::Process), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_wider_pool_allows_overlap() {
        let coordinator = ConcurrencyCoordinator::new(PoolCapacities::new(1, 3, 1));
        let worker = Arc::new(SlowWorker {
            inside: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });

        coordinator
            .run((1..=6).map(group).collect(), Arc::clone(&worker))
            .await;

        assert!(worker.peak.load(Ordering::SeqCst) <= 3);
        assert!(coordinator.pools().peak_in_flight(ResourceType::Process) <= 3);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_group() {
        let coordinator = ConcurrencyCoordinator::new(PoolCapacities::default());

        let reports = coordinator
            .run((1..=4).map(group).collect(), Arc::new(FaultyWorker))
            .await;

        assert_eq!(reports.len(), 4);
        assert!(!reports[0].is_failed());
        assert!(matches!(reports[1].failure, Some(GroupFailure::Integrity { .. })));
        assert_eq!(
            reports[2].failure,
            Some(GroupFailure::Panicked("processor exploded".into()))
        );
        assert!(!reports[3].is_failed());
        // Failed groups keep their tile list
        assert_eq!(reports[1].tiles.len(), 1);
    }

    #[tokio::test]
    async fn test_reports_follow_spawn_order() {
        let coordinator = ConcurrencyCoordinator::new(PoolCapacities::default());
        let groups = vec![group(4), group(1), group(3)];

        let reports = coordinator.run(groups, Arc::new(FaultyWorker)).await;

        let days: Vec<String> = reports.iter().map(|r| r.date.format("%d").to_string()).collect();
        assert_eq!(days, vec!["04", "01", "03"]);
    }
}
