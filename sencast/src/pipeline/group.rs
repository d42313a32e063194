//! The per-group worker: download through adapt for one sensing date.

use std::sync::Arc;
use tracing::{info, instrument};

use super::stages::{
    adapt_stage, download_stage, integrity_stage, mosaic_stage, process_stage, reduce_stage,
};
use super::{GroupFailure, GroupReport, RunEnv};
use crate::adapter::Adapter;
use crate::executor::{GroupWorker, ResourcePools, ResourceType};
use crate::mosaic::{CommandMosaic, Mosaic};
use crate::processor::Processor;
use crate::provider::{AuthHandle, DownloadProvider, RetryPolicy};
use crate::scheduler::SceneGroup;
use crate::BoxFuture;

/// Drives one group through all stages.
///
/// Download and integrity failures abort the group. From the processor
/// stage on, failures are confined to the cell or step that raised them.
pub struct GroupPipeline {
    env: RunEnv,
    provider: Arc<dyn DownloadProvider>,
    auth: AuthHandle,
    retry: RetryPolicy,
    processors: Vec<Arc<dyn Processor>>,
    adapters: Vec<Arc<dyn Adapter>>,
    mosaic: Arc<dyn Mosaic>,
}

impl GroupPipeline {
    pub fn new(env: RunEnv, provider: Arc<dyn DownloadProvider>, auth: AuthHandle) -> Self {
        Self {
            env,
            provider,
            auth,
            retry: RetryPolicy::default(),
            processors: Vec::new(),
            adapters: Vec::new(),
            mosaic: Arc::new(CommandMosaic::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_processors(mut self, processors: Vec<Arc<dyn Processor>>) -> Self {
        self.processors = processors;
        self
    }

    pub fn with_adapters(mut self, adapters: Vec<Arc<dyn Adapter>>) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_mosaic(mut self, mosaic: Arc<dyn Mosaic>) -> Self {
        self.mosaic = mosaic;
        self
    }

    pub fn env(&self) -> &RunEnv {
        &self.env
    }

    /// Runs the group to completion.
    ///
    /// Holds one process permit across the processor chain and the mosaic,
    /// and one adapt permit across the adapter chain.
    #[instrument(skip_all, fields(group = %group.date, tiles = group.len()))]
    pub async fn run(
        &self,
        group: SceneGroup,
        pools: &ResourcePools,
    ) -> Result<GroupReport, GroupFailure> {
        let downloaded =
            download_stage(&group, self.provider.as_ref(), &self.auth, self.retry, pools).await?;
        integrity_stage(&group)?;

        let date = group.date;
        let tiles_before_reduction = group.len();
        let reduction = reduce_stage(group.scenes, &self.env.aoi);
        let scenes = reduction.scenes;

        let mut report = GroupReport::new(date, scenes.iter().map(|s| s.name().to_string()).collect());
        report.tiles_before_reduction = tiles_before_reduction;
        report.partial_coverage = reduction.partial_coverage;
        report.downloaded = downloaded;

        let products = {
            let _permit = pools.acquire(ResourceType::Process).await;
            let (ledger, cells) = process_stage(&scenes, &self.processors, &self.env).await;
            report.cells = cells;
            let (products, mosaics) = mosaic_stage(
                date,
                &scenes,
                &self.processors,
                &ledger,
                self.mosaic.as_ref(),
                &self.env,
            )
            .await;
            report.mosaics = mosaics;
            products
        };

        if !self.adapters.is_empty() {
            let _permit = pools.acquire(ResourceType::Adapt).await;
            report.adapters = adapt_stage(date, &self.adapters, &products, &self.env).await;
        }

        info!(
            cells = report.cells.len(),
            mosaics = report.mosaics.len(),
            adapters = report.adapters.len(),
            "Group finished"
        );
        Ok(report)
    }
}

impl GroupWorker for GroupPipeline {
    fn run_group<'a>(
        &'a self,
        group: SceneGroup,
        pools: &'a ResourcePools,
    ) -> BoxFuture<'a, Result<GroupReport, GroupFailure>> {
        Box::pin(self.run(group, pools))
    }
}
