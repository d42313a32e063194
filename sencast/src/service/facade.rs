//! Hindcast service facade implementation.

use std::sync::Arc;
use tracing::{info, instrument};

use super::builder::HindcastServiceBuilder;
use super::error::ServiceError;
use crate::adapter::Adapter;
use crate::availability::{Availability, AvailabilityResolver};
use crate::catalog::SceneCatalog;
use crate::config::HindcastConfig;
use crate::executor::{ConcurrencyCoordinator, PoolCapacities};
use crate::mosaic::Mosaic;
use crate::pipeline::{GroupPipeline, RunEnv, RunReport, SceneCounts};
use crate::processor::Processor;
use crate::provider::{AuthHandle, Credentials, DownloadProvider, RetryPolicy, SearchCriteria};
use crate::scheduler::GroupScheduler;

/// Result of a catalog search with availability applied.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSearch {
    /// Unique scenes returned by the catalog
    pub found: usize,
    pub availability: Availability,
}

/// High-level facade for hindcast operations.
///
/// Owns the validated collaborators of one configuration. Construction
/// through [`builder`](Self::builder) performs every check that does not
/// need the network.
///
/// # Example
///
/// ```ignore
/// let service = HindcastService::builder(config).build()?;
/// let report = service.run().await?;
/// println!("{}", report);
/// ```
pub struct HindcastService {
    pub(super) config: Arc<HindcastConfig>,
    pub(super) env: RunEnv,
    pub(super) provider: Arc<dyn DownloadProvider>,
    pub(super) credentials: Credentials,
    pub(super) retry: RetryPolicy,
    pub(super) capacities: PoolCapacities,
    pub(super) processors: Vec<Arc<dyn Processor>>,
    pub(super) adapters: Vec<Arc<dyn Adapter>>,
    pub(super) mosaic: Arc<dyn Mosaic>,
}

impl HindcastService {
    pub fn builder(config: HindcastConfig) -> HindcastServiceBuilder {
        HindcastServiceBuilder::new(config)
    }

    /// Builds the service with the configured provider and default registries.
    pub fn new(config: HindcastConfig) -> Result<Self, ServiceError> {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &HindcastConfig {
        &self.config
    }

    pub fn env(&self) -> &RunEnv {
        &self.env
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Processor names in execution order.
    pub fn processor_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Adapter names in execution order.
    pub fn adapter_names(&self) -> Vec<&str> {
        self.adapters.iter().map(|a| a.name()).collect()
    }

    /// Authenticates and searches the catalog without running anything.
    pub async fn search(&self) -> Result<SceneSearch, ServiceError> {
        let auth = self.authenticate().await?;
        self.discover(&auth).await
    }

    /// Runs the full hindcast.
    ///
    /// Only authentication and the catalog search can fail the run as a
    /// whole; everything after that is reported per group.
    #[instrument(skip_all, fields(aoi = %self.env.aoi.name(), sensor = %self.env.sensor))]
    pub async fn run(&self) -> Result<RunReport, ServiceError> {
        let auth = self.authenticate().await?;
        let search = self.discover(&auth).await?;

        let scenes = SceneCounts {
            found: search.found,
            available: search.availability.available,
            to_download: search.availability.to_download,
            dropped: search.availability.dropped,
        };
        let groups = GroupScheduler::schedule(search.availability.scenes);
        info!(
            groups = groups.len(),
            processors = ?self.processor_names(),
            adapters = ?self.adapter_names(),
            "Starting hindcast"
        );

        let worker = Arc::new(
            GroupPipeline::new(self.env.clone(), Arc::clone(&self.provider), auth)
                .with_retry(self.retry)
                .with_processors(self.processors.clone())
                .with_adapters(self.adapters.clone())
                .with_mosaic(Arc::clone(&self.mosaic)),
        );
        let coordinator = ConcurrencyCoordinator::new(self.capacities);
        let groups = coordinator.run(groups, worker).await;

        let report = RunReport { scenes, groups };
        info!(
            groups = report.groups.len(),
            failed = report.failed_groups().count(),
            "Hindcast finished"
        );
        Ok(report)
    }

    async fn authenticate(&self) -> Result<AuthHandle, ServiceError> {
        Ok(self.provider.authenticate(&self.credentials).await?)
    }

    async fn discover(&self, auth: &AuthHandle) -> Result<SceneSearch, ServiceError> {
        let catalog = SceneCatalog::new(Arc::clone(&self.provider), &self.config.general.l1_directory);
        let criteria = SearchCriteria::new(&self.config, &self.env.aoi);
        let pairs = catalog.resolve(auth, &criteria).await?;
        let found = pairs.len();
        let availability = AvailabilityResolver::new(self.config.general.offline).resolve(pairs);
        Ok(SceneSearch {
            found,
            availability,
        })
    }
}
