//! Builder wiring configuration, registries and collaborators into a
//! [`HindcastService`].
//!
//! Everything that can be checked without touching the network is checked
//! in [`build`](HindcastServiceBuilder::build), so a misconfigured run fails
//! before any worker is spawned.

use std::sync::Arc;

use super::error::ServiceError;
use super::facade::HindcastService;
use crate::adapter::AdapterRegistry;
use crate::config::HindcastConfig;
use crate::executor::PoolCapacities;
use crate::mosaic::{CommandMosaic, Mosaic};
use crate::pipeline::RunEnv;
use crate::processor::ProcessorRegistry;
use crate::provider::{Credentials, DownloadProvider, ProviderFactory, RetryPolicy};

/// Builder for [`HindcastService`].
///
/// Unset collaborators fall back to the configured ones: the provider named
/// in `[provider] type`, the default registries and the `[mosaic] command`.
pub struct HindcastServiceBuilder {
    config: HindcastConfig,
    provider: Option<Arc<dyn DownloadProvider>>,
    processors: ProcessorRegistry,
    adapters: AdapterRegistry,
    mosaic: Option<Arc<dyn Mosaic>>,
}

impl HindcastServiceBuilder {
    pub(super) fn new(config: HindcastConfig) -> Self {
        Self {
            config,
            provider: None,
            processors: ProcessorRegistry::with_defaults(),
            adapters: AdapterRegistry::with_defaults(),
            mosaic: None,
        }
    }

    /// Uses `provider` instead of creating one from `[provider]`.
    pub fn provider(mut self, provider: Arc<dyn DownloadProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn processor_registry(mut self, registry: ProcessorRegistry) -> Self {
        self.processors = registry;
        self
    }

    pub fn adapter_registry(mut self, registry: AdapterRegistry) -> Self {
        self.adapters = registry;
        self
    }

    pub fn mosaic(mut self, mosaic: Arc<dyn Mosaic>) -> Self {
        self.mosaic = Some(mosaic);
        self
    }

    /// Validates the configuration and builds the service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ConfigError`] for an invalid AOI, an unknown
    /// processor, adapter or provider, a broken processor chain, or an
    /// unparsable command template.
    pub fn build(self) -> Result<HindcastService, ServiceError> {
        let config = self.config;

        let env = RunEnv::from_config(&config)?;
        let processors = self.processors.build_chain(&config)?;
        let adapters = self.adapters.build_chain(&config)?;
        let mosaic = match self.mosaic {
            Some(mosaic) => mosaic,
            None => Arc::new(CommandMosaic::from_settings(&config.mosaic)?),
        };
        let provider = match self.provider {
            Some(provider) => provider,
            None => ProviderFactory::create(&config.provider)?,
        };

        Ok(HindcastService {
            credentials: Credentials::from_settings(&config.provider),
            retry: RetryPolicy::from_settings(&config.provider),
            capacities: PoolCapacities::from(&config.concurrency),
            config: Arc::new(config),
            env,
            provider,
            processors,
            adapters,
            mosaic,
        })
    }
}
