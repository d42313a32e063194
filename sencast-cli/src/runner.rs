//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization, the async
//! runtime and service creation to reduce duplication across command
//! handlers.

use crate::error::CliError;
use sencast::config::HindcastConfig;
use sencast::logging::{init_logging, split_log_path, LoggingGuard};
use sencast::service::HindcastService;
use std::future::Future;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: HindcastConfig,
    runtime: Runtime,
}

impl CliRunner {
    /// Loads the configuration and initializes logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit configuration file, or the default location
    /// * `stdout` - Mirror log output to stdout
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn new(config_path: Option<&Path>, stdout: bool, debug_mode: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let (log_dir, log_file) = split_log_path(&config.logging.file);
        let logging_guard = init_logging(&log_dir, &log_file, stdout, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Runtime::new().map_err(CliError::Runtime)?;

        Ok(Self {
            logging_guard,
            config,
            runtime,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &HindcastConfig {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Sencast v{}", sencast::VERSION);
        info!("Sencast CLI: {} command", command);
    }

    /// Create a service for the given configuration.
    pub fn create_service(&self, config: HindcastConfig) -> Result<HindcastService, CliError> {
        HindcastService::new(config)
            .map_err(CliError::ServiceCreation)
            .inspect(|service| info!(provider = service.provider_name(), "Service created successfully"))
    }

    /// Drives a future to completion on the runner's runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Loads `path`, or the default configuration file when none is given.
pub fn load_config(path: Option<&Path>) -> Result<HindcastConfig, CliError> {
    let config = match path {
        Some(path) => HindcastConfig::load_from(path)?,
        None => HindcastConfig::load()?,
    };
    Ok(config)
}
