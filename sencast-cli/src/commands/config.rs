//! Configuration management CLI commands.
//!
//! Provides `config check` and `config path` for validating and locating the
//! hindcast configuration from the command line.

use clap::Subcommand;
use sencast::config::config_file_path;
use sencast::service::HindcastService;
use std::path::PathBuf;

use crate::error::CliError;
use crate::runner::load_config;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file without running anything
    ///
    /// Parses the file, resolves the AOI, and builds the processor and
    /// adapter chains and the download provider.
    Check {
        /// Configuration file (default: ~/.sencast/config.ini)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the default configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Check { config } => run_check(config),
        ConfigCommands::Path => run_path(),
    }
}

/// Validate a configuration file.
fn run_check(path: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(path.as_deref())?;
    let service = HindcastService::new(config).map_err(CliError::ServiceCreation)?;

    let config = service.config();
    let general = &config.general;
    let concurrency = &config.concurrency;

    println!("Configuration OK");
    println!();
    println!("[general]");
    println!("  name = {}", general.name);
    println!("  sensor = {} ({} m)", general.sensor, general.resolution);
    println!("  start = {}", general.start);
    println!("  end = {}", general.end);
    println!("  processors = {}", service.processor_names().join(", "));
    println!("  adapters = {}", service.adapter_names().join(", "));
    println!("  offline = {}", general.offline);
    println!("  l1_directory = {}", general.l1_directory.display());
    println!("  output = {}", service.env().layout.run_dir().display());
    println!();
    println!("[concurrency]");
    println!("  max_parallel_downloads = {}", concurrency.max_parallel_downloads);
    println!("  max_parallel_processors = {}", concurrency.max_parallel_processors);
    println!("  max_parallel_adapters = {}", concurrency.max_parallel_adapters);
    println!();
    println!("[provider]");
    println!("  type = {}", service.provider_name());

    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}
