//! Default values and constants for all configuration settings.

use std::path::PathBuf;
use std::time::Duration;

use super::settings::*;

/// Default AOI name used for the run directory.
pub const DEFAULT_AOI_NAME: &str = "aoi";

/// Outputs smaller than this are treated as empty (1 KiB).
pub const DEFAULT_MIN_OUTPUT_BYTES: u64 = 1024;

/// Default capacity of each resource pool.
pub const DEFAULT_MAX_PARALLEL: usize = 1;

/// Provider used when `[provider] type` is not set.
pub const DEFAULT_PROVIDER: &str = "creodias";

/// Download retries after the first failed attempt.
pub const DEFAULT_PROVIDER_MAX_RETRIES: u32 = 3;

/// Fixed delay between download attempts.
pub const DEFAULT_PROVIDER_RETRY_DELAY_SECS: u64 = 30;

/// HTTP request timeout for provider calls.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 600;

/// Search page size.
pub const DEFAULT_PROVIDER_PAGE_SIZE: usize = 100;

/// Interval between polls of asynchronous data requests (HDA).
pub const DEFAULT_PROVIDER_POLL_INTERVAL_SECS: u64 = 10;

/// Attempts for external processor, mosaic and adapter commands.
pub const DEFAULT_COMMAND_ATTEMPTS: u32 = 1;

/// Per-attempt timeout for external commands (6 hours).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 6 * 60 * 60;

/// Get the default Level-1 directory (~/.sencast/L1).
pub fn default_l1_directory() -> PathBuf {
    super::file::config_directory().join("L1")
}

/// Get the default output directory (~/.sencast/L2).
pub fn default_output_directory() -> PathBuf {
    super::file::config_directory().join("L2")
}

/// Get the default log file path (~/.sencast/sencast.log).
pub fn default_log_file() -> PathBuf {
    super::file::config_directory().join("sencast.log")
}

impl Default for ConcurrencySettings {
    fn default() -> Self {
        Self {
            max_parallel_downloads: DEFAULT_MAX_PARALLEL,
            max_parallel_processors: DEFAULT_MAX_PARALLEL,
            max_parallel_adapters: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: DEFAULT_PROVIDER.to_string(),
            username: None,
            password: None,
            api_key: None,
            base_url: None,
            max_retries: DEFAULT_PROVIDER_MAX_RETRIES,
            retry_delay: Duration::from_secs(DEFAULT_PROVIDER_RETRY_DELAY_SECS),
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            page_size: DEFAULT_PROVIDER_PAGE_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_PROVIDER_POLL_INTERVAL_SECS),
        }
    }
}

impl Default for MosaicSettings {
    fn default() -> Self {
        Self {
            command: None,
            attempts: DEFAULT_COMMAND_ATTEMPTS,
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}
