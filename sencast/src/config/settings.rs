//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. The
//! `[processor.<NAME>]` and `[adapter.<NAME>]` sections are kept as free-form
//! [`SectionParams`] because their keys belong to the collaborator.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::file::ConfigurationError;
use crate::scene::Sensor;

/// Complete hindcast configuration loaded from config.ini.
///
/// Built once at startup and shared read-only (`Arc<HindcastConfig>`).
#[derive(Debug, Clone)]
pub struct HindcastConfig {
    pub general: GeneralSettings,
    pub concurrency: ConcurrencySettings,
    pub provider: ProviderSettings,
    pub mosaic: MosaicSettings,
    pub logging: LoggingSettings,
    /// `[processor.<NAME>]` sections keyed by upper-case name.
    pub processors: BTreeMap<String, SectionParams>,
    /// `[adapter.<NAME>]` sections keyed by upper-case name.
    pub adapters: BTreeMap<String, SectionParams>,
}

impl HindcastConfig {
    /// Parameters for a processor, empty when its section is absent.
    pub fn processor_params(&self, name: &str) -> SectionParams {
        self.processors
            .get(name)
            .cloned()
            .unwrap_or_else(|| SectionParams::new(format!("processor.{}", name)))
    }

    /// Parameters for an adapter, empty when its section is absent.
    pub fn adapter_params(&self, name: &str) -> SectionParams {
        self.adapters
            .get(name)
            .cloned()
            .unwrap_or_else(|| SectionParams::new(format!("adapter.{}", name)))
    }
}

/// `[general]` section: what to compute, where and when.
#[derive(Debug, Clone)]
pub struct GeneralSettings {
    /// AOI name, used in the run directory name
    pub name: String,
    /// AOI polygon as WKT (inline `wkt` or the contents of `wkt_file`)
    pub wkt: String,
    pub sensor: Sensor,
    /// Resolution hint in metres
    pub resolution: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Processor names in execution order
    pub processors: Vec<String>,
    /// Adapter names in execution order
    pub adapters: Vec<String>,
    /// Only use Level-1 products already on disk
    pub offline: bool,
    pub l1_directory: PathBuf,
    pub output_directory: PathBuf,
    /// Outputs below this size count as empty
    pub min_output_bytes: u64,
}

/// `[concurrency]` section: capacities of the three resource pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencySettings {
    pub max_parallel_downloads: usize,
    pub max_parallel_processors: usize,
    pub max_parallel_adapters: usize,
}

/// `[provider]` section.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider name: "coah", "creodias", "earthdata", "eros" or "hda"
    pub kind: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint
    pub base_url: Option<String>,
    /// Retries per scene after the first failed download
    pub max_retries: u32,
    /// Fixed delay between download attempts
    pub retry_delay: Duration,
    /// HTTP request timeout
    pub timeout: Duration,
    pub page_size: usize,
    /// Poll interval for asynchronous data requests
    pub poll_interval: Duration,
}

/// `[mosaic]` section.
#[derive(Debug, Clone)]
pub struct MosaicSettings {
    /// Command template with `{inputs}` and `{output}`
    pub command: Option<String>,
    pub attempts: u32,
    pub timeout: Duration,
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

/// Free-form key/value parameters of one `[processor.X]` or `[adapter.X]`
/// section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionParams {
    section: String,
    values: BTreeMap<String, String>,
}

impl SectionParams {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert, mostly for tests and programmatic setup.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Section name this block was read from, e.g. `processor.C2RCC`.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Returns a non-empty value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Returns a value that must be present.
    pub fn require(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.get(key).ok_or_else(|| ConfigurationError::MissingKey {
            section: self.section.clone(),
            key: key.to_string(),
        })
    }

    /// Parses a value, falling back to `default` when absent.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigurationError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| ConfigurationError::InvalidValue {
                section: self.section.clone(),
                key: key.to_string(),
                value: v.to_string(),
                reason: "could not be parsed".to_string(),
            }),
        }
    }

    /// Parses a comma-separated list, dropping empty entries.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.get(key).map(split_list).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.trim()))
    }
}

/// Splits a comma-separated name list, trimming and dropping empty entries.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_params_get_ignores_blank() {
        let params = SectionParams::new("processor.C2RCC")
            .with("command", "  ")
            .with("attempts", " 3 ");
        assert_eq!(params.get("command"), None);
        assert_eq!(params.parse_or("attempts", 1u32).unwrap(), 3);
        assert_eq!(params.parse_or("timeout_secs", 60u64).unwrap(), 60);
    }

    #[test]
    fn test_section_params_require_reports_section() {
        let params = SectionParams::new("adapter.QLRGB");
        match params.require("command") {
            Err(ConfigurationError::MissingKey { section, key }) => {
                assert_eq!(section, "adapter.QLRGB");
                assert_eq!(key, "command");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_split_list_preserves_order() {
        assert_eq!(
            split_list("IDEPIX, C2RCC,,POLYMER ,"),
            vec!["IDEPIX", "C2RCC", "POLYMER"]
        );
        assert!(split_list("").is_empty());
    }
}
