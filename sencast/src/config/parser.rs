//! INI parsing logic for converting `Ini` → `HindcastConfig`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use ini::{Ini, Properties};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults::*;
use super::file::ConfigurationError;
use super::settings::*;
use crate::aoi::Aoi;
use crate::scene::Sensor;

const PROCESSOR_PREFIX: &str = "processor.";
const ADAPTER_PREFIX: &str = "adapter.";

/// Parse an `Ini` object into a `HindcastConfig`.
///
/// Optional sections start from their defaults and overlay any values found.
/// `[general]` carries the required keys. Relative paths resolve against
/// `base_dir`.
pub(super) fn parse_ini(ini: &Ini, base_dir: &Path) -> Result<HindcastConfig, ConfigurationError> {
    let general = parse_general(ini, base_dir)?;

    let mut concurrency = ConcurrencySettings::default();
    if let Some(section) = ini.section(Some("concurrency")) {
        concurrency.max_parallel_downloads =
            parse_pool_size(section, "max_parallel_downloads")?.unwrap_or(DEFAULT_MAX_PARALLEL);
        concurrency.max_parallel_processors =
            parse_pool_size(section, "max_parallel_processors")?.unwrap_or(DEFAULT_MAX_PARALLEL);
        concurrency.max_parallel_adapters =
            parse_pool_size(section, "max_parallel_adapters")?.unwrap_or(DEFAULT_MAX_PARALLEL);
    }

    // [provider] section
    let mut provider = ProviderSettings::default();
    if let Some(section) = ini.section(Some("provider")) {
        if let Some(v) = non_empty(section, "type") {
            provider.kind = v.to_lowercase();
        }
        provider.username = non_empty(section, "username").map(str::to_string);
        provider.password = non_empty(section, "password").map(str::to_string);
        provider.api_key = non_empty(section, "api_key").map(str::to_string);
        provider.base_url = non_empty(section, "base_url").map(|v| v.trim_end_matches('/').to_string());
        if let Some(v) = non_empty(section, "max_retries") {
            provider.max_retries = parse_number::<u32>("provider", "max_retries", v)?;
        }
        if let Some(v) = non_empty(section, "retry_delay_secs") {
            provider.retry_delay = parse_secs("provider", "retry_delay_secs", v)?;
        }
        if let Some(v) = non_empty(section, "timeout_secs") {
            provider.timeout = parse_secs("provider", "timeout_secs", v)?;
        }
        if let Some(v) = non_empty(section, "page_size") {
            provider.page_size = parse_number("provider", "page_size", v)?;
        }
        if let Some(v) = non_empty(section, "poll_interval_secs") {
            provider.poll_interval = parse_secs("provider", "poll_interval_secs", v)?;
        }
    }

    // [mosaic] section
    let mut mosaic = MosaicSettings::default();
    if let Some(section) = ini.section(Some("mosaic")) {
        mosaic.command = non_empty(section, "command").map(str::to_string);
        if let Some(v) = non_empty(section, "attempts") {
            mosaic.attempts = parse_number::<u32>("mosaic", "attempts", v)?.max(1);
        }
        if let Some(v) = non_empty(section, "timeout_secs") {
            mosaic.timeout = parse_secs("mosaic", "timeout_secs", v)?;
        }
    }

    // [logging] section
    let mut logging = LoggingSettings::default();
    if let Some(v) = ini
        .section(Some("logging"))
        .and_then(|section| non_empty(section, "file"))
    {
        logging.file = resolve_path(base_dir, v);
    }

    let (processors, adapters) = parse_collaborator_sections(ini);

    Ok(HindcastConfig {
        general,
        concurrency,
        provider,
        mosaic,
        logging,
        processors,
        adapters,
    })
}

fn parse_general(ini: &Ini, base_dir: &Path) -> Result<GeneralSettings, ConfigurationError> {
    let section = ini
        .section(Some("general"))
        .ok_or_else(|| missing("general", "sensor"))?;

    let name = non_empty(section, "name")
        .unwrap_or(DEFAULT_AOI_NAME)
        .to_string();

    let wkt = match (non_empty(section, "wkt"), non_empty(section, "wkt_file")) {
        (Some(wkt), _) => wkt.to_string(),
        (None, Some(file)) => {
            let path = resolve_path(base_dir, file);
            Aoi::from_file(name.clone(), &path)?.wkt().to_string()
        }
        (None, None) => return Err(missing("general", "wkt")),
    };
    Aoi::from_wkt(name.clone(), &wkt)?;

    let sensor_value = non_empty(section, "sensor").ok_or_else(|| missing("general", "sensor"))?;
    let sensor: Sensor = sensor_value
        .parse()
        .map_err(|reason| invalid("general", "sensor", sensor_value, reason))?;

    let resolution = match non_empty(section, "resolution") {
        Some(v) => parse_number("general", "resolution", v)?,
        None => sensor.default_resolution(),
    };

    let start_value = non_empty(section, "start").ok_or_else(|| missing("general", "start"))?;
    let start = parse_datetime("start", start_value, false)?;
    let end_value = non_empty(section, "end").ok_or_else(|| missing("general", "end"))?;
    let end = parse_datetime("end", end_value, true)?;
    if end < start {
        return Err(invalid(
            "general",
            "end",
            end_value,
            "must not be earlier than start",
        ));
    }

    let processors = non_empty(section, "processors")
        .map(split_names)
        .unwrap_or_default();
    if processors.is_empty() {
        return Err(missing("general", "processors"));
    }
    let adapters = non_empty(section, "adapters")
        .map(split_names)
        .unwrap_or_default();

    let min_output_bytes = match non_empty(section, "min_output_bytes") {
        Some(v) => parse_number("general", "min_output_bytes", v)?,
        None => DEFAULT_MIN_OUTPUT_BYTES,
    };

    Ok(GeneralSettings {
        name,
        wkt,
        sensor,
        resolution,
        start,
        end,
        processors,
        adapters,
        offline: non_empty(section, "offline").map(parse_bool).unwrap_or(false),
        l1_directory: non_empty(section, "l1_directory")
            .map(|v| resolve_path(base_dir, v))
            .unwrap_or_else(default_l1_directory),
        output_directory: non_empty(section, "output_directory")
            .map(|v| resolve_path(base_dir, v))
            .unwrap_or_else(default_output_directory),
        min_output_bytes,
    })
}

type CollaboratorSections = (
    BTreeMap<String, SectionParams>,
    BTreeMap<String, SectionParams>,
);

/// Collects `[processor.X]` and `[adapter.X]` sections.
fn parse_collaborator_sections(ini: &Ini) -> CollaboratorSections {
    let mut processors = BTreeMap::new();
    let mut adapters = BTreeMap::new();

    for (name, properties) in ini.iter() {
        let Some(name) = name else { continue };
        let (target, collaborator) = if let Some(p) = name.strip_prefix(PROCESSOR_PREFIX) {
            (&mut processors, p)
        } else if let Some(a) = name.strip_prefix(ADAPTER_PREFIX) {
            (&mut adapters, a)
        } else {
            continue;
        };

        let collaborator = collaborator.trim().to_uppercase();
        let mut params = SectionParams::new(name);
        for (key, value) in properties.iter() {
            params.insert(key, value);
        }
        target.insert(collaborator, params);
    }

    (processors, adapters)
}

fn parse_pool_size(section: &Properties, key: &str) -> Result<Option<usize>, ConfigurationError> {
    let Some(v) = non_empty(section, key) else {
        return Ok(None);
    };
    match v.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(invalid("concurrency", key, v, "must be an integer >= 1")),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` or a bare date. A bare end date
/// covers the whole day.
fn parse_datetime(key: &str, value: &str, end_of_day: bool) -> Result<NaiveDateTime, ConfigurationError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| {
            if end_of_day {
                date.and_hms_opt(23, 59, 59)
            } else {
                date.and_hms_opt(0, 0, 0)
            }
        })
        .ok_or_else(|| {
            invalid(
                "general",
                key,
                value,
                "expected RFC 3339 timestamp or YYYY-MM-DD",
            )
        })
}

fn parse_number<T: std::str::FromStr>(
    section: &str,
    key: &str,
    value: &str,
) -> Result<T, ConfigurationError> {
    value
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_secs(section: &str, key: &str, value: &str) -> Result<Duration, ConfigurationError> {
    parse_number::<u64>(section, key, value).map(Duration::from_secs)
}

/// Processor and adapter names are matched case-insensitively.
fn split_names(value: &str) -> Vec<String> {
    split_list(value)
        .into_iter()
        .map(|name| name.to_uppercase())
        .collect()
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn missing(section: &str, key: &str) -> ConfigurationError {
    ConfigurationError::MissingKey {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

fn resolve_path(base_dir: &Path, value: &str) -> PathBuf {
    let path = expand_tilde(value);
    if path.is_relative() {
        base_dir.join(path)
    } else {
        path
    }
}
