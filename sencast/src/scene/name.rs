//! Product-name parsing for Sentinel-3, Sentinel-2 and Landsat Level-1 names.
//!
//! Product names carry everything the pipeline needs to identify a scene
//! without opening it: sensing window, publication tier and tile.
//!
//! ```text
//! S3A_OL_1_EFR____20210701T094512_20210701T094812_20210702T141210_0179_073_350_2160_LN1_O_NT_002.SEN3
//! S2B_MSIL1C_20210701T103029_N0301_R108_T32TLS_20210701T124106.SAFE
//! LC08_L1TP_196027_20210701_20210708_02_T1
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::types::{Sensor, Timeliness};

/// Errors from parsing a product name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductNameError {
    #[error("unrecognised product name '{0}'")]
    Unrecognised(String),

    #[error("invalid sensing time '{value}' in product '{name}'")]
    InvalidTime { name: String, value: String },
}

/// Fields extracted from a product name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductName {
    pub name: String,
    pub sensor: Sensor,
    pub sensing_start: NaiveDateTime,
    pub sensing_end: NaiveDateTime,
    pub timeliness: Option<Timeliness>,
    pub tile: Option<String>,
}

fn olci_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^S3[AB]_OL_1_E[FR]R_{4}(\d{8}T\d{6})_(\d{8}T\d{6})_\d{8}T\d{6}_.*_(NR|ST|NT)_\d{3}(?:\.SEN3)?$",
        )
        .expect("OLCI product pattern is valid")
    })
}

fn msi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^S2[AB]_MSIL1C_(\d{8}T\d{6})_N\d{4}_R\d{3}_T([0-9A-Z]{5})_\d{8}T\d{6}(?:\.SAFE)?$")
            .expect("MSI product pattern is valid")
    })
}

fn landsat_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^L[CO]0[89]_L1(?:TP|GT|GS)_(\d{6})_(\d{8})_\d{8}_\d{2}_(T1|T2|RT)(?:\.tar)?$")
            .expect("Landsat product pattern is valid")
    })
}

impl ProductName {
    /// Parses a Level-1 product name.
    pub fn parse(name: &str) -> Result<Self, ProductNameError> {
        let name = name.trim();

        if let Some(caps) = olci_pattern().captures(name) {
            return Ok(Self {
                name: name.to_string(),
                sensor: Sensor::Olci,
                sensing_start: parse_datetime(name, &caps[1])?,
                sensing_end: parse_datetime(name, &caps[2])?,
                timeliness: Timeliness::from_code(&caps[3]),
                tile: None,
            });
        }

        if let Some(caps) = msi_pattern().captures(name) {
            let start = parse_datetime(name, &caps[1])?;
            return Ok(Self {
                name: name.to_string(),
                sensor: Sensor::Msi,
                sensing_start: start,
                sensing_end: start,
                timeliness: None,
                tile: Some(caps[2].to_string()),
            });
        }

        if let Some(caps) = landsat_pattern().captures(name) {
            let start = NaiveDate::parse_from_str(&caps[2], "%Y%m%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(|| ProductNameError::InvalidTime {
                    name: name.to_string(),
                    value: caps[2].to_string(),
                })?;
            return Ok(Self {
                name: name.to_string(),
                sensor: Sensor::OliTirs,
                sensing_start: start,
                sensing_end: start,
                timeliness: Timeliness::from_code(&caps[3]),
                tile: Some(caps[1].to_string()),
            });
        }

        Err(ProductNameError::Unrecognised(name.to_string()))
    }

    /// Product name without its container extension.
    pub fn stem(name: &str) -> &str {
        [".SEN3", ".SAFE", ".tar", ".zip"]
            .iter()
            .find_map(|ext| name.strip_suffix(ext))
            .unwrap_or(name)
    }
}

fn parse_datetime(name: &str, value: &str) -> Result<NaiveDateTime, ProductNameError> {
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").map_err(|_| {
        ProductNameError::InvalidTime {
            name: name.to_string(),
            value: value.to_string(),
        }
    })
}
