//! Scene value types shared by the catalog, availability and scheduling layers.

use chrono::{NaiveDate, NaiveDateTime};
use geo::MultiPolygon;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::name::{ProductName, ProductNameError};

/// Optical sensors the hindcast can be run for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensor {
    /// Sentinel-3 Ocean and Land Colour Instrument.
    Olci,
    /// Sentinel-2 MultiSpectral Instrument.
    Msi,
    /// Landsat 8/9 Operational Land Imager and Thermal Infrared Sensor.
    OliTirs,
}

impl Sensor {
    /// Canonical identifier, as used in configuration and directory names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Olci => "OLCI",
            Self::Msi => "MSI",
            Self::OliTirs => "OLI_TIRS",
        }
    }

    /// Native resolution in metres when the configuration does not set one.
    pub fn default_resolution(&self) -> u32 {
        match self {
            Self::Olci => 300,
            Self::Msi => 60,
            Self::OliTirs => 30,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OLCI" => Ok(Self::Olci),
            "MSI" => Ok(Self::Msi),
            "OLI_TIRS" | "OLI-TIRS" | "OLI" => Ok(Self::OliTirs),
            other => Err(format!("unknown sensor '{}'", other)),
        }
    }
}

/// Publication tier of a product.
///
/// Variants are declared from lowest to highest quality so that the derived
/// ordering ranks a reprocessed product above its near-real-time twin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeliness {
    /// Near real time (`NR` for Sentinel-3, `RT` for Landsat).
    NearRealTime,
    /// Short time critical (`ST`).
    ShortTime,
    /// Non time critical (`NT`, Landsat `T1`/`T2`).
    NonTimeCritical,
}

impl Timeliness {
    /// Maps a product-name tier code to a timeliness tier.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "NR" | "RT" => Some(Self::NearRealTime),
            "ST" => Some(Self::ShortTime),
            "NT" | "T1" | "T2" => Some(Self::NonTimeCritical),
            _ => None,
        }
    }
}

impl fmt::Display for Timeliness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NearRealTime => write!(f, "near-real-time"),
            Self::ShortTime => write!(f, "short-time-critical"),
            Self::NonTimeCritical => write!(f, "non-time-critical"),
        }
    }
}

/// A scene as returned by a provider search.
///
/// `id` is the provider's opaque handle (UUID, entity id, order URI); `name`
/// is the product name the scene is stored under locally. Descriptors are
/// never modified after the search that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescriptor {
    pub id: String,
    pub name: String,
    pub sensor: Sensor,
    pub sensing_start: NaiveDateTime,
    pub sensing_end: NaiveDateTime,
    pub timeliness: Option<Timeliness>,
    /// Tile or path/row identifier when the product name carries one.
    pub tile: Option<String>,
    /// Ground footprint, when the provider publishes one.
    pub footprint: Option<MultiPolygon<f64>>,
    /// Direct download location, for providers whose search returns one.
    pub download_url: Option<String>,
}

impl SceneDescriptor {
    /// Builds a descriptor from a provider handle and a product name.
    ///
    /// Sensing times, tier and tile are taken from the product name so every
    /// provider yields identical descriptors for the same acquisition.
    pub fn from_product_name(
        id: impl Into<String>,
        name: &str,
    ) -> Result<Self, ProductNameError> {
        let parsed = ProductName::parse(name)?;
        Ok(Self {
            id: id.into(),
            name: parsed.name.clone(),
            sensor: parsed.sensor,
            sensing_start: parsed.sensing_start,
            sensing_end: parsed.sensing_end,
            timeliness: parsed.timeliness,
            tile: parsed.tile,
            footprint: None,
            download_url: None,
        })
    }

    pub fn with_footprint(mut self, footprint: Option<MultiPolygon<f64>>) -> Self {
        self.footprint = footprint;
        self
    }

    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }

    /// Day-granularity key used to group tiles of one acquisition date.
    pub fn sensing_date(&self) -> NaiveDate {
        self.sensing_start.date()
    }
}

/// A descriptor paired with the canonical path its Level-1 product occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePair {
    pub descriptor: SceneDescriptor,
    pub path: PathBuf,
}

/// A scene pair annotated by the availability check.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScene {
    pub descriptor: SceneDescriptor,
    pub path: PathBuf,
    pub download_required: bool,
}

impl ResolvedScene {
    pub fn sensing_date(&self) -> NaiveDate {
        self.descriptor.sensing_date()
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_round_trip_names() {
        for sensor in [Sensor::Olci, Sensor::Msi, Sensor::OliTirs] {
            assert_eq!(sensor.as_str().parse::<Sensor>().unwrap(), sensor);
        }
        assert_eq!("olci".parse::<Sensor>().unwrap(), Sensor::Olci);
        assert!("MODIS".parse::<Sensor>().is_err());
    }

    #[test]
    fn test_timeliness_ordering_prefers_reprocessed() {
        assert!(Timeliness::NonTimeCritical > Timeliness::ShortTime);
        assert!(Timeliness::ShortTime > Timeliness::NearRealTime);
        assert_eq!(Timeliness::from_code("NT"), Some(Timeliness::NonTimeCritical));
        assert_eq!(Timeliness::from_code("RT"), Some(Timeliness::NearRealTime));
        assert_eq!(Timeliness::from_code("XX"), None);
    }

    #[test]
    fn test_descriptor_from_olci_name() {
        let scene = SceneDescriptor::from_product_name(
            "uuid-1",
            "S3A_OL_1_EFR____20210701T094512_20210701T094812_20210702T141210_0179_073_350_2160_LN1_O_NT_002.SEN3",
        )
        .unwrap();

        assert_eq!(scene.id, "uuid-1");
        assert_eq!(scene.sensor, Sensor::Olci);
        assert_eq!(scene.timeliness, Some(Timeliness::NonTimeCritical));
        assert_eq!(
            scene.sensing_date(),
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap()
        );
        assert!(scene.footprint.is_none());
    }
}
