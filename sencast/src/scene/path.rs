//! Deterministic filesystem layout for Level-1 inputs and derived products.
//!
//! Every path is a pure function of product name, sensor, dates and the
//! processor or adapter name. Re-running a hindcast resolves to the same
//! paths, which is what lets each stage skip work whose output exists.

use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use super::name::ProductName;
use super::types::Sensor;

/// Returns the canonical location of a scene's Level-1 product.
///
/// Layout: `<l1_root>/<SENSOR>/<product name>`. Landsat bundles carry no
/// container suffix in their name and are stored as `.tar`.
pub fn scene_path(l1_root: &Path, sensor: Sensor, product_name: &str) -> PathBuf {
    let file_name = match sensor {
        Sensor::OliTirs if !product_name.ends_with(".tar") => format!("{}.tar", product_name),
        _ => product_name.to_string(),
    };
    l1_root.join(sensor.as_str()).join(file_name)
}

/// Output directory tree for one hindcast run.
///
/// ```text
/// <output_root>/<aoi>_<start>_<end>/
///     L2C2RCC/L2C2RCC_<product stem>.nc
///     L2C2RCC/L2C2RCC_OLCI_20210701_mosaic.nc
///     MANIFEST/MANIFEST_OLCI_20210701.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    run_dir: PathBuf,
    sensor: Sensor,
}

impl OutputLayout {
    pub fn new(
        output_root: &Path,
        aoi_name: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        sensor: Sensor,
    ) -> Self {
        let dir_name = format!(
            "{}_{}_{}",
            aoi_name,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
        Self {
            run_dir: output_root.join(dir_name),
            sensor,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    /// Directory holding everything one processor produces.
    pub fn processor_dir(&self, processor: &str) -> PathBuf {
        self.run_dir.join(format!("L2{}", processor))
    }

    /// Per-tile output of `processor` for the Level-1 product at `l1_product`.
    pub fn processor_output(&self, processor: &str, l1_product: &Path, extension: &str) -> PathBuf {
        let name = l1_product
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = ProductName::stem(&name);
        self.processor_dir(processor)
            .join(with_extension(format!("L2{}_{}", processor, stem), extension))
    }

    /// Merged output of `processor` for one sensing date.
    pub fn mosaic_output(&self, processor: &str, date: NaiveDate, extension: &str) -> PathBuf {
        self.processor_dir(processor).join(with_extension(
            format!("L2{}_{}_{}_mosaic", processor, self.sensor, date.format("%Y%m%d")),
            extension,
        ))
    }

    /// Target written by an adapter for one sensing date.
    pub fn adapter_target(&self, adapter: &str, date: NaiveDate, extension: &str) -> PathBuf {
        self.run_dir.join(adapter).join(with_extension(
            format!("{}_{}_{}", adapter, self.sensor, date.format("%Y%m%d")),
            extension,
        ))
    }
}

fn with_extension(stem: String, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}
