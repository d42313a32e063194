//! Built-in adapter writing a JSON manifest of a group's merged products.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::{AdaptRequest, Adapter};
use crate::pipeline::{CellFailure, MosaicedLedger};
use crate::BoxFuture;

/// Registry name of the manifest adapter.
pub const MANIFEST_ADAPTER: &str = "MANIFEST";

#[derive(Debug, Serialize)]
struct Manifest<'a> {
    aoi: &'a str,
    wkt: &'a str,
    sensor: &'a str,
    resolution: u32,
    date: NaiveDate,
    products: &'a MosaicedLedger,
}

/// Writes `MANIFEST/MANIFEST_<SENSOR>_<YYYYMMDD>.json`.
///
/// Needs no configuration section. An empty ledger still produces a
/// manifest listing no products.
#[derive(Debug, Clone, Default)]
pub struct ManifestAdapter;

impl ManifestAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Adapter for ManifestAdapter {
    fn name(&self) -> &str {
        MANIFEST_ADAPTER
    }

    fn extension(&self) -> &str {
        "json"
    }

    fn apply<'a>(&'a self, request: AdaptRequest<'a>) -> BoxFuture<'a, Result<(), CellFailure>> {
        Box::pin(async move {
            let manifest = Manifest {
                aoi: request.env.aoi.name(),
                wkt: request.env.aoi.wkt(),
                sensor: request.env.sensor.as_str(),
                resolution: request.env.resolution,
                date: request.date,
                products: request.products,
            };
            let json = serde_json::to_vec_pretty(&manifest)
                .map_err(|e| CellFailure::Failed(e.to_string()))?;

            if let Some(parent) = request.target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(request.target, json).await?;

            info!(
                group = %request.date,
                products = request.products.len(),
                path = %request.target.display(),
                "Manifest written"
            );
            Ok(())
        })
    }
}
