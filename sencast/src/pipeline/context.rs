//! Read-only run environment shared by every group worker.

use crate::aoi::Aoi;
use crate::command::TemplateVars;
use crate::config::{ConfigurationError, HindcastConfig};
use crate::scene::{OutputLayout, Sensor};

/// What every processor, mosaic and adapter call needs to know about the run.
#[derive(Debug, Clone)]
pub struct RunEnv {
    pub aoi: Aoi,
    pub sensor: Sensor,
    pub resolution: u32,
    pub layout: OutputLayout,
    /// Outputs below this size are treated as empty
    pub min_output_bytes: u64,
}

impl RunEnv {
    pub fn from_config(config: &HindcastConfig) -> Result<Self, ConfigurationError> {
        let general = &config.general;
        let layout = OutputLayout::new(
            &general.output_directory,
            &general.name,
            general.start,
            general.end,
            general.sensor,
        );
        Ok(Self {
            aoi: config.aoi()?,
            sensor: general.sensor,
            resolution: general.resolution,
            layout,
            min_output_bytes: general.min_output_bytes,
        })
    }

    /// Template variables common to every command: `{wkt}`, `{sensor}`, `{resolution}`.
    pub fn template_vars(&self) -> TemplateVars {
        let mut vars = TemplateVars::new();
        vars.set("wkt", self.aoi.wkt())
            .set("sensor", self.sensor.as_str())
            .set("resolution", self.resolution.to_string());
        vars
    }
}
